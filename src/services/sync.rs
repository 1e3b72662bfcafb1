// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One reconciliation pass between Strava and Kikourou.
//!
//! Handles the core workflow:
//! 1. Fetch Strava activities and Kikourou entries
//! 2. Match them (see [`Matcher`])
//! 3. Translate each unmatched Strava activity into a Kikourou entry
//! 4. Create the entries, stopping at the first rejection
//! 5. Report counts

use crate::error::{Result, Side, SyncError};
use crate::models::ActivityRecord;
use crate::services::matcher::Matcher;
use crate::services::translator::{FieldTranslator, LogbookEntry, UnmappedCategory};
use async_trait::async_trait;
use chrono::NaiveDateTime;

/// Something that lists activities for one side of the sync.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    fn side(&self) -> Side;

    /// Fetch the current activity list. A partial list must be an error.
    async fn fetch_activities(&self) -> Result<Vec<ActivityRecord>>;
}

/// Something that can create Kikourou entries.
#[async_trait]
pub trait LogbookWriter: Send + Sync {
    /// Submit one entry. `Ok(Rejected)` means the request went through but
    /// the site did not confirm the entry was saved.
    async fn create_entry(&self, entry: &LogbookEntry) -> Result<CreateOutcome>;
}

/// What the logbook answered to a create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    Rejected { message: Option<String> },
}

/// Per-run switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Translate but do not submit anything
    pub dry_run: bool,
}

/// Summary of one run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub fetched_strava: usize,
    pub fetched_kikourou: usize,
    pub matched: usize,
    pub created: usize,
    /// Activities created with the default sport code
    pub unmapped: Vec<UnmappedCategory>,
    /// Entries that would have been created (dry run only)
    pub pending: Vec<String>,
    pub dry_run: bool,
}

/// Runs a sync between a Strava source and a Kikourou logbook.
pub struct SyncDriver<A, B> {
    strava: A,
    kikourou: B,
    matcher: Matcher,
    translator: FieldTranslator,
}

impl<A, B> SyncDriver<A, B>
where
    A: ActivitySource,
    B: ActivitySource + LogbookWriter,
{
    pub fn new(strava: A, kikourou: B, matcher: Matcher, translator: FieldTranslator) -> Self {
        Self {
            strava,
            kikourou,
            matcher,
            translator,
        }
    }

    /// Run one pass, stamping new entries with the current local time.
    pub async fn run(&self, options: SyncOptions) -> Result<SyncReport> {
        self.run_at(options, chrono::Local::now().naive_local()).await
    }

    /// Run one pass with an explicit import timestamp.
    pub async fn run_at(
        &self,
        options: SyncOptions,
        imported_at: NaiveDateTime,
    ) -> Result<SyncReport> {
        // 1. Fetch both sides before any write
        let strava_activities = fetch(&self.strava).await?;
        let kikourou_activities = fetch(&self.kikourou).await?;

        // 2. Match
        let outcome = self
            .matcher
            .match_activities(&strava_activities, &kikourou_activities)?;

        let mut report = SyncReport {
            fetched_strava: strava_activities.len(),
            fetched_kikourou: kikourou_activities.len(),
            matched: outcome.matched.len(),
            dry_run: options.dry_run,
            ..Default::default()
        };

        tracing::info!(
            strava = report.fetched_strava,
            kikourou = report.fetched_kikourou,
            matched = report.matched,
            new = outcome.unmatched.len(),
            "Activities matched"
        );

        // 3-4. Translate and create, in Strava order
        for activity in outcome.unmatched {
            let translation = self.translator.translate(activity, imported_at);
            report.unmapped.extend(translation.unmapped);
            let entry = translation.entry;

            if options.dry_run {
                tracing::info!(entry = %entry.label(), "Dry run: would create Kikourou entry");
                report.pending.push(entry.label());
                continue;
            }

            tracing::info!(entry = %entry.label(), "Creating Kikourou entry");
            match self.kikourou.create_entry(&entry).await {
                Ok(CreateOutcome::Created) => {
                    report.created += 1;
                }
                Ok(CreateOutcome::Rejected { message }) => {
                    return Err(SyncError::CreateFailed {
                        activity: entry.label(),
                        message: message
                            .unwrap_or_else(|| "no confirmation from Kikourou".to_string()),
                    });
                }
                Err(e) => {
                    return Err(SyncError::CreateFailed {
                        activity: entry.label(),
                        message: e.to_string(),
                    });
                }
            }
        }

        // 5. Report
        tracing::info!(
            strava = report.fetched_strava,
            kikourou = report.fetched_kikourou,
            matched = report.matched,
            created = report.created,
            unmapped = report.unmapped.len(),
            dry_run = report.dry_run,
            "Sync finished"
        );

        Ok(report)
    }
}

async fn fetch<S: ActivitySource>(source: &S) -> Result<Vec<ActivityRecord>> {
    let side = source.side();
    match source.fetch_activities().await {
        Ok(activities) => {
            tracing::info!(side = %side, count = activities.len(), "Fetched activities");
            Ok(activities)
        }
        Err(e) => {
            tracing::error!(side = %side, error = %e, "Fetching activities failed");
            Err(SyncError::unavailable(side, e))
        }
    }
}

