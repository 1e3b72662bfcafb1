// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Matching of Strava activities against existing Kikourou entries.
//!
//! For each Strava activity the Kikourou entries are scanned in order and the
//! first one that represents the same outing is taken:
//! 1. an entry whose private description is the Strava permalink (written by
//!    a previous import), otherwise
//! 2. an entry on the same day with the same elapsed time and a distance
//!    within the tolerance.
//!
//! A Kikourou entry can be paired with at most one Strava activity. Two
//! Strava activities resolving to the same entry abort the whole match.

use crate::error::{Result, SyncError};
use crate::models::ActivityRecord;
use serde::Deserialize;

/// Tuning for the heuristic rule.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MatcherConfig {
    /// Distances strictly closer than this are considered equal
    #[serde(default = "default_tolerance")]
    pub distance_tolerance_km: f64,
}

fn default_tolerance() -> f64 {
    1.0
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            distance_tolerance_km: default_tolerance(),
        }
    }
}

/// Which rule paired two records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// Kikourou private description holds the Strava permalink
    Reference,
    /// Same date, same duration, close distance
    Heuristic,
}

/// Cross-reference between a Strava activity and a Kikourou entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPair {
    pub api_index: usize,
    pub logbook_index: usize,
    pub api_id: String,
    pub logbook_id: String,
    pub rule: MatchRule,
}

/// Result of matching one run's records.
#[derive(Debug)]
pub struct MatchOutcome<'a> {
    pub matched: Vec<MatchedPair>,
    /// Strava activities without a Kikourou entry, in input order
    pub unmatched: Vec<&'a ActivityRecord>,
}

/// Pairs Strava activities with Kikourou entries.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Partition `api` into activities already present in `logbook` and
    /// activities missing from it.
    pub fn match_activities<'a>(
        &self,
        api: &'a [ActivityRecord],
        logbook: &[ActivityRecord],
    ) -> Result<MatchOutcome<'a>> {
        let mut outcome = MatchOutcome {
            matched: Vec::new(),
            unmatched: Vec::new(),
        };
        if api.is_empty() {
            return Ok(outcome);
        }

        // Index of the Strava activity that claimed each Kikourou entry.
        let mut claimed_by: Vec<Option<usize>> = vec![None; logbook.len()];

        for (api_index, activity) in api.iter().enumerate() {
            let Some((logbook_index, rule)) = self.find_match(activity, logbook) else {
                tracing::debug!(activity = %activity.label(), "No Kikourou entry found");
                outcome.unmatched.push(activity);
                continue;
            };

            let entry = &logbook[logbook_index];
            if let Some(first) = claimed_by[logbook_index] {
                tracing::error!(
                    logbook_id = %entry.id,
                    first = %api[first].id,
                    second = %activity.id,
                    "Kikourou entry matched by two Strava activities"
                );
                return Err(SyncError::DuplicateMatch {
                    logbook_id: entry.id.clone(),
                    first_api_id: api[first].id.clone(),
                    second_api_id: activity.id.clone(),
                });
            }
            claimed_by[logbook_index] = Some(api_index);

            tracing::debug!(
                activity = %activity.label(),
                logbook_id = %entry.id,
                rule = ?rule,
                "Matched existing Kikourou entry"
            );
            outcome.matched.push(MatchedPair {
                api_index,
                logbook_index,
                api_id: activity.id.clone(),
                logbook_id: entry.id.clone(),
                rule,
            });
        }

        Ok(outcome)
    }

    /// First logbook entry matching `activity`, reference rule first.
    fn find_match(
        &self,
        activity: &ActivityRecord,
        logbook: &[ActivityRecord],
    ) -> Option<(usize, MatchRule)> {
        logbook
            .iter()
            .position(|entry| is_reference_match(activity, entry))
            .map(|i| (i, MatchRule::Reference))
            .or_else(|| {
                logbook
                    .iter()
                    .position(|entry| self.is_heuristic_match(activity, entry))
                    .map(|i| (i, MatchRule::Heuristic))
            })
    }

    fn is_heuristic_match(&self, activity: &ActivityRecord, entry: &ActivityRecord) -> bool {
        entry.date() == activity.date()
            && (entry.distance_km() - activity.distance_km()).abs()
                < self.config.distance_tolerance_km
            && entry.elapsed == activity.elapsed
    }
}

fn is_reference_match(activity: &ActivityRecord, entry: &ActivityRecord) -> bool {
    !activity.source_url.is_empty()
        && entry
            .private_comment
            .as_deref()
            .is_some_and(|c| c.trim() == activity.source_url)
}
