// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strava_kikourou::error::{Result, Side, SyncError};
use strava_kikourou::models::ActivityRecord;
use strava_kikourou::services::{ActivitySource, CreateOutcome, LogbookEntry, LogbookWriter};

/// Parse a `YYYY-MM-DD` date at the given hour.
#[allow(dead_code)]
pub fn at(date: &str, hour: u32) -> NaiveDateTime {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .expect("test date")
        .and_hms_opt(hour, 0, 0)
        .expect("test hour")
}

/// A Strava-side activity with permalink `a/{id}`.
#[allow(dead_code)]
pub fn strava_activity(id: &str, date: &str, km: f64, secs: u64) -> ActivityRecord {
    ActivityRecord::new(id, format!("a/{}", id), at(date, 9), km, Duration::from_secs(secs))
        .expect("valid activity")
        .with_name(format!("Activity {}", id))
        .with_activity_type("Run")
}

/// A Kikourou-side entry, dated at midnight as the site shows it.
#[allow(dead_code)]
pub fn kikourou_entry(id: &str, date: &str, km: f64, secs: u64) -> ActivityRecord {
    ActivityRecord::new(
        id,
        format!("http://www.kikourou.net/entrainement/{}", id),
        at(date, 0),
        km,
        Duration::from_secs(secs),
    )
    .expect("valid entry")
    .with_name(format!("Entry {}", id))
}

/// What Kikourou shows when an entry created from `entry` is read back.
#[allow(dead_code)]
pub fn read_back(id: &str, entry: &LogbookEntry) -> ActivityRecord {
    let start = NaiveDate::from_ymd_opt(entry.year, entry.month, entry.day)
        .expect("entry date")
        .and_hms_opt(0, 0, 0)
        .expect("midnight");
    let elapsed = Duration::from_secs(entry.hours * 3600 + entry.minutes * 60 + entry.seconds);

    ActivityRecord::new(
        id,
        format!("http://www.kikourou.net/entrainement/{}", id),
        start,
        entry.distance.parse().expect("distance"),
        elapsed,
    )
    .expect("valid entry")
    .with_name(entry.name.to_string_lossless())
    .with_elevation(entry.elevation)
    .with_comments(None, Some(entry.private_description.to_string_lossless()))
}

/// In-memory Strava side.
#[allow(dead_code)]
pub struct FakeStrava {
    pub activities: Vec<ActivityRecord>,
    pub failure: Option<String>,
}

#[allow(dead_code)]
impl FakeStrava {
    pub fn new(activities: Vec<ActivityRecord>) -> Self {
        Self {
            activities,
            failure: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            activities: Vec::new(),
            failure: Some(reason.to_string()),
        }
    }
}

#[async_trait]
impl ActivitySource for FakeStrava {
    fn side(&self) -> Side {
        Side::Strava
    }

    async fn fetch_activities(&self) -> Result<Vec<ActivityRecord>> {
        match &self.failure {
            Some(reason) => Err(SyncError::StravaApi(reason.clone())),
            None => Ok(self.activities.clone()),
        }
    }
}

/// How the fake logbook answers the n-th create call (0-based).
#[allow(dead_code)]
#[derive(Clone)]
pub enum CreateBehavior {
    AcceptAll,
    RejectAt(usize, Option<String>),
    TransportErrorAt(usize),
}

/// In-memory Kikourou side recording every submitted entry.
#[allow(dead_code)]
pub struct FakeKikourou {
    pub activities: Vec<ActivityRecord>,
    pub failure: Option<String>,
    pub behavior: CreateBehavior,
    /// Entries submitted, including a rejected one
    pub submitted: Arc<Mutex<Vec<LogbookEntry>>>,
}

#[allow(dead_code)]
impl FakeKikourou {
    pub fn new(activities: Vec<ActivityRecord>) -> Self {
        Self {
            activities,
            failure: None,
            behavior: CreateBehavior::AcceptAll,
            submitted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn with_behavior(mut self, behavior: CreateBehavior) -> Self {
        self.behavior = behavior;
        self
    }
}

#[async_trait]
impl ActivitySource for FakeKikourou {
    fn side(&self) -> Side {
        Side::Kikourou
    }

    async fn fetch_activities(&self) -> Result<Vec<ActivityRecord>> {
        match &self.failure {
            Some(reason) => Err(SyncError::Kikourou(reason.clone())),
            None => Ok(self.activities.clone()),
        }
    }
}

#[async_trait]
impl LogbookWriter for FakeKikourou {
    async fn create_entry(&self, entry: &LogbookEntry) -> Result<CreateOutcome> {
        let mut submitted = self.submitted.lock().expect("lock");
        let call = submitted.len();
        submitted.push(entry.clone());

        match &self.behavior {
            CreateBehavior::RejectAt(n, message) if *n == call => Ok(CreateOutcome::Rejected {
                message: message.clone(),
            }),
            CreateBehavior::TransportErrorAt(n) if *n == call => {
                Err(SyncError::Kikourou("connection reset".to_string()))
            }
            _ => Ok(CreateOutcome::Created),
        }
    }
}
