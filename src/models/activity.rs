// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Normalized activity record shared by both sides of a sync.

use crate::error::{Result, SyncError};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::time::Duration;

/// One activity as read from Strava or Kikourou.
///
/// Records are snapshots taken once per run and never modified afterwards;
/// source-specific shapes are converted into this type by the adapters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
    /// Strava activity ID, or Kikourou detail page path
    pub id: String,
    /// Permalink on the origin service
    pub source_url: String,
    /// Local start time (no timezone)
    pub start: NaiveDateTime,
    distance_km: f64,
    /// Elapsed time
    pub elapsed: Duration,
    /// Elevation gain in meters (0 when unknown)
    pub elevation_gain_m: u32,
    /// Sport label (Run, Ride, ...)
    pub activity_type: String,
    /// Activity name/title
    pub name: String,
    pub location: Option<String>,
    /// Strava "suffer score"
    pub effort_score: Option<f64>,
    pub heart_rate_avg: Option<f64>,
    pub heart_rate_max: Option<f64>,
    /// Kikourou public description
    pub public_comment: Option<String>,
    /// Kikourou private description (holds the Strava permalink for imported entries)
    pub private_comment: Option<String>,
}

impl ActivityRecord {
    /// Create a record with the fields every source provides.
    ///
    /// Fails if the distance is negative or not finite.
    pub fn new(
        id: impl Into<String>,
        source_url: impl Into<String>,
        start: NaiveDateTime,
        distance_km: f64,
        elapsed: Duration,
    ) -> Result<Self> {
        let id = id.into();
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(SyncError::InvalidRecord {
                id,
                reason: format!("distance {} km", distance_km),
            });
        }

        Ok(Self {
            id,
            source_url: source_url.into(),
            start,
            distance_km,
            elapsed,
            elevation_gain_m: 0,
            activity_type: String::new(),
            name: String::new(),
            location: None,
            effort_score: None,
            heart_rate_avg: None,
            heart_rate_max: None,
            public_comment: None,
            private_comment: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_activity_type(mut self, activity_type: impl Into<String>) -> Self {
        self.activity_type = activity_type.into();
        self
    }

    pub fn with_elevation(mut self, meters: u32) -> Self {
        self.elevation_gain_m = meters;
        self
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location.filter(|l| !l.trim().is_empty());
        self
    }

    pub fn with_effort_score(mut self, score: Option<f64>) -> Self {
        self.effort_score = score;
        self
    }

    pub fn with_heart_rate(mut self, average: Option<f64>, max: Option<f64>) -> Self {
        self.heart_rate_avg = average;
        self.heart_rate_max = max;
        self
    }

    pub fn with_comments(mut self, public: Option<String>, private: Option<String>) -> Self {
        self.public_comment = public.filter(|c| !c.is_empty());
        self.private_comment = private.filter(|c| !c.is_empty());
        self
    }

    /// Distance in kilometers (never negative).
    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    /// Calendar date of the start time.
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Short human-readable label used in logs and error messages.
    pub fn label(&self) -> String {
        format!("'{}' ({}, {})", self.name, self.date(), self.source_url)
    }
}
