// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Translation of a Strava activity into a new Kikourou training entry.

use crate::latin1::Latin1Text;
use crate::models::ActivityRecord;
use chrono::{Datelike, NaiveDateTime};
use serde::Deserialize;
use std::collections::HashMap;

/// Kikourou sport code for "autre" (other).
pub const DEFAULT_SPORT_CODE: u32 = 21;

/// Upper bounds (exclusive) of intensity levels 1 to 7; anything above is 8.
pub const DEFAULT_INTENSITY_THRESHOLDS: [f64; 7] = [10.0, 20.0, 40.0, 70.0, 110.0, 160.0, 220.0];

/// Sport table and intensity scale.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslatorConfig {
    /// Strava activity type -> Kikourou sport code
    #[serde(default)]
    pub sport: HashMap<String, u32>,
    /// Used for activity types missing from `sport`
    #[serde(default = "default_sport")]
    pub default_sport: u32,
    #[serde(default = "default_thresholds")]
    pub intensity_thresholds: [f64; 7],
}

fn default_sport() -> u32 {
    DEFAULT_SPORT_CODE
}

fn default_thresholds() -> [f64; 7] {
    DEFAULT_INTENSITY_THRESHOLDS
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            sport: HashMap::new(),
            default_sport: DEFAULT_SPORT_CODE,
            intensity_thresholds: DEFAULT_INTENSITY_THRESHOLDS,
        }
    }
}

/// Fields of a Kikourou "new training" form, ready to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct LogbookEntry {
    /// Strava activity this entry is created from
    pub source_id: String,
    pub day: u32,
    pub month: u32,
    pub year: i32,
    pub name: Latin1Text,
    pub location: Latin1Text,
    pub sport: u32,
    /// 1 (trop facile) to 8 (extrême)
    pub intensity: u8,
    /// Kilometers with three decimals
    pub distance: String,
    pub elevation: u32,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    /// Average heart rate with one decimal
    pub heart_rate_avg: Option<String>,
    pub heart_rate_max: Option<u32>,
    pub public_description: Latin1Text,
    /// Strava permalink, read back by the matcher on later runs
    pub private_description: Latin1Text,
}

impl LogbookEntry {
    /// Label for logs and errors.
    pub fn label(&self) -> String {
        format!(
            "'{}' ({:04}-{:02}-{:02}, Strava {})",
            self.name.to_string_lossless(),
            self.year,
            self.month,
            self.day,
            self.source_id
        )
    }
}

/// A Strava activity type with no entry in the sport table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedCategory {
    pub activity_id: String,
    pub activity_type: String,
}

/// Output of [`FieldTranslator::translate`].
#[derive(Debug, Clone)]
pub struct Translation {
    pub entry: LogbookEntry,
    pub unmapped: Option<UnmappedCategory>,
}

/// Builds Kikourou entries from Strava activities. Performs no I/O.
#[derive(Debug, Clone, Default)]
pub struct FieldTranslator {
    config: TranslatorConfig,
}

impl FieldTranslator {
    pub fn new(config: TranslatorConfig) -> Self {
        Self { config }
    }

    /// Translate one activity. `imported_at` is written in the public
    /// description.
    pub fn translate(&self, activity: &ActivityRecord, imported_at: NaiveDateTime) -> Translation {
        let (sport, unmapped) = self.sport_code(activity);
        let (hours, minutes, seconds) = split_duration(activity.elapsed.as_secs());
        let date = activity.date();

        let entry = LogbookEntry {
            source_id: activity.id.clone(),
            day: date.day(),
            month: date.month(),
            year: date.year(),
            name: Latin1Text::encode(&activity.name),
            location: Latin1Text::encode(activity.location.as_deref().unwrap_or_default()),
            sport,
            intensity: self.intensity(activity.effort_score),
            distance: format!("{:.3}", activity.distance_km()),
            elevation: activity.elevation_gain_m,
            hours,
            minutes,
            seconds,
            heart_rate_avg: activity.heart_rate_avg.map(|hr| format!("{:.1}", hr)),
            heart_rate_max: activity.heart_rate_max.map(|hr| hr as u32),
            public_description: Latin1Text::encode(&format!(
                "Importé de Strava le {} par strava_kikourou_importer",
                imported_at.format("%Y-%m-%d %H:%M:%S")
            )),
            private_description: Latin1Text::encode(&activity.source_url),
        };

        Translation { entry, unmapped }
    }

    fn sport_code(&self, activity: &ActivityRecord) -> (u32, Option<UnmappedCategory>) {
        if let Some(&code) = self.config.sport.get(&activity.activity_type) {
            return (code, None);
        }

        tracing::warn!(
            activity_id = %activity.id,
            activity_type = %activity.activity_type,
            default_sport = self.config.default_sport,
            "Activity type is not mapped, using default sport"
        );
        (
            self.config.default_sport,
            Some(UnmappedCategory {
                activity_id: activity.id.clone(),
                activity_type: activity.activity_type.clone(),
            }),
        )
    }

    /// Intensity level from a Strava suffer score (absent counts as 0).
    pub fn intensity(&self, effort_score: Option<f64>) -> u8 {
        let score = effort_score.unwrap_or(0.0);
        let below = self
            .config
            .intensity_thresholds
            .iter()
            .take_while(|&&bound| score >= bound)
            .count();
        // at most 7 thresholds passed
        below as u8 + 1
    }
}

/// Split seconds into hours, minutes within the hour and seconds within the minute.
pub fn split_duration(total_secs: u64) -> (u64, u64, u64) {
    (total_secs / 3600, (total_secs / 60) % 60, total_secs % 60)
}
