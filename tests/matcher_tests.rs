// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Matching of Strava activities against Kikourou entries.
//!
//! If these fail, a sync run either duplicates entries on Kikourou or
//! silently skips new activities.

use std::collections::BTreeSet;
use strava_kikourou::error::SyncError;
use strava_kikourou::models::ActivityRecord;
use strava_kikourou::services::{FieldTranslator, MatchRule, Matcher};

mod common;
use common::{at, kikourou_entry, read_back, strava_activity};

fn unmatched_ids(api: &[ActivityRecord], logbook: &[ActivityRecord]) -> Vec<String> {
    Matcher::default()
        .match_activities(api, logbook)
        .expect("no duplicate match")
        .unmatched
        .iter()
        .map(|a| a.id.clone())
        .collect()
}

/// All orderings of `items`.
fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            out.push(tail);
        }
    }
    out
}

#[test]
fn test_empty_logbook_leaves_everything_unmatched() {
    let api = vec![
        strava_activity("1", "2024-05-01", 10.0, 3600),
        strava_activity("2", "2024-05-02", 5.0, 1800),
    ];
    assert_eq!(unmatched_ids(&api, &[]), vec!["1", "2"]);
}

#[test]
fn test_unmatched_keeps_input_order() {
    let api = vec![
        strava_activity("3", "2024-05-03", 8.0, 2400),
        strava_activity("1", "2024-05-01", 10.0, 3600),
        strava_activity("2", "2024-05-02", 5.0, 1800),
    ];
    let logbook = vec![kikourou_entry("k1", "2024-05-01", 10.0, 3600)];
    assert_eq!(unmatched_ids(&api, &logbook), vec!["3", "2"]);
}

#[test]
fn test_distance_tolerance_boundary() {
    let api = vec![strava_activity("1", "2024-05-01", 10.0, 3600)];

    let close = vec![kikourou_entry("k1", "2024-05-01", 10.99, 3600)];
    assert!(
        unmatched_ids(&api, &close).is_empty(),
        "10.99 km should match 10.0 km"
    );

    let far = vec![kikourou_entry("k1", "2024-05-01", 11.0, 3600)];
    assert_eq!(
        unmatched_ids(&api, &far),
        vec!["1"],
        "11.0 km is outside the tolerance"
    );
}

#[test]
fn test_different_day_does_not_match() {
    let api = vec![strava_activity("1", "2024-05-01", 10.0, 3600)];
    let logbook = vec![kikourou_entry("k1", "2024-05-02", 10.0, 3600)];
    assert_eq!(unmatched_ids(&api, &logbook), vec!["1"]);
}

#[test]
fn test_reference_match_ignores_other_fields() {
    let api = vec![strava_activity("1", "2024-05-01", 10.0, 3600)];
    let logbook = vec![kikourou_entry("k1", "1999-01-01", 999.0, 60)
        .with_comments(None, Some("a/1".to_string()))];

    let outcome = Matcher::default().match_activities(&api, &logbook).unwrap();
    assert!(outcome.unmatched.is_empty());
    assert_eq!(outcome.matched.len(), 1);
    assert_eq!(outcome.matched[0].rule, MatchRule::Reference);
    assert_eq!(outcome.matched[0].api_id, "1");
    assert_eq!(outcome.matched[0].logbook_id, "k1");
}

#[test]
fn test_first_matching_entry_is_taken() {
    let api = vec![strava_activity("1", "2024-05-01", 10.0, 3600)];
    let logbook = vec![
        kikourou_entry("k1", "2024-04-30", 10.0, 3600),
        kikourou_entry("k2", "2024-05-01", 10.4, 3600),
        kikourou_entry("k3", "2024-05-01", 10.0, 3600),
    ];

    let outcome = Matcher::default().match_activities(&api, &logbook).unwrap();
    assert_eq!(outcome.matched[0].logbook_id, "k2");
    assert_eq!(outcome.matched[0].logbook_index, 1);
}

#[test]
fn test_two_activities_on_one_entry_is_fatal() {
    let api = vec![
        strava_activity("1", "2024-05-01", 10.0, 3600),
        strava_activity("2", "2024-05-01", 10.5, 3600),
    ];
    let logbook = vec![kikourou_entry("k1", "2024-05-01", 10.2, 3600)];

    let err = Matcher::default()
        .match_activities(&api, &logbook)
        .unwrap_err();
    match err {
        SyncError::DuplicateMatch {
            logbook_id,
            first_api_id,
            second_api_id,
        } => {
            assert_eq!(logbook_id, "k1");
            assert_eq!(first_api_id, "1");
            assert_eq!(second_api_id, "2");
        }
        other => panic!("expected DuplicateMatch, got {:?}", other),
    }
}

#[test]
fn test_reference_and_heuristic_on_same_entry_is_fatal() {
    let api = vec![
        strava_activity("1", "2024-05-01", 10.0, 3600),
        strava_activity("2", "2024-06-01", 3.0, 900),
    ];
    // k1 looks like activity 1 but was imported from activity 2
    let logbook = vec![kikourou_entry("k1", "2024-05-01", 10.0, 3600)
        .with_comments(None, Some("a/2".to_string()))];

    assert!(matches!(
        Matcher::default().match_activities(&api, &logbook),
        Err(SyncError::DuplicateMatch { .. })
    ));
}

#[test]
fn test_unclaimed_logbook_entries_are_fine() {
    let api = vec![strava_activity("1", "2024-05-01", 10.0, 3600)];
    let logbook = vec![
        kikourou_entry("manual", "2024-03-01", 42.195, 14_400),
        kikourou_entry("k1", "2024-05-01", 10.0, 3600),
    ];
    let outcome = Matcher::default().match_activities(&api, &logbook).unwrap();
    assert_eq!(outcome.matched.len(), 1);
    assert!(outcome.unmatched.is_empty());
}

#[test]
fn test_result_independent_of_logbook_order() {
    let api = vec![
        strava_activity("1", "2024-05-01", 10.0, 3600),
        strava_activity("2", "2024-05-02", 21.1, 7200),
        strava_activity("3", "2024-05-03", 5.0, 1500),
        strava_activity("4", "2024-05-04", 12.0, 4000),
    ];
    let logbook = vec![
        kikourou_entry("k1", "2024-05-01", 10.3, 3600),
        kikourou_entry("k2", "2024-05-09", 1.0, 60).with_comments(None, Some("a/2".to_string())),
        kikourou_entry("k3", "2024-05-04", 12.0, 4001),
        kikourou_entry("manual", "2024-05-05", 7.0, 2000),
    ];

    let expected: BTreeSet<String> = ["3", "4"].iter().map(|s| s.to_string()).collect();
    for ordering in permutations(&logbook) {
        let unmatched: BTreeSet<String> = unmatched_ids(&api, &ordering).into_iter().collect();
        assert_eq!(unmatched, expected);
    }
}

#[test]
fn test_second_run_after_import_matches_everything() {
    let api = vec![
        strava_activity("1", "2024-05-01", 10.0, 3600),
        strava_activity("2", "2024-05-02", 5.0, 1800),
        // same day and duration as 1 but far enough apart in distance
        strava_activity("3", "2024-05-01", 15.0, 3600),
    ];
    let mut logbook = vec![kikourou_entry("manual", "2024-04-01", 8.0, 2400)];

    let translator = FieldTranslator::default();
    let first = Matcher::default().match_activities(&api, &logbook).unwrap();
    assert_eq!(first.unmatched.len(), 3);

    let created: Vec<ActivityRecord> = first
        .unmatched
        .iter()
        .enumerate()
        .map(|(i, activity)| {
            let entry = translator.translate(activity, at("2024-05-03", 12)).entry;
            read_back(&format!("new{}", i), &entry)
        })
        .collect();
    logbook.extend(created);

    let second = Matcher::default().match_activities(&api, &logbook).unwrap();
    assert!(second.unmatched.is_empty(), "re-run must not create again");
    assert!(second
        .matched
        .iter()
        .all(|pair| pair.rule == MatchRule::Reference));
}
