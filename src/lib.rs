// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava-Kikourou: copy Strava activities into the Kikourou training log
//!
//! This crate fetches recent Strava activities and the Kikourou training
//! calendar, pairs activities that describe the same outing, and creates the
//! missing Kikourou entries.

pub mod config;
pub mod error;
pub mod latin1;
pub mod models;
pub mod services;
