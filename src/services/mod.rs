// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - sync logic and the two site clients.

pub mod kikourou;
pub mod matcher;
pub mod oauth_callback;
pub mod strava;
pub mod sync;
pub mod token_store;
pub mod translator;

pub use kikourou::KikourouClient;
pub use matcher::{MatchOutcome, MatchRule, MatchedPair, Matcher, MatcherConfig};
pub use strava::{StravaClient, StravaService};
pub use sync::{ActivitySource, CreateOutcome, LogbookWriter, SyncDriver, SyncOptions, SyncReport};
pub use token_store::{StoredTokens, TokenStore};
pub use translator::{FieldTranslator, LogbookEntry, Translation, TranslatorConfig, UnmappedCategory};
