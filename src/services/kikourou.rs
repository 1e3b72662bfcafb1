// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Kikourou training log client.
//!
//! Kikourou has no API: the session is opened through the phpBB forum login,
//! entries are read from the rendered training calendar and detail pages, and
//! new entries are submitted through the "ajout" form. Pages and form values
//! are ISO-8859-1.

use crate::config::KikourouConfig;
use crate::error::{Result, Side, SyncError};
use crate::latin1::{self, Latin1Text};
use crate::models::ActivityRecord;
use crate::services::sync::{ActivitySource, CreateOutcome, LogbookWriter};
use crate::services::translator::LogbookEntry;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

pub const BASE_URL: &str = "http://www.kikourou.net";

/// Shown after a successful forum login.
const LOGIN_SUCCESS_MARKER: &str = "Vous vous êtes connecté avec succès";
/// Shown in the main frame after a training entry was saved.
const CREATE_SUCCESS_MARKER: &str = "Nouvel entrainement enregistré";

/// Longest site message kept in a rejection.
const MAX_MESSAGE_CHARS: usize = 300;

/// Form fields with the same value for every imported entry: continuous
/// effort, average difficulty, default sleep/weather/terrain and the
/// athlete's heart-rate zones.
const FIXED_FORM_FIELDS: &[(&str, &str)] = &[
    ("type", "1"),
    ("difficulte", "4"),
    ("phase", "0"),
    ("details", "0"),
    ("submit", "Enregistrer"),
    ("dureesommeil", "0"),
    ("etape", "3"),
    ("etatarrivee", "1"),
    ("etirements", "0"),
    ("FCmaxj", "180"),
    ("FCR", "45"),
    ("forme", "1"),
    ("meteo", "1"),
    ("pct1", "100"),
    ("sommeil", "1"),
    ("typeterrain1", "1"),
    ("typeterrain2", "1"),
    ("typeterrain3", "1"),
    ("zone1", "122"),
    ("zone2", "150"),
    ("zone3", "157"),
    ("zone4", "166"),
    ("zone5", "173"),
    ("zone5sup", "178"),
];

/// One row of the training calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    /// Detail page path relative to `/entrainement/`
    pub path: String,
    pub title: String,
}

/// Kikourou session for one user.
pub struct KikourouClient {
    http: reqwest::Client,
    base_url: String,
    user_id: u64,
    name: String,
    password: String,
    limit: usize,
}

impl KikourouClient {
    pub fn new(config: &KikourouConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/xml,application/xml,application/xhtml+xml,text/html;q=0.9,text/plain;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("fr,fr-FR;q=0.8,en-US;q=0.5,en;q=0.3"),
        );

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent("Mozilla/5.0")
            .default_headers(headers)
            .build()
            .map_err(|e| SyncError::Kikourou(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: BASE_URL.to_string(),
            user_id: config.user_id,
            name: config.name.clone(),
            password: config.password.clone(),
            limit: config.limit,
        })
    }

    /// Open a forum session; the session cookie is kept by the client.
    pub async fn login(&self) -> Result<()> {
        let url = format!("{}/forum/ucp.php?mode=login", self.base_url);

        let page = self.send(self.http.post(&url)).await?;
        let sid = parse_login_sid(&page)?;

        let form = encode_pairs(&[
            ("mode", Latin1Text::encode("login")),
            ("username", Latin1Text::encode(&self.name)),
            ("password", Latin1Text::encode(&self.password)),
            ("sid", Latin1Text::encode(&sid)),
            ("redirect", Latin1Text::encode("./ucp.php?mode=login")),
            ("login", Latin1Text::encode("Connection")),
        ]);
        let page = self
            .send(
                self.http
                    .post(&url)
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(form),
            )
            .await?;

        if !page.contains(LOGIN_SUCCESS_MARKER) {
            return Err(SyncError::Kikourou(format!(
                "Login refused for user '{}'",
                self.name
            )));
        }

        tracing::info!(user = %self.name, "Connected to Kikourou");
        Ok(())
    }

    /// Send a request and decode the page body.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Kikourou(e.to_string()))?;

        let status = response.status();
        let url = response.url().to_string();
        if !status.is_success() {
            return Err(SyncError::Kikourou(format!("HTTP {} for {}", status, url)));
        }

        let utf8 = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_ascii_lowercase().contains("utf-8"));
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SyncError::Kikourou(format!("Reading {}: {}", url, e)))?;

        Ok(if utf8 {
            String::from_utf8_lossy(&bytes).into_owned()
        } else {
            latin1::decode(&bytes)
        })
    }

    fn detail_url(&self, path: &str) -> String {
        format!("{}/entrainement/{}", self.base_url, path)
    }
}

#[async_trait]
impl ActivitySource for KikourouClient {
    fn side(&self) -> Side {
        Side::Kikourou
    }

    async fn fetch_activities(&self) -> Result<Vec<ActivityRecord>> {
        let url = format!("{}/entrainement/navigation.php", self.base_url);
        let page = self
            .send(self.http.get(&url).query(&[
                ("nav1an", "1".to_string()),
                ("kikoureur", self.user_id.to_string()),
            ]))
            .await?;

        let rows = parse_listing(&page)?;
        let mut activities = Vec::with_capacity(rows.len().min(self.limit));

        for row in rows.into_iter().take(self.limit) {
            let detail_url = self.detail_url(&row.path);
            let detail = self.send(self.http.get(&detail_url)).await?;
            let record = parse_detail(&detail, &row, &detail_url)?;
            tracing::debug!(activity = %record.label(), "Read Kikourou entry");
            activities.push(record);
        }

        Ok(activities)
    }
}

#[async_trait]
impl LogbookWriter for KikourouClient {
    async fn create_entry(&self, entry: &LogbookEntry) -> Result<CreateOutcome> {
        let url = format!(
            "{}/entrainement/ajout.php?{}",
            self.base_url,
            entry_query(entry)
        );

        let page = self
            .send(
                self.http
                    .post(&url)
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded"),
            )
            .await?;

        Ok(parse_create_response(&page))
    }
}

/// Query string for the "ajout" form, values percent-encoded from Latin-1.
pub fn entry_query(entry: &LogbookEntry) -> String {
    let text = |s: &str| Latin1Text::encode(s);

    let mut pairs = vec![
        ("jour", text(&entry.day.to_string())),
        ("mois", text(&entry.month.to_string())),
        ("annee", text(&entry.year.to_string())),
        ("nom", entry.name.clone()),
        ("lieu", entry.location.clone()),
        ("intensite", text(&entry.intensity.to_string())),
        ("sport", text(&entry.sport.to_string())),
        ("distance", text(&entry.distance)),
        ("denivele", text(&entry.elevation.to_string())),
        ("heure", text(&entry.hours.to_string())),
        ("min", text(&entry.minutes.to_string())),
        ("sec", text(&entry.seconds.to_string())),
        (
            "fcmoy",
            text(entry.heart_rate_avg.as_deref().unwrap_or_default()),
        ),
        (
            "fcmax",
            text(&entry.heart_rate_max.map(|hr| hr.to_string()).unwrap_or_default()),
        ),
        ("descriptionpublique", entry.public_description.clone()),
        ("description", entry.private_description.clone()),
    ];
    pairs.extend(FIXED_FORM_FIELDS.iter().map(|&(k, v)| (k, text(v))));

    encode_pairs(&pairs)
}

fn encode_pairs(pairs: &[(&str, Latin1Text)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v.url_encoded()))
        .collect::<Vec<_>>()
        .join("&")
}

fn selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| SyncError::Kikourou(e.to_string()))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Hidden session id of the forum login form.
pub fn parse_login_sid(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let sel = selector(r#"input[name="sid"]"#)?;
    document
        .select(&sel)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
        .ok_or_else(|| SyncError::Kikourou("Login form has no sid".to_string()))
}

/// Entries of the training calendar, newest first as the site lists them.
pub fn parse_listing(html: &str) -> Result<Vec<ListingRow>> {
    let document = Html::parse_document(html);
    let table_sel = selector("table.calendrier")?;
    let tr_sel = selector("tr")?;
    let th_sel = selector("th")?;
    let td_sel = selector("td")?;
    let a_sel = selector("a")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| SyncError::Kikourou("Training calendar not found".to_string()))?;

    let mut rows = Vec::new();
    for (i, tr) in table.select(&tr_sel).enumerate() {
        if tr.select(&th_sel).next().is_some() {
            continue;
        }

        let link = tr
            .select(&td_sel)
            .nth(1)
            .and_then(|td| td.select(&a_sel).next())
            .ok_or_else(|| SyncError::Kikourou(format!("Calendar row {} has no entry link", i)))?;
        let path = link
            .value()
            .attr("href")
            .ok_or_else(|| SyncError::Kikourou(format!("Calendar row {} link has no href", i)))?;

        rows.push(ListingRow {
            path: path.to_string(),
            title: element_text(link),
        });
    }

    tracing::debug!(count = rows.len(), "Parsed training calendar");
    Ok(rows)
}

/// Build a record from an entry's detail page.
pub fn parse_detail(html: &str, row: &ListingRow, url: &str) -> Result<ActivityRecord> {
    let document = Html::parse_document(html);
    let table_sel = selector("#contenuprincipal table")?;
    let tr_sel = selector("tr")?;
    let td_sel = selector("td")?;

    let table = document.select(&table_sel).next().ok_or_else(|| {
        SyncError::Kikourou(format!("No detail table on {}", url))
    })?;
    let trs: Vec<ElementRef<'_>> = table.select(&tr_sel).collect();
    if trs.len() < 6 {
        return Err(SyncError::Kikourou(format!(
            "Detail table of {} has only {} rows",
            url,
            trs.len()
        )));
    }

    let cells = |row: usize| -> Vec<String> { trs[row].select(&td_sel).map(element_text).collect() };
    let cell = |row: usize, col: usize| -> Result<String> {
        cells(row).get(col).cloned().ok_or_else(|| {
            SyncError::Kikourou(format!("Missing cell {}:{} on {}", row, col, url))
        })
    };

    let date = parse_date(&cell(1, 1)?)?;
    let distance = cells(1)
        .last()
        .cloned()
        .ok_or_else(|| SyncError::Kikourou(format!("Missing distance on {}", url)))?;
    let distance_km = parse_distance(&distance)?;
    let elevation = parse_elevation(&cell(2, 5)?)?;
    let kind = cell(3, 1)?;
    let elapsed = parse_duration(&cell(3, 5)?)?;

    let public_comment = element_text(trs[trs.len() - 3]);
    let private_comment = trs[trs.len() - 1]
        .select(&td_sel)
        .next()
        .map(element_text)
        .unwrap_or_default();

    Ok(ActivityRecord::new(
        row.path.clone(),
        url,
        date.and_time(NaiveTime::MIN),
        distance_km,
        elapsed,
    )?
    .with_name(row.title.clone())
    .with_activity_type(kind)
    .with_elevation(elevation)
    .with_comments(Some(public_comment), Some(private_comment)))
}

/// Whether the "ajout" response confirms the entry was saved.
pub fn parse_create_response(html: &str) -> CreateOutcome {
    let document = Html::parse_document(html);
    let main_text = selector("#contenuprincipal").ok().and_then(|sel| {
        document.select(&sel).next().map(element_text)
    });

    match main_text {
        Some(text) if text.contains(CREATE_SUCCESS_MARKER) => CreateOutcome::Created,
        Some(text) if !text.is_empty() => CreateOutcome::Rejected {
            message: Some(
                text.split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
                    .chars()
                    .take(MAX_MESSAGE_CHARS)
                    .collect(),
            ),
        },
        _ => CreateOutcome::Rejected { message: None },
    }
}

/// Parse a `dd/mm/yyyy` date.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%d/%m/%Y")
        .map_err(|e| SyncError::Kikourou(format!("Bad date '{}': {}", text, e)))
}

/// Parse a duration like `01h05'30''`, `05'30''` or `30''`.
pub fn parse_duration(text: &str) -> Result<Duration> {
    let bad = || SyncError::Kikourou(format!("Bad duration '{}'", text));
    let number = |s: &str| s.trim().parse::<u64>().map_err(|_| bad());

    let trimmed = text.trim();
    let rest = trimmed
        .strip_suffix("''")
        .or_else(|| trimmed.strip_suffix('"'))
        .ok_or_else(bad)?;

    let (hours, rest) = match rest.split_once('h') {
        Some((h, rest)) => (number(h)?, rest),
        None => (0, rest),
    };
    let (minutes, seconds) = match rest.split_once('\'') {
        Some((m, s)) => (number(m)?, number(s)?),
        None => (0, number(rest)?),
    };

    let total = hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|hm| hm.checked_add(seconds))
        .ok_or_else(bad)?;
    Ok(Duration::from_secs(total))
}

/// Parse an elevation like `250 m`; `-` means none.
pub fn parse_elevation(text: &str) -> Result<u32> {
    let value = text.split_whitespace().next().unwrap_or("-");
    if value == "-" {
        return Ok(0);
    }
    value
        .trim_end_matches('m')
        .parse()
        .map_err(|_| SyncError::Kikourou(format!("Bad elevation '{}'", text)))
}

/// Parse a distance like `10.5 km` (a decimal comma is accepted).
pub fn parse_distance(text: &str) -> Result<f64> {
    text.split_whitespace()
        .next()
        .map(|v| v.replace(',', "."))
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| SyncError::Kikourou(format!("Bad distance '{}'", text)))
}
