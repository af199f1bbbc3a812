//! Events-directory boundary for Encore
//!
//! `EventsDirectory` abstracts the third-party events API (a Discovery-style
//! `GET /events.json` endpoint). The client sends the four intent fields
//! verbatim — empty fields go out as empty parameters, never omitted — and
//! flattens the nested response into `EventRecord`s. A response without the
//! `_embedded` collection means zero results, not an error.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::{EventRecord, PriceRange, SearchIntent};

// ============================================================================
// EventsDirectory trait
// ============================================================================

/// Abstraction over the events directory.
#[async_trait]
pub trait EventsDirectory: Send + Sync {
    /// Run a directory search for the given intent. Returns the raw event
    /// list in upstream order, unfiltered.
    async fn search(&self, intent: &SearchIntent) -> Result<Vec<EventRecord>, DirectoryError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Missing API key")]
    MissingApiKey,
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone)]
pub struct DirectoryClientConfig {
    pub api_key: String,
    pub timeout_seconds: u64,
}

impl DirectoryClientConfig {
    pub fn new(api_key: Option<String>, timeout_seconds: u64) -> Self {
        let api_key = api_key
            .or_else(|| std::env::var("EVENTS_API_KEY").ok())
            .unwrap_or_default();

        Self {
            api_key,
            timeout_seconds,
        }
    }
}

// ============================================================================
// Raw directory response structs (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    #[serde(rename = "_embedded")]
    embedded: Option<EmbeddedEvents>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedEvents {
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    name: String,
    url: Option<String>,
    #[serde(default)]
    images: Vec<RawImage>,
    dates: Option<RawDates>,
    #[serde(rename = "priceRanges", default)]
    price_ranges: Vec<RawPriceRange>,
    #[serde(rename = "_embedded")]
    embedded: Option<RawEventEmbedded>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDates {
    start: Option<RawStart>,
}

#[derive(Debug, Deserialize)]
struct RawStart {
    #[serde(rename = "localDate")]
    local_date: Option<String>,
    #[serde(rename = "localTime")]
    local_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPriceRange {
    min: Option<f64>,
    max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawEventEmbedded {
    #[serde(default)]
    venues: Vec<RawVenue>,
}

#[derive(Debug, Deserialize)]
struct RawVenue {
    name: Option<String>,
    city: Option<RawCity>,
}

#[derive(Debug, Deserialize)]
struct RawCity {
    name: Option<String>,
}

impl RawEvent {
    fn into_record(self) -> EventRecord {
        let (venue, city) = match self.embedded.and_then(|e| e.venues.into_iter().next()) {
            Some(v) => (v.name, v.city.and_then(|c| c.name)),
            None => (None, None),
        };

        let (local_date, local_time) = match self.dates.and_then(|d| d.start) {
            Some(s) => (s.local_date, s.local_time),
            None => (None, None),
        };

        let price = self
            .price_ranges
            .into_iter()
            .next()
            .map(|p| PriceRange { min: p.min, max: p.max });

        EventRecord {
            name: self.name,
            venue,
            city,
            local_date,
            local_time,
            price,
            url: self.url,
            image_url: self.images.into_iter().next().and_then(|i| i.url),
        }
    }
}

// ============================================================================
// DirectoryClient
// ============================================================================

/// Events-directory client — calls the Discovery events endpoint.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    client: Client,
    config: DirectoryClientConfig,
    base_url: String,
}

impl DirectoryClient {
    pub fn new(config: DirectoryClientConfig) -> Result<Self, DirectoryError> {
        Self::with_base_url(
            config,
            "https://app.ticketmaster.com/discovery/v2".to_string(),
        )
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(
        config: DirectoryClientConfig,
        base_url: String,
    ) -> Result<Self, DirectoryError> {
        if config.api_key.is_empty() {
            return Err(DirectoryError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    async fn search_once(&self, intent: &SearchIntent) -> Result<Vec<EventRecord>, DirectoryError> {
        let url = format!("{}/events.json", self.base_url);

        // Keyword is wrapped in double quotes so the directory does an
        // exact-phrase match rather than tokenized matching.
        let quoted_keyword = format!("\"{}\"", intent.keyword);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("keyword", quoted_keyword.as_str()),
                ("city", intent.city.as_str()),
                ("startDateTime", intent.start_date_time.as_str()),
                ("endDateTime", intent.end_date_time.as_str()),
                ("apikey", self.config.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(code = status.as_u16(), message = %message, "Directory API error");
            return Err(DirectoryError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let discovery: DiscoveryResponse = response.json().await?;

        let events = discovery
            .embedded
            .map(|e| e.events.into_iter().map(RawEvent::into_record).collect())
            .unwrap_or_default();

        Ok(events)
    }
}

#[async_trait]
impl EventsDirectory for DirectoryClient {
    async fn search(&self, intent: &SearchIntent) -> Result<Vec<EventRecord>, DirectoryError> {
        self.search_once(intent).await
    }

    fn name(&self) -> &str {
        "discovery"
    }
}

// ============================================================================
// TESTS
// ============================================================================
