use serde::{Deserialize, Serialize};

/// Structured search parameters extracted from a free-text query.
///
/// The serde names match the JSON shape the language model is instructed to
/// produce; every field defaults to empty so a partial reply still parses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIntent {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub city: String,
    #[serde(default, rename = "startDateTime")]
    pub start_date_time: String,
    #[serde(default, rename = "endDateTime")]
    pub end_date_time: String,
}
