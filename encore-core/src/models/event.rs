use serde::{Deserialize, Serialize};

/// One event as returned by the events directory, flattened from the raw
/// nested JSON. Absent fields stay `None`; display fallbacks are applied
/// by the response composer, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub name: String,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub local_date: Option<String>,
    pub local_time: Option<String>,
    pub price: Option<PriceRange>,
    pub url: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}
