//! Stage 2: event fetch.
//!
//! Queries the events directory with a valid intent (the orchestrator
//! short-circuits before this stage on extraction failure) and post-filters
//! the result to exact keyword matches.

use encore_core::directory::EventsDirectory;
use encore_core::models::{EventRecord, SearchIntent};
use thiserror::Error;

/// Terminal fetch failure, surfaced verbatim as the run's user message.
#[derive(Error, Debug)]
#[error("API error: {0}")]
pub struct FetchError(pub String);

/// Fetch and filter events for the given intent.
pub async fn fetch_events(
    intent: &SearchIntent,
    directory: &dyn EventsDirectory,
) -> Result<Vec<EventRecord>, FetchError> {
    let events = directory
        .search(intent)
        .await
        .map_err(|e| FetchError(e.to_string()))?;

    Ok(filter_by_keyword(events, &intent.keyword))
}

/// Keep only events whose display name contains the keyword as a
/// case-sensitive literal substring, preserving upstream order.
///
/// Deliberately strict: abbreviations or alternate spellings in event
/// titles will drop a fetched list to empty. Relaxing this (case-folding,
/// token matching) is a one-line change here if the policy ever softens.
pub fn filter_by_keyword(events: Vec<EventRecord>, keyword: &str) -> Vec<EventRecord> {
    events
        .into_iter()
        .filter(|event| event.name.contains(keyword))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
