//! Stage 3: response composition.
//!
//! Formats the fetched events into short structured summaries and asks the
//! language model to turn them into a friendly reply. This stage never
//! fails the run: a boundary error substitutes a fixed apology string.

use encore_core::llm::LanguageModel;
use encore_core::models::EventRecord;
use std::fmt::Write;

pub const COMPOSE_SYSTEM_PROMPT: &str =
    "You are a helpful assistant recommending relevant live music events based on the details provided.";

/// Fixed fallback when the model boundary is malformed or unreachable.
pub const COMPOSE_APOLOGY: &str =
    "Sorry, an error occurred while generating the response. Please try again later.";

/// Format each event as a numbered structured summary.
pub fn summarize_events(events: &[EventRecord]) -> String {
    let mut out = String::new();
    for (i, event) in events.iter().enumerate() {
        let price = match &event.price {
            Some(range) => {
                let min = range
                    .min
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "N/A".to_string());
                let max = range
                    .max
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "N/A".to_string());
                format!("${} - ${}", min, max)
            }
            None => "Price not specified".to_string(),
        };

        let _ = writeln!(out, "{}. Event Name: {}", i + 1, event.name);
        let _ = writeln!(
            out,
            "Venue: {} in {}",
            event.venue.as_deref().unwrap_or("Unknown Venue"),
            event.city.as_deref().unwrap_or("Unknown City"),
        );
        let _ = writeln!(
            out,
            "Date and Time: {} at {}",
            event.local_date.as_deref().unwrap_or("Unknown Date"),
            event.local_time.as_deref().unwrap_or("Unknown Time"),
        );
        let _ = writeln!(out, "Ticket Price: {}", price);
        let _ = writeln!(out, "Event URL: {}", event.url.as_deref().unwrap_or("#"));
        let _ = writeln!(
            out,
            "Event Image: {}",
            event.image_url.as_deref().unwrap_or("Image not available"),
        );
    }
    out
}

fn build_prompt(events: &[EventRecord]) -> String {
    format!(
        "You are a helpful assistant providing detailed responses about music events. \
         Based on the following event details, generate a friendly and engaging response \
         to present these events to the user:\n\n\
         Event Details:\n{}\n\
         If no events are found, provide a polite and helpful message encouraging the \
         user to try a different query.",
        summarize_events(events)
    )
}

/// Compose the final natural-language reply. Never fails.
pub async fn compose_response(
    events: &[EventRecord],
    llm: &dyn LanguageModel,
    max_tokens: u32,
) -> String {
    match llm
        .complete(COMPOSE_SYSTEM_PROMPT, &build_prompt(events), max_tokens)
        .await
    {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "Response generation failed, substituting apology");
            COMPOSE_APOLOGY.to_string()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
