//! Stage 1: keyword extraction.
//!
//! Turns a free-text query into a `SearchIntent` via one language-model
//! call. No retries — a failed or unparseable reply is a recoverable
//! outcome that terminates the run at ExtractFailed.

use encore_core::llm::{LanguageModel, LlmError};
use encore_core::models::SearchIntent;
use thiserror::Error;

pub const EXTRACT_SYSTEM_PROMPT: &str = "You are a music event assistant. Your task is to understand the user's input, \
     extract relevant keywords for artists, locations, and timeframes, and generate \
     a query for the events directory API. Ensure that the 'keyword' extracted from \
     the user query matches the exact artist's name or band name provided by the \
     user without including partial matches.";

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to parse keywords")]
    Parse,

    #[error("Failed to parse keywords: {0}")]
    Llm(#[from] LlmError),
}

fn build_user_prompt(query: &str) -> String {
    format!(
        r#"Given the following user query, identify:
1. Keywords (artists, genres, etc.).
2. Location (city or region).
3. Dates or timeframes.

Construct a directory API query in the following JSON format:
{{
    "keyword": "<artist/genre>",
    "city": "<city>",
    "startDateTime": "<ISO 8601 start date>",
    "endDateTime": "<ISO 8601 end date>"
}}

User Query: "{}""#,
        query
    )
}

/// Extract a structured search intent from free text.
pub async fn extract_intent(
    query: &str,
    llm: &dyn LanguageModel,
    max_tokens: u32,
) -> Result<SearchIntent, ExtractError> {
    let reply = llm
        .complete(EXTRACT_SYSTEM_PROMPT, &build_user_prompt(query), max_tokens)
        .await?;

    serde_json::from_str(reply.trim()).map_err(|_| ExtractError::Parse)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Model stub that always returns the same reply.
    struct CannedModel(&'static str);

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn complete(
            &self,
            _system: &str,
            _user: &str,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        async fn complete(
            &self,
            _system: &str,
            _user: &str,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            Err(LlmError::MissingContent)
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_extract_parses_well_formed_reply() {
        let model = CannedModel(
            r#"{"keyword": "Kenny G", "city": "Los Angeles", "startDateTime": "2027-01-01T00:00:00Z", "endDateTime": "2027-01-31T23:59:59Z"}"#,
        );
        let intent = extract_intent("Find Kenny G concerts in California next January", &model, 100)
            .await
            .expect("should parse");

        assert_eq!(intent.keyword, "Kenny G");
        assert_eq!(intent.city, "Los Angeles");
        assert_eq!(intent.start_date_time, "2027-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn test_extract_tolerates_missing_keys() {
        let model = CannedModel(r#"{"keyword": "jazz"}"#);
        let intent = extract_intent("jazz shows", &model, 100).await.expect("should parse");

        assert_eq!(intent.keyword, "jazz");
        assert!(intent.city.is_empty());
        assert!(intent.start_date_time.is_empty());
        assert!(intent.end_date_time.is_empty());
    }

    #[tokio::test]
    async fn test_extract_non_json_reply_is_parse_error() {
        let model = CannedModel("Sure! Here are some concerts you might like.");
        let result = extract_intent("anything", &model, 100).await;

        match result {
            Err(ExtractError::Parse) => {}
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extract_model_failure_is_recoverable() {
        let result = extract_intent("anything", &FailingModel, 100).await;
        assert!(matches!(result, Err(ExtractError::Llm(_))));
    }
}
