//! Pipeline orchestrator.
//!
//! Sequences the three stages (extract → fetch → compose), records one
//! workflow step per transition, persists outcomes, and contains every
//! fault: the caller always receives a displayable string and a trace,
//! never a raw error.
//!
//! State machine:
//! `Start → Extracting → (ExtractFailed | Extracted) → Fetching →
//! (FetchFailed | Fetched) → Composing → Done`, with a catch-all `Faulted`
//! for anything unexpected. Stage errors are tagged values; only this
//! module catches broadly.

use std::sync::Arc;

use encore_core::config::EncoreConfig;
use encore_core::directory::{DirectoryClient, DirectoryClientConfig, EventsDirectory};
use encore_core::llm::{ChatClient, ChatClientConfig, LanguageModel};
use encore_core::models::{Preference, StepName, WorkflowStep};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::store;
use crate::subsystems::{compose, extract, fetch};

/// User-visible message for a run that terminates at ExtractFailed.
pub const EXTRACT_FAILED_MESSAGE: &str =
    "Failed to extract keywords. Please refine your query.";

/// Everything one run hands back to the caller.
#[derive(Debug, Serialize)]
pub struct RunOutcome {
    /// Displayable result text (final reply or failure message).
    pub result: String,
    /// Ordered audit trail, one step per transition.
    pub trace: Vec<WorkflowStep>,
    /// History record id; present only for runs that reach `Done`.
    pub record_id: Option<i64>,
    /// Best-effort persistence failures. Never fatal.
    pub warnings: Vec<String>,
}

/// Orchestrates one query pipeline run at a time. Cheap to clone; runs from
/// different sessions may execute concurrently, keyed by their own user ids.
#[derive(Clone)]
pub struct Orchestrator {
    pool: SqlitePool,
    llm: Arc<dyn LanguageModel>,
    directory: Arc<dyn EventsDirectory>,
    extract_max_tokens: u32,
    compose_max_tokens: u32,
}

impl Orchestrator {
    pub fn new(
        pool: SqlitePool,
        llm: Arc<dyn LanguageModel>,
        directory: Arc<dyn EventsDirectory>,
        extract_max_tokens: u32,
        compose_max_tokens: u32,
    ) -> Self {
        Self {
            pool,
            llm,
            directory,
            extract_max_tokens,
            compose_max_tokens,
        }
    }

    /// Build the production orchestrator from config, with API keys taken
    /// from the environment.
    pub fn from_config(pool: SqlitePool, config: &EncoreConfig) -> anyhow::Result<Self> {
        let llm = ChatClient::new(ChatClientConfig::new(
            None,
            config.language_model.model.clone(),
            config.language_model.temperature,
        ))?;
        let directory = DirectoryClient::new(DirectoryClientConfig::new(
            None,
            config.directory.timeout_seconds,
        ))?;

        Ok(Self::new(
            pool,
            Arc::new(llm),
            Arc::new(directory),
            config.language_model.extract_max_tokens,
            config.language_model.compose_max_tokens,
        ))
    }

    /// Run the full pipeline for one query. Always terminates with a
    /// displayable result; unexpected faults are downgraded to an "Error"
    /// trace step plus a generic message.
    pub async fn run_query(&self, user_id: &str, query_text: &str) -> RunOutcome {
        let mut trace = Vec::new();
        let mut warnings = Vec::new();

        match self
            .run_inner(user_id, query_text, &mut trace, &mut warnings)
            .await
        {
            Ok((result, record_id)) => RunOutcome {
                result,
                trace,
                record_id,
                warnings,
            },
            Err(fault) => {
                tracing::error!(error = %fault, user_id, "Pipeline run faulted");
                trace.push(WorkflowStep::new(
                    StepName::Error,
                    serde_json::Value::String(fault.to_string()),
                ));
                RunOutcome {
                    result: format!("An unexpected error occurred: {}", fault),
                    trace,
                    record_id: None,
                    warnings,
                }
            }
        }
    }

    async fn run_inner(
        &self,
        user_id: &str,
        query_text: &str,
        trace: &mut Vec<WorkflowStep>,
        warnings: &mut Vec<String>,
    ) -> anyhow::Result<(String, Option<i64>)> {
        // Extracting → ExtractFailed | Extracted
        let intent = match extract::extract_intent(
            query_text,
            self.llm.as_ref(),
            self.extract_max_tokens,
        )
        .await
        {
            Ok(intent) => {
                trace.push(WorkflowStep::new(
                    StepName::ExtractKeywords,
                    serde_json::to_value(&intent)?,
                ));
                intent
            }
            Err(e) => {
                trace.push(WorkflowStep::new(
                    StepName::ExtractKeywords,
                    serde_json::json!({ "error": e.to_string() }),
                ));
                return Ok((EXTRACT_FAILED_MESSAGE.to_string(), None));
            }
        };

        // Preference capture is unconditional once the intent is understood,
        // even if the later fetch fails. Store failure is a warning only.
        let preference = Preference::from_intent(&intent);
        if let Err(e) = store::save_preference(&self.pool, user_id, &preference).await {
            tracing::warn!(error = %e, user_id, "Failed to save preferences");
            warnings.push(format!("Failed to save preferences: {}", e));
        }
        trace.push(WorkflowStep::new(
            StepName::SavePreferences,
            serde_json::to_value(&preference)?,
        ));

        // Fetching → FetchFailed | Fetched
        let events = match fetch::fetch_events(&intent, self.directory.as_ref()).await {
            Ok(events) => {
                trace.push(WorkflowStep::new(
                    StepName::FetchEvents,
                    serde_json::to_value(&events)?,
                ));
                events
            }
            Err(e) => {
                let message = e.to_string();
                trace.push(WorkflowStep::new(
                    StepName::FetchEvents,
                    serde_json::json!({ "error": message }),
                ));
                return Ok((message, None));
            }
        };

        // Composing → Done. Composition never fails the run.
        let response =
            compose::compose_response(&events, self.llm.as_ref(), self.compose_max_tokens).await;
        trace.push(WorkflowStep::new(
            StepName::GenerateResponse,
            serde_json::Value::String(response.clone()),
        ));

        // Only runs that reach composition are logged to history; both
        // persistence calls are best-effort.
        let record_id =
            match store::append_query_record(&self.pool, user_id, query_text, &response).await {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(error = %e, user_id, "Failed to log query");
                    warnings.push(format!("Failed to log query: {}", e));
                    None
                }
            };

        if let Err(e) = store::append_workflow_steps(&self.pool, user_id, trace).await {
            tracing::warn!(error = %e, user_id, "Failed to log workflow trace");
            warnings.push(format!("Failed to log workflow trace: {}", e));
        }

        Ok((response, record_id))
    }
}
