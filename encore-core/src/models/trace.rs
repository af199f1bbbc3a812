use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed set of pipeline steps a run can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepName {
    #[serde(rename = "Extract Keywords")]
    ExtractKeywords,
    #[serde(rename = "Save Preferences")]
    SavePreferences,
    #[serde(rename = "Fetch Events")]
    FetchEvents,
    #[serde(rename = "Generate Response")]
    GenerateResponse,
    #[serde(rename = "Error")]
    Error,
}

impl StepName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::ExtractKeywords => "Extract Keywords",
            StepName::SavePreferences => "Save Preferences",
            StepName::FetchEvents => "Fetch Events",
            StepName::GenerateResponse => "Generate Response",
            StepName::Error => "Error",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a run's audit trail. The orchestrator appends exactly one
/// per state transition and hands the full sequence to the trace store when
/// the run completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub step: StepName,
    pub output: serde_json::Value,
}

impl WorkflowStep {
    pub fn new(step: StepName, output: serde_json::Value) -> Self {
        Self { step, output }
    }

    /// Whether the recorded payload carries an error marker.
    pub fn is_failure(&self) -> bool {
        self.step == StepName::Error
            || self
                .output
                .as_object()
                .is_some_and(|o| o.contains_key("error"))
    }
}

/// A persisted workflow step as read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkflowStepRow {
    pub id: i64,
    pub user_id: String,
    pub step: String,
    pub output: String,
    pub created_at: DateTime<Utc>,
}
