use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// User verdict on a generated response. Stored as TEXT ("Like"/"Dislike").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Feedback {
    Like,
    Dislike,
}

impl Feedback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feedback::Like => "Like",
            Feedback::Dislike => "Dislike",
        }
    }
}

impl FromStr for Feedback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Like" | "like" => Ok(Feedback::Like),
            "Dislike" | "dislike" => Ok(Feedback::Dislike),
            other => Err(format!("invalid feedback value: {}", other)),
        }
    }
}

/// One completed query/response pair. Created only by runs that reach
/// response generation; feedback is mutated later by a separate user action.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueryRecord {
    pub id: i64,
    pub user_id: String,
    pub query: String,
    pub response: String,
    pub feedback: Option<Feedback>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
