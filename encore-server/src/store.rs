//! Persistence store for Encore
//!
//! All durable state lives in three SQLite tables: per-user preference
//! lists, the query/response history, and the per-run workflow log.
//! Each operation is atomic per key; SQLite serializes writers. Callers
//! treat failures as best-effort warnings — a store error never aborts a
//! pipeline run.

use chrono::{DateTime, Utc};
use encore_core::models::{Feedback, Preference, QueryRecord, WorkflowStep, WorkflowStepRow};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// A raw preference row as stored, for the admin listing. The `preferences`
/// column holds the JSON-encoded list.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PreferenceRow {
    pub user_id: String,
    pub preferences: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Preferences
// ============================================================================

/// Fetch a user's accumulated preference list. `None` if the user has no row.
pub async fn get_preferences(
    pool: &SqlitePool,
    user_id: &str,
) -> anyhow::Result<Option<Vec<Preference>>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT preferences FROM user_preferences WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    match row {
        Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Append a preference to the user's list unless an identical one is already
/// present, then write the full list back and refresh `updated_at`.
/// Last-writer-wins per user; each session owns its user id exclusively.
pub async fn save_preference(
    pool: &SqlitePool,
    user_id: &str,
    new_preference: &Preference,
) -> anyhow::Result<()> {
    let existing = get_preferences(pool, user_id).await?;
    let had_row = existing.is_some();
    let mut preferences = existing.unwrap_or_default();

    if !preferences.contains(new_preference) {
        preferences.push(new_preference.clone());
    }

    let json = serde_json::to_string(&preferences)?;
    let now = Utc::now();

    if had_row {
        sqlx::query("UPDATE user_preferences SET preferences = ?, updated_at = ? WHERE user_id = ?")
            .bind(&json)
            .bind(now)
            .bind(user_id)
            .execute(pool)
            .await?;
    } else {
        sqlx::query(
            "INSERT INTO user_preferences (user_id, preferences, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&json)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// All preference rows, for the admin listing.
pub async fn list_preference_rows(pool: &SqlitePool) -> anyhow::Result<Vec<PreferenceRow>> {
    let rows = sqlx::query_as::<_, PreferenceRow>(
        "SELECT user_id, preferences, created_at, updated_at FROM user_preferences ORDER BY user_id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ============================================================================
// Query history
// ============================================================================

/// Append a completed query/response pair and return its assigned id.
pub async fn append_query_record(
    pool: &SqlitePool,
    user_id: &str,
    query: &str,
    response: &str,
) -> anyhow::Result<i64> {
    let now = Utc::now();
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO query_history (user_id, query, response, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(query)
    .bind(response)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

/// Set the feedback verdict on a record. Idempotent; returns false when the
/// record does not exist.
pub async fn update_feedback(
    pool: &SqlitePool,
    record_id: i64,
    feedback: Feedback,
) -> anyhow::Result<bool> {
    let result = sqlx::query("UPDATE query_history SET feedback = ?, updated_at = ? WHERE id = ?")
        .bind(feedback)
        .bind(Utc::now())
        .bind(record_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_query_records(pool: &SqlitePool) -> anyhow::Result<Vec<QueryRecord>> {
    let rows = sqlx::query_as::<_, QueryRecord>(
        "SELECT id, user_id, query, response, feedback, created_at, updated_at FROM query_history ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Bulk-clear the query history. Individual records are never deleted.
pub async fn clear_query_records(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM query_history").execute(pool).await?;
    Ok(())
}

// ============================================================================
// Workflow log
// ============================================================================

/// Persist a run's full trace, one row per step, in order.
pub async fn append_workflow_steps(
    pool: &SqlitePool,
    user_id: &str,
    steps: &[WorkflowStep],
) -> anyhow::Result<()> {
    let now = Utc::now();
    for step in steps {
        sqlx::query("INSERT INTO workflow_log (user_id, step, output, created_at) VALUES (?, ?, ?, ?)")
            .bind(user_id)
            .bind(step.step.as_str())
            .bind(serde_json::to_string(&step.output)?)
            .bind(now)
            .execute(pool)
            .await?;
    }
    Ok(())
}

pub async fn list_workflow_steps(pool: &SqlitePool) -> anyhow::Result<Vec<WorkflowStepRow>> {
    let rows = sqlx::query_as::<_, WorkflowStepRow>(
        "SELECT id, user_id, step, output, created_at FROM workflow_log ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::models::{SearchIntent, StepName};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        encore_core::db::init_schema(&pool).await.expect("schema");
        pool
    }

    fn pref(artist: &str) -> Preference {
        Preference {
            artist: artist.to_string(),
            location: "Chicago".to_string(),
            timeframe: "2027-03-01 to 2027-03-31".to_string(),
        }
    }

    #[tokio::test]
    async fn test_get_preferences_none_for_unknown_user() {
        let pool = test_pool().await;
        let prefs = get_preferences(&pool, "nobody").await.unwrap();
        assert!(prefs.is_none());
    }

    #[tokio::test]
    async fn test_save_preference_appends_and_dedups() {
        let pool = test_pool().await;

        save_preference(&pool, "u1", &pref("Kenny G")).await.unwrap();
        save_preference(&pool, "u1", &pref("Kenny G")).await.unwrap();
        save_preference(&pool, "u1", &pref("Norah Jones")).await.unwrap();

        let prefs = get_preferences(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(prefs.len(), 2, "Duplicate preference must not be appended");
        assert_eq!(prefs[0].artist, "Kenny G");
        assert_eq!(prefs[1].artist, "Norah Jones");
    }

    #[tokio::test]
    async fn test_save_preference_isolated_per_user() {
        let pool = test_pool().await;

        save_preference(&pool, "u1", &pref("Kenny G")).await.unwrap();
        save_preference(&pool, "u2", &pref("Kenny G")).await.unwrap();

        assert_eq!(get_preferences(&pool, "u1").await.unwrap().unwrap().len(), 1);
        assert_eq!(get_preferences(&pool, "u2").await.unwrap().unwrap().len(), 1);

        let rows = list_preference_rows(&pool).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_append_query_record_assigns_increasing_ids() {
        let pool = test_pool().await;

        let first = append_query_record(&pool, "u1", "q1", "r1").await.unwrap();
        let second = append_query_record(&pool, "u1", "q2", "r2").await.unwrap();
        assert!(second > first);

        let records = list_query_records(&pool).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].query, "q1");
        assert!(records[0].feedback.is_none());
    }

    #[tokio::test]
    async fn test_update_feedback_is_idempotent() {
        let pool = test_pool().await;
        let id = append_query_record(&pool, "u1", "q", "r").await.unwrap();

        assert!(update_feedback(&pool, id, Feedback::Like).await.unwrap());
        assert!(update_feedback(&pool, id, Feedback::Like).await.unwrap());

        let records = list_query_records(&pool).await.unwrap();
        assert_eq!(records[0].feedback, Some(Feedback::Like));

        assert!(update_feedback(&pool, id, Feedback::Dislike).await.unwrap());
        let records = list_query_records(&pool).await.unwrap();
        assert_eq!(records[0].feedback, Some(Feedback::Dislike));
    }

    #[tokio::test]
    async fn test_update_feedback_unknown_record_returns_false() {
        let pool = test_pool().await;
        let updated = update_feedback(&pool, 9999, Feedback::Like).await.unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_clear_query_records_bulk_only() {
        let pool = test_pool().await;
        append_query_record(&pool, "u1", "q1", "r1").await.unwrap();
        append_query_record(&pool, "u2", "q2", "r2").await.unwrap();

        clear_query_records(&pool).await.unwrap();
        assert!(list_query_records(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_workflow_steps_persist_in_order() {
        let pool = test_pool().await;

        let intent = SearchIntent {
            keyword: "Kenny G".to_string(),
            city: "LA".to_string(),
            start_date_time: String::new(),
            end_date_time: String::new(),
        };
        let steps = vec![
            WorkflowStep::new(
                StepName::ExtractKeywords,
                serde_json::to_value(&intent).unwrap(),
            ),
            WorkflowStep::new(StepName::FetchEvents, serde_json::json!({"events": []})),
        ];

        append_workflow_steps(&pool, "u1", &steps).await.unwrap();

        let rows = list_workflow_steps(&pool).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].step, "Extract Keywords");
        assert_eq!(rows[1].step, "Fetch Events");
        let payload: serde_json::Value = serde_json::from_str(&rows[0].output).unwrap();
        assert_eq!(payload["keyword"], "Kenny G");
    }
}
