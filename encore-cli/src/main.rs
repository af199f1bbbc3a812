//! encore-cli — terminal frontend for the Encore events assistant
//!
//! Talks to the encore-server HTTP API. A query run prints the assistant's
//! reply plus the per-run workflow trace, the same audit trail the UI
//! sidebar renders.
//!
//! # Subcommands
//! - `query <text> [--user <id>] [--json]` — run the three-stage pipeline
//! - `feedback <record-id> <like|dislike>` — rate a previous response
//! - `history`                              — list the query history
//! - `workflow`                             — list persisted workflow steps
//! - `clear-history`                        — bulk-clear the query history
//! - `status`                               — show server health

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8780";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "encore-cli",
    version,
    about = "Encore live-music events assistant — HTTP API frontend"
)]
struct Cli {
    /// Encore HTTP server URL (overrides ENCORE_HTTP_URL env var)
    #[arg(long, env = "ENCORE_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ask for live music events in natural language
    Query {
        /// Free-text query, e.g. "Find Kenny G concerts in California next January"
        text: String,

        /// Session user id; omit to let the server mint one
        #[arg(long)]
        user: Option<String>,

        /// Print the raw JSON response instead of formatted output
        #[arg(long)]
        json: bool,
    },

    /// Rate a previous response
    Feedback {
        /// The record id returned by a query run
        record_id: i64,

        /// "like" or "dislike"
        verdict: String,
    },

    /// List the query history
    History,

    /// List persisted workflow steps
    Workflow,

    /// Clear the query history
    ClearHistory,

    /// Show Encore server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TraceStep {
    pub step: String,
    pub output: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    pub user_id: String,
    pub result: String,
    pub trace: Vec<TraceStep>,
    pub record_id: Option<i64>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

// ============================================================================
// Output formatting
// ============================================================================

/// Render one trace step as a sidebar-style status line.
pub fn format_trace_step(step: &TraceStep) -> String {
    let failed = step.step == "Error"
        || step
            .output
            .as_object()
            .is_some_and(|o| o.contains_key("error"));
    let marker = if failed { "Failed" } else { "Success" };
    format!("{} - {}", step.step, marker)
}

/// Render the full query response for the terminal.
pub fn format_query_response(resp: &QueryResponse) -> String {
    let mut out = String::new();

    out.push_str(&resp.result);
    out.push('\n');

    out.push_str("\nWorkflow:\n");
    for step in &resp.trace {
        out.push_str("  ");
        out.push_str(&format_trace_step(step));
        out.push('\n');
    }

    if let Some(id) = resp.record_id {
        out.push_str(&format!("\nRecord id: {} (user {})\n", id, resp.user_id));
    }

    for warning in &resp.warnings {
        out.push_str(&format!("warning: {}\n", warning));
    }

    out
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn http_client() -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()?)
}

fn do_query(server: &str, text: &str, user: Option<String>, json_output: bool) -> anyhow::Result<()> {
    let client = http_client()?;
    let url = format!("{}/query", server);
    let body = serde_json::json!({
        "user_id": user,
        "query": text,
    });

    let resp = match client.post(&url).json(&body).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("encore-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("encore-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }

    if json_output {
        let raw: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&raw)?);
        return Ok(());
    }

    let query_resp: QueryResponse = match resp.json() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("encore-cli: failed to parse query response: {}", e);
            std::process::exit(1);
        }
    };

    print!("{}", format_query_response(&query_resp));
    Ok(())
}

fn do_feedback(server: &str, record_id: i64, verdict: &str) -> anyhow::Result<()> {
    let client = http_client()?;
    let url = format!("{}/feedback", server);
    let body = serde_json::json!({
        "record_id": record_id,
        "feedback": verdict,
    });

    let resp = client.post(&url).json(&body).send()?;

    if resp.status().is_success() {
        println!("Thank you for your feedback!");
    } else {
        let status = resp.status();
        let body: serde_json::Value = resp.json().unwrap_or_default();
        eprintln!(
            "encore-cli: feedback rejected ({}): {}",
            status,
            body["error"].as_str().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }

    Ok(())
}

fn do_history(server: &str) -> anyhow::Result<()> {
    let client = http_client()?;
    let url = format!("{}/history", server);
    let body: serde_json::Value = client.get(&url).send()?.json()?;

    let records = body["records"].as_array().cloned().unwrap_or_default();
    if records.is_empty() {
        println!("No query history.");
        return Ok(());
    }

    for r in &records {
        println!(
            "#{} [{}] {}",
            r["id"],
            r["feedback"].as_str().unwrap_or("-"),
            r["query"].as_str().unwrap_or("?")
        );
    }
    Ok(())
}

fn do_workflow(server: &str) -> anyhow::Result<()> {
    let client = http_client()?;
    let url = format!("{}/workflow", server);
    let body: serde_json::Value = client.get(&url).send()?.json()?;

    let steps = body["steps"].as_array().cloned().unwrap_or_default();
    if steps.is_empty() {
        println!("No workflow steps recorded.");
        return Ok(());
    }

    for s in &steps {
        println!(
            "#{} {} ({})",
            s["id"],
            s["step"].as_str().unwrap_or("?"),
            s["user_id"].as_str().unwrap_or("?")
        );
    }
    Ok(())
}

fn do_clear_history(server: &str) -> anyhow::Result<()> {
    let client = http_client()?;
    let url = format!("{}/history", server);
    let resp = client.delete(&url).send()?;

    if resp.status().is_success() {
        println!("Query history cleared.");
    } else {
        eprintln!("encore-cli: clear failed (HTTP {})", resp.status());
        std::process::exit(1);
    }
    Ok(())
}

fn do_status(server: &str) -> anyhow::Result<()> {
    let client = http_client()?;
    let url = format!("{}/health", server);

    match client.get(&url).send() {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Encore server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:       {}", body["version"].as_str().unwrap_or("?"));
            println!("SQLite:        {}", body["sqlite"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            eprintln!("encore-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("encore-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Query { text, user, json } => do_query(&server, &text, user, json),
        Commands::Feedback { record_id, verdict } => do_feedback(&server, record_id, &verdict),
        Commands::History => do_history(&server),
        Commands::Workflow => do_workflow(&server),
        Commands::ClearHistory => do_clear_history(&server),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("encore-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
