//! jobsync CLI - command-line control of the jobsync daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9527";

#[derive(Parser)]
#[command(name = "jobsync")]
#[command(about = "jobsync pipeline CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "JOBSYNC_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scrape across every configured source now
    Scrape,

    /// Expire and purge stale auto-posted listings now
    Cleanup,

    /// Recompute expiring-soon / closed statuses now
    UpdateStatus,

    /// Prune old error log entries now
    TrimErrors,

    /// Show scheduler state and next runs
    Status,

    /// Show run counters, last scrape and recent errors
    Stats,

    /// Run a health check
    Health,

    /// Restart the cron scheduler
    Restart,
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

/// Response envelope shared by every method
#[derive(Deserialize)]
struct Envelope {
    success: bool,
    message: Option<String>,
    data: Option<Value>,
    error: Option<String>,
    duration_ms: Option<u64>,
}

#[derive(Tabled)]
struct SourceRow {
    source: String,
    found: u64,
    added: u64,
    errors: u64,
    skipped: u64,
}

#[derive(Tabled)]
struct TaskRow {
    task: String,
    schedule: String,
    in_flight: String,
    next_run: String,
}

#[derive(Tabled)]
struct ErrorRow {
    time: String,
    task: String,
    source: String,
    message: String,
}

async fn call_rpc(url: &str, method: &str) -> Result<Envelope> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params: json!([]),
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    let result = response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))?;
    serde_json::from_value(result).context("Unexpected response shape")
}

fn format_time(millis: Option<i64>) -> String {
    millis
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn count(value: &Value) -> u64 {
    value.as_u64().unwrap_or(0)
}

/// One-line verdict shared by all task triggers
fn print_outcome(envelope: &Envelope) {
    let message = envelope.message.as_deref().unwrap_or("");
    let duration = envelope
        .duration_ms
        .map(|ms| format!(" ({} ms)", ms))
        .unwrap_or_default();

    if envelope.success {
        println!("{} {}{}", "✓".green().bold(), message, duration);
    } else {
        println!("{} {}{}", "✗".red().bold(), message.red(), duration);
    }
    if let Some(error) = &envelope.error {
        println!("  {} {}", "Error:".bold(), error);
    }
}

fn print_source_table(run: &Value) {
    let Some(per_source) = run["per_source"].as_object() else {
        return;
    };
    let rows: Vec<SourceRow> = per_source
        .iter()
        .map(|(source, stats)| SourceRow {
            source: source.clone(),
            found: count(&stats["found"]),
            added: count(&stats["added"]),
            errors: count(&stats["errors"]),
            skipped: count(&stats["skipped"]),
        })
        .collect();
    if !rows.is_empty() {
        println!("{}", Table::new(rows));
    }
    if let Some(errors) = run["errors"].as_array() {
        for failure in errors {
            println!(
                "  {} {}: {}",
                "•".red(),
                failure["source"].as_str().unwrap_or("?"),
                failure["error"].as_str().unwrap_or("")
            );
        }
    }
}

fn print_status(data: &Value) {
    let running = data["running"].as_bool().unwrap_or(false);
    println!("{}", "Scheduler Status".cyan().bold());
    println!();
    println!(
        "  {} {}",
        "Cron:".bold(),
        if running {
            "RUNNING".green()
        } else {
            "STOPPED".yellow()
        }
    );
    println!();

    let rows: Vec<TaskRow> = data["tasks"]
        .as_array()
        .map(|tasks| {
            tasks
                .iter()
                .map(|t| TaskRow {
                    task: t["task"].as_str().unwrap_or("?").to_string(),
                    schedule: t["schedule"].as_str().unwrap_or("").to_string(),
                    in_flight: if t["in_flight"].as_bool().unwrap_or(false) {
                        "yes".to_string()
                    } else {
                        "no".to_string()
                    },
                    next_run: if t["scheduled"].as_bool().unwrap_or(true) {
                        format_time(t["next_run"].as_i64())
                    } else {
                        "not scheduled".to_string()
                    },
                })
                .collect()
        })
        .unwrap_or_default();
    println!("{}", Table::new(rows));
}

fn print_stats(data: &Value) {
    let counters = &data["counters"];
    println!("{}", "Pipeline Statistics".cyan().bold());
    println!();
    println!("  {} {}", "Scrape runs:".bold(), counters["scrape_runs"]);
    println!("  {} {}", "Cleanup runs:".bold(), counters["cleanup_runs"]);
    println!(
        "  {} {}",
        "Status updates:".bold(),
        counters["status_update_runs"]
    );
    println!("  {} {}", "Health checks:".bold(), counters["health_checks"]);
    println!("  {} {}", "Error trims:".bold(), counters["error_trims"]);
    println!("  {} {}", "Error log size:".bold(), data["error_log_size"]);

    if let Some(postings) = data["postings"].as_object() {
        let summary: Vec<String> = postings
            .iter()
            .map(|(status, count)| format!("{}={}", status, count))
            .collect();
        println!("  {} {}", "Postings:".bold(), summary.join(" "));
    }

    if data["last_scrape"].is_object() {
        let run = &data["last_scrape"];
        println!();
        println!(
            "{} {} (found {}, added {})",
            "Last scrape:".bold(),
            format_time(run["finished_at"].as_i64()),
            run["total_found"],
            run["total_added"]
        );
        print_source_table(run);
    }

    let rows: Vec<ErrorRow> = data["recent_errors"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|e| ErrorRow {
                    time: format_time(e["timestamp"].as_i64()),
                    task: e["task"].as_str().unwrap_or("?").to_string(),
                    source: e["source"].as_str().unwrap_or("-").to_string(),
                    message: e["message"].as_str().unwrap_or("").to_string(),
                })
                .collect()
        })
        .unwrap_or_default();
    println!();
    if rows.is_empty() {
        println!("{}", "No recent errors".green());
    } else {
        println!("{}", "Recent errors".yellow().bold());
        println!("{}", Table::new(rows));
    }
}

fn print_health(data: &Value) {
    let flag = |ok: bool| if ok { "OK".green() } else { "FAIL".red() };
    println!(
        "  {} {}",
        "Network:".bold(),
        flag(data["network_ok"].as_bool().unwrap_or(false))
    );
    println!(
        "  {} {}",
        "Store:".bold(),
        flag(data["store_ok"].as_bool().unwrap_or(false))
    );
    if data["stats"].is_object() {
        println!(
            "  {} {}",
            "Active postings:".bold(),
            data["stats"]["active_postings"]
        );
        println!("  {} {}", "Added today:".bold(), data["stats"]["added_today"]);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli.command, &cli.rpc_url).await
}

async fn run(command: Commands, url: &str) -> Result<()> {
    match command {
        Commands::Scrape => {
            println!("{}", "Scraping all sources...".cyan().bold());
            let envelope = call_rpc(url, "pipeline.scrape.v1").await?;
            print_outcome(&envelope);
            if let Some(run) = &envelope.data {
                print_source_table(run);
            }
        }

        Commands::Cleanup => {
            let envelope = call_rpc(url, "pipeline.cleanup.v1").await?;
            print_outcome(&envelope);
        }

        Commands::UpdateStatus => {
            let envelope = call_rpc(url, "pipeline.status_update.v1").await?;
            print_outcome(&envelope);
        }

        Commands::TrimErrors => {
            let envelope = call_rpc(url, "pipeline.error_trim.v1").await?;
            print_outcome(&envelope);
        }

        Commands::Status => match call_rpc(url, "scheduler.status.v1").await {
            Ok(envelope) => {
                println!("  {} {}", "RPC URL:".bold(), url);
                println!("  {} {}", "Daemon:".bold(), "ONLINE".green());
                println!();
                if let Some(data) = &envelope.data {
                    print_status(data);
                }
            }
            Err(e) => {
                println!("  {} {}", "RPC URL:".bold(), url);
                println!("  {} {}", "Daemon:".bold(), "ERROR".red());
                return Err(e);
            }
        },

        Commands::Stats => {
            let envelope = call_rpc(url, "scheduler.statistics.v1").await?;
            if let Some(data) = &envelope.data {
                print_stats(data);
            }
        }

        Commands::Health => {
            println!("{}", "Health Check".cyan().bold());
            let envelope = call_rpc(url, "system.health.v1").await?;
            print_outcome(&envelope);
            if let Some(data) = &envelope.data {
                print_health(data);
            }
        }

        Commands::Restart => {
            let envelope = call_rpc(url, "scheduler.restart.v1").await?;
            print_outcome(&envelope);
        }
    }

    Ok(())
}
