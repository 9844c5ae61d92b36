//! Deadletter CLI - queue HTTP requests, execute them, inspect dead-letter queues

mod logging;
mod settings;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use deadletter_core::application::{PassReport, QueueManager};
use deadletter_core::domain::{Message, ParamValue, PostParams};
use deadletter_core::port::Removal;
use deadletter_infra_http::ReqwestTransport;
use deadletter_infra_redis::RedisStore;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::debug;

#[derive(Parser)]
#[command(name = "deadletter")]
#[command(about = "HTTP request queue with per-status dead-letter queues", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(long, env = "DEADLETTER_CONFIG")]
    config: Option<PathBuf>,
}

/// Queue selection shared by list/delete/clear
#[derive(Args, Debug, Default)]
#[group(multiple = false)]
struct QueueTarget {
    /// Explicit queue key
    #[arg(long)]
    queue: Option<String>,

    /// Every configured dead-letter queue
    #[arg(long)]
    dead: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue a new HTTP request
    Add {
        /// Target URL
        #[arg(long)]
        url: String,

        /// Unique message name (default: random UUID)
        #[arg(long)]
        name: Option<String>,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Form parameter KEY=VALUE (repeatable)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Header NAME:VALUE (repeatable)
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },

    /// Execute every message currently in the request queue
    Execute,

    /// Retry every message in the dead-letter queues
    ExecuteDead,

    /// List queue contents (request queue by default)
    List {
        #[command(flatten)]
        target: QueueTarget,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Delete a message by name (request queue by default)
    Delete {
        name: String,

        #[command(flatten)]
        target: QueueTarget,
    },

    /// Clear a queue (request queue by default)
    Clear {
        #[command(flatten)]
        target: QueueTarget,
    },

    /// Show the recorded response body of an executed message
    Response {
        /// Message name (or url+method for unnamed messages)
        key: String,
    },

    /// Show queue lengths
    Stats {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Tabled)]
struct MessageRow {
    queue: String,
    name: String,
    method: String,
    url: String,
    params: usize,
}

#[derive(Tabled)]
struct PassRow {
    queue: String,
    processed: usize,
    completed: usize,
    dead_lettered: usize,
    transport_failures: usize,
    undecodable: usize,
}

impl From<&PassReport> for PassRow {
    fn from(report: &PassReport) -> Self {
        Self {
            queue: report.queue.clone(),
            processed: report.processed(),
            completed: report.completed(),
            dead_lettered: report.dead_lettered(),
            transport_failures: report.transport_failures(),
            undecodable: report.undecodable(),
        }
    }
}

fn parse_param(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))
}

fn parse_header(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected NAME:VALUE, got '{}'", s))
}

/// Repeated keys become list values, in the order given
fn collect_params(pairs: Vec<(String, String)>) -> PostParams {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (k, v) in pairs {
        grouped.entry(k).or_default().push(v);
    }
    grouped
        .into_iter()
        .map(|(k, mut vs)| {
            let value = if vs.len() == 1 {
                ParamValue::Single(vs.remove(0))
            } else {
                ParamValue::Many(vs)
            };
            (k, value)
        })
        .collect()
}

fn build_message(
    url: String,
    name: Option<String>,
    method: String,
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
) -> Message {
    let name = name.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut message = Message::new(name, url, method);
    message.post_params = collect_params(params);
    for (k, v) in headers {
        message = message.with_header(k, v);
    }
    message
}

fn target_keys(manager: &QueueManager, target: &QueueTarget) -> Vec<String> {
    match (&target.queue, target.dead) {
        (Some(key), _) => vec![key.clone()],
        (None, true) => manager.dead_queue_keys(),
        (None, false) => vec![manager.request_key().to_string()],
    }
}

fn print_reports(reports: &[PassReport]) {
    if reports.iter().all(PassReport::is_empty) {
        println!("{}", "Nothing to execute".yellow());
        return;
    }
    let rows: Vec<PassRow> = reports.iter().map(PassRow::from).collect();
    println!("{}", Table::new(rows));
}

async fn run(manager: &QueueManager, command: Commands) -> Result<()> {
    match command {
        Commands::Add {
            url,
            name,
            method,
            params,
            headers,
        } => {
            let message = build_message(url, name, method, params, headers);
            manager.add_message(&message).await?;
            println!(
                "{}",
                format!("✓ Queued '{}' on {}", message.name, manager.request_key())
                    .green()
                    .bold()
            );
        }

        Commands::Execute => {
            let report = manager.execute_queue().await?;
            print_reports(&[report]);
        }

        Commands::ExecuteDead => {
            let reports = manager.execute_dead_queue().await?;
            print_reports(&reports);
        }

        Commands::List { target, json } => {
            let mut listing: BTreeMap<String, Vec<Message>> = BTreeMap::new();
            for key in target_keys(manager, &target) {
                let messages = manager.list_queue(&key).await?;
                listing.insert(key, messages);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                let rows: Vec<MessageRow> = listing
                    .iter()
                    .flat_map(|(queue, messages)| {
                        messages.iter().map(move |m| MessageRow {
                            queue: queue.clone(),
                            name: m.name.clone(),
                            method: m.method.clone(),
                            url: m.url.clone(),
                            params: m.post_params.len(),
                        })
                    })
                    .collect();
                if rows.is_empty() {
                    println!("{}", "No messages".yellow());
                } else {
                    println!("{}", Table::new(rows));
                }
            }
        }

        Commands::Delete { name, target } => {
            let removal = if target.dead && target.queue.is_none() {
                manager.delete_from_dead_queues(&name).await?
            } else {
                let key = target_keys(manager, &target).remove(0);
                manager.delete_message(&key, &name).await?
            };

            match removal {
                Removal::Removed => println!("{}", format!("✓ Deleted '{}'", name).green().bold()),
                Removal::NotFound => println!("{}", format!("'{}' not found", name).yellow()),
            }
        }

        Commands::Clear { target } => {
            for key in target_keys(manager, &target) {
                manager.clear_queue(&key).await?;
                println!("{}", format!("✓ Cleared {}", key).green());
            }
        }

        Commands::Response { key } => match manager.get_response(&key).await? {
            // Raw bytes, exactly as the server sent them
            Some(body) => std::io::stdout().write_all(&body)?,
            None => anyhow::bail!("No response recorded for '{}'", key),
        },

        Commands::Stats { json } => {
            let lengths = manager.queue_lengths().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&lengths)?);
            } else {
                println!("{}", "Queue Status".cyan().bold());
                println!();
                for length in lengths {
                    println!("  {} {}", format!("{}:", length.queue).bold(), length.len);
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Initialize logging
    logging::init()?;

    // 2. Load configuration
    let config = settings::load(cli.config.as_deref())?;
    debug!(queue = %config.queue_key, store = %config.store.address, "Configuration loaded");

    // 3. Setup dependencies (DI wiring)
    let store = Arc::new(
        RedisStore::connect(&config.store)
            .await
            .context("Failed to connect to store")?,
    );
    let transport =
        Arc::new(ReqwestTransport::new(&config.http).context("Failed to build HTTP client")?);
    let manager = QueueManager::new(config, store.clone(), store, transport)?;

    run(&manager, cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_command() {
        let cli = Cli::try_parse_from([
            "deadletter",
            "add",
            "--url",
            "https://api.kite.trade/orders/regular",
            "--name",
            "Place TCS Order",
            "-X",
            "POST",
            "-p",
            "exchange=NSE",
            "-p",
            "quantity=1",
            "-H",
            "x-kite-version: 3",
        ])
        .unwrap();

        let Commands::Add {
            url,
            name,
            method,
            params,
            headers,
        } = cli.command
        else {
            panic!("expected add");
        };
        let msg = build_message(url, name, method, params, headers);
        assert_eq!(msg.name, "Place TCS Order");
        assert_eq!(msg.method, "POST");
        assert_eq!(msg.encoded_params(), "exchange=NSE&quantity=1");
        assert_eq!(msg.headers["x-kite-version"], vec!["3".to_string()]);
    }

    #[test]
    fn test_repeated_params_become_lists() {
        let params = collect_params(vec![
            ("tag".to_string(), "a".to_string()),
            ("q".to_string(), "1".to_string()),
            ("tag".to_string(), "b".to_string()),
        ]);
        assert_eq!(params["q"], ParamValue::Single("1".to_string()));
        assert_eq!(
            params["tag"],
            ParamValue::Many(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_generated_name_when_missing() {
        let msg = build_message("http://x".to_string(), None, "GET".to_string(), vec![], vec![]);
        assert!(uuid::Uuid::parse_str(&msg.name).is_ok());
    }

    #[test]
    fn test_queue_flags_are_exclusive() {
        let result = Cli::try_parse_from(["deadletter", "clear", "--queue", "429", "--dead"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_malformed_pairs() {
        assert!(parse_param("novalue").is_err());
        assert!(parse_header(":value").is_err());
        assert_eq!(
            parse_header("Content-Type: text/plain").unwrap(),
            ("Content-Type".to_string(), "text/plain".to_string())
        );
    }
}
