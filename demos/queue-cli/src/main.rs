//! Command line client for an EAS queue.
//!
//! Enqueue a message and watch the queue from another terminal:
//!   eas-queue --endpoint http://localhost:8080 --queue jobs put "hello" --tag shard=a
//!   eas-queue --endpoint http://localhost:8080 --queue jobs watch --window 10 --auto-commit
//!
//! Connection settings can also come from a TOML file (`--config`), see
//! `QueueConfig` for the keys. Flags override file values.

use anyhow::Context;
use clap::{Parser, Subcommand};
use eas_queue_client::{QueueClient, QueueConfig, WatchMode};
use eas_queue_core::{NegativeCode, Priority, QueueUser, Tags};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eas-queue", about = "EAS queue service client")]
struct Cli {
    /// TOML file with connection settings.
    #[arg(long, env = "EAS_QUEUE_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "EAS_QUEUE_ENDPOINT")]
    endpoint: Option<String>,
    #[arg(long, env = "EAS_QUEUE_NAME")]
    queue: Option<String>,
    #[arg(long, env = "EAS_QUEUE_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// User as `uid[:gid]`.
    #[arg(long, env = "EAS_QUEUE_USER")]
    user: Option<QueueUser>,
    /// Watch over a streaming HTTP response instead of a WebSocket.
    #[arg(long)]
    pull: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enqueue one message.
    Put {
        data: String,
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,
        #[arg(long, default_value_t = 0)]
        priority: u32,
    },
    /// Read frames without watching.
    Get {
        #[arg(long, default_value_t = 0)]
        index: u64,
        #[arg(long, default_value_t = 1)]
        length: usize,
    },
    /// Stream frames until interrupted.
    Watch {
        #[arg(long, default_value_t = 0)]
        index: u64,
        #[arg(long, default_value_t = 10)]
        window: u64,
        #[arg(long)]
        index_only: bool,
        #[arg(long)]
        auto_commit: bool,
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,
    },
    Commit { indexes: Vec<u64> },
    /// Reject frames with a result code.
    Nack {
        #[arg(long)]
        code: u32,
        #[arg(long)]
        reason: String,
        indexes: Vec<u64>,
    },
    Delete { indexes: Vec<u64> },
    Truncate { index: u64 },
    End {
        #[arg(long)]
        force: bool,
    },
    /// Print the server attributes.
    Attrs,
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got: {s}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("eas_queue_client=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let client = QueueClient::new(config(&cli)?)?;

    match cli.command {
        Command::Put { data, tags, priority } => {
            let tags: Tags = tags.into_iter().collect();
            let (index, request_id) = client
                .put_with_priority(data, &tags, Priority(priority))
                .await?;
            println!("index={index} request_id={request_id}");
        }
        Command::Get { index, length } => {
            let frames = client
                .get(index, length, std::time::Duration::ZERO, false, &Tags::new())
                .await?;
            for frame in frames {
                print_frame(&frame);
            }
        }
        Command::Watch {
            index,
            window,
            index_only,
            auto_commit,
            tags,
        } => {
            let tags: Tags = tags.into_iter().collect();
            let mut watcher = client
                .watch_by_tag(index, window, index_only, auto_commit, &tags)
                .await?;
            tracing::info!("watching {} ({:?})", client.base_url(), watcher.mode());
            loop {
                tokio::select! {
                    frame = watcher.recv() => match frame {
                        Some(frame) => print_frame(&frame),
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("interrupted, closing watcher");
                        watcher.close();
                    }
                }
            }
        }
        Command::Commit { indexes } => client.commit(&indexes).await?,
        Command::Nack {
            code,
            reason,
            indexes,
        } => client.negative(NegativeCode(code), &reason, &indexes).await?,
        Command::Delete { indexes } => client.delete(&indexes).await?,
        Command::Truncate { index } => client.truncate(index).await?,
        Command::End { force } => client.end(force).await?,
        Command::Attrs => println!("{}", client.attributes().await?),
    }

    Ok(())
}

fn config(cli: &Cli) -> anyhow::Result<QueueConfig> {
    let mut config = match &cli.config {
        Some(path) => QueueConfig::from_file(path)?,
        None => {
            let endpoint = cli.endpoint.clone().context("--endpoint is required")?;
            let queue = cli.queue.clone().context("--queue is required")?;
            QueueConfig::new(endpoint, queue)
        }
    };
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(queue) = &cli.queue {
        config.queue_name = queue.clone();
    }
    if let Some(token) = &cli.token {
        config.token = Some(token.clone());
    }
    if let Some(user) = &cli.user {
        config.user_id = Some(user.uid().to_string());
        config.group_id = Some(user.gid().to_string());
    }
    if cli.pull {
        config.watch_mode = WatchMode::Pull;
    }
    Ok(config)
}

fn print_frame(frame: &eas_queue_core::Frame) {
    if let Some(message) = &frame.message {
        tracing::warn!("{}", message);
        return;
    }
    let index = frame.index.map(|i| i.to_string()).unwrap_or_default();
    let data = frame
        .data
        .as_deref()
        .map(String::from_utf8_lossy)
        .unwrap_or_default();
    match &frame.tags {
        Some(tags) if !tags.is_empty() => {
            let tags: Vec<String> = tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
            println!("{index}\t{data}\t{}", tags.join(","));
        }
        _ => println!("{index}\t{data}"),
    }
}
