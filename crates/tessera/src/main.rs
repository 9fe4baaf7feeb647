// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tessera - unified memory engine.
//!
//! Binary entry point: one engine operation per invocation, JSON on stdout.

mod setup;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tessera_core::TesseraError;
use tessera_memory::{MemoryEngine, Metadata, RecallOptions, RememberOptions};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Tessera - durable, contradiction-aware memory for agents.
#[derive(Parser, Debug)]
#[command(name = "tessera", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Record a piece of text.
    Remember {
        text: String,
        /// Attach metadata; values parse as JSON when possible.
        #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
        meta: Vec<(String, Value)>,
    },
    /// Similarity search over stored items.
    Recall {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Keyword search over graph episodes.
    Query {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete one stored item.
    Forget { id: String },
    /// Number of stored items.
    Count,
    /// Health of every configured collaborator.
    Health,
}

fn parse_meta(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty metadata key in `{raw}`"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tessera_config::load_and_validate_path(path),
        None => tessera_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tessera_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    setup::init_tracing(&config.engine.log_level);
    tessera_memory::metrics::register_metrics();

    let engine = match setup::build_engine(&config).await {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("tessera: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = run(&engine, cli.command).await;
    if let Err(e) = engine.close().await {
        warn!(error = %e, "failed to close vector store");
    }

    match outcome.and_then(|value| {
        serde_json::to_string_pretty(&value).map_err(|e| TesseraError::Internal(e.to_string()))
    }) {
        Ok(out) => {
            println!("{out}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("tessera: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(engine: &MemoryEngine, command: Commands) -> Result<Value, TesseraError> {
    let value = match command {
        Commands::Remember { text, meta } => {
            let metadata: Metadata = meta.into_iter().collect();
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_signal.cancel();
                }
            });
            let result = engine
                .remember_with_cancel(&text, Some(metadata), RememberOptions::default(), &cancel)
                .await?;
            to_json(&result)?
        }
        Commands::Recall {
            query,
            top_k,
            threshold,
        } => to_json(&engine.recall(&query, RecallOptions { top_k, threshold }).await?)?,
        Commands::Query { query, limit } => to_json(&engine.query_knowledge(&query, limit).await?)?,
        Commands::Forget { id } => {
            let removed = engine.forget(&id).await?;
            json!({ "id": id, "removed": removed })
        }
        Commands::Count => {
            let count = engine.count().await?;
            json!({ "count": count })
        }
        Commands::Health => {
            let health = engine.health().await;
            let adapters = to_json(&health)?;
            json!({ "healthy": health.is_healthy(), "adapters": adapters })
        }
    };
    Ok(value)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, TesseraError> {
    serde_json::to_value(value).map_err(|e| TesseraError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn remember_collects_metadata() {
        let cli = Cli::try_parse_from([
            "tessera",
            "remember",
            "The timeout is 30 seconds",
            "--meta",
            "source=chat",
            "--meta",
            "turn=3",
        ])
        .unwrap();
        let Commands::Remember { text, meta } = cli.command else {
            panic!("expected remember");
        };
        assert_eq!(text, "The timeout is 30 seconds");
        assert_eq!(meta[0], ("source".to_string(), json!("chat")));
        assert_eq!(meta[1], ("turn".to_string(), json!(3)));
    }

    #[test]
    fn recall_options_parse() {
        let cli =
            Cli::try_parse_from(["tessera", "recall", "timeout", "--top-k", "2", "--threshold", "0.5"])
                .unwrap();
        match cli.command {
            Commands::Recall {
                top_k, threshold, ..
            } => {
                assert_eq!(top_k, Some(2));
                assert_eq!(threshold, Some(0.5));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["tessera", "count", "--config", "/tmp/t.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/t.toml")));
    }

    #[test]
    fn malformed_meta_is_rejected() {
        assert!(parse_meta("novalue").is_err());
        assert!(parse_meta("=x").is_err());
        assert_eq!(parse_meta("k=a=b").unwrap().1, json!("a=b"));
    }
}
