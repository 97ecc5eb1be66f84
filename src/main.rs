// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use caption_speech_node::{
    api::{start_server, AppState},
    config::AppConfig,
    version,
};
use clap::Parser;
use std::{env, path::PathBuf};
use tracing::info;

/// Image captioning with text-to-speech over HTTP
#[derive(Parser, Debug)]
#[command(name = "caption-speech-node", version = version::VERSION_NUMBER)]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "CAPTION_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config and API_LISTEN_ADDR)
    #[arg(long)]
    listen: Option<String>,

    /// Load the model and run the warm-up before serving
    #[arg(long)]
    warmup_on_start: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    info!("🚀 Starting {}", version::get_version_string());
    info!("📦 BUILD VERSION: {}", version::VERSION);

    let mut config = match &args.config {
        Some(path) => {
            let mut config = AppConfig::from_file(path)?;
            config.apply_env();
            config
        }
        None => AppConfig::from_env(),
    };
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    if args.warmup_on_start {
        config.server.warmup_on_start = true;
    }
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    info!(
        "Caption model: {} (max {} new tokens), TTS language: {}",
        config
            .caption
            .model_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| config.caption.model_repo.clone()),
        config.caption.max_new_tokens,
        config.speech.lang
    );

    let warmup_on_start = config.server.warmup_on_start;
    let state = AppState::from_config(config)?;

    if warmup_on_start {
        info!("Warming up caption model before serving");
        state.shell.warm_up().await;
    }

    start_server(state).await
}
