// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Download the caption model artifacts into the local cache
//!
//! Run once at image build time so the first request does not pay for the
//! download.

use anyhow::Result;
use caption_speech_node::{config::AppConfig, models::ModelSource};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bootstrap-models")]
struct Args {
    /// Hub repository (defaults to the configured caption model)
    #[arg(long, env = "CAPTION_MODEL_REPO")]
    repo: Option<String>,

    /// Hub revision
    #[arg(long, env = "CAPTION_MODEL_REVISION")]
    revision: Option<String>,

    /// Cache directory (defaults to the standard Hugging Face cache)
    #[arg(long, env = "HF_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut caption = AppConfig::default().caption;
    if let Some(repo) = args.repo {
        caption.model_repo = repo;
    }
    if let Some(revision) = args.revision {
        caption.revision = revision;
    }
    caption.cache_dir = args.cache_dir;
    // always go through the hub, even if CAPTION_MODEL_DIR is set
    caption.model_dir = None;

    let source = ModelSource::from_config(&caption);
    let artifacts = match source.resolve() {
        Ok(artifacts) => artifacts,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    println!("✅ {} cached", source.describe());
    println!("  encoder:      {}", artifacts.encoder.display());
    println!("  decoder:      {}", artifacts.decoder.display());
    println!("  tokenizer:    {}", artifacts.tokenizer.display());
    println!("  preprocessor: {}", artifacts.preprocessor_config.display());
    if let Some(config) = &artifacts.model_config {
        println!("  config:       {}", config.display());
    }
    Ok(())
}
