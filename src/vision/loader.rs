// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Lazy, process-wide caption model holder
//!
//! The first `get()` runs the factory; concurrent callers wait on the same
//! initialization. A failed load leaves the holder empty so a later call can
//! try again.

use anyhow::{Context, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{error, info};

use super::captioner::Captioner;
use super::vitgpt2::VitGpt2Model;
use crate::config::CaptionConfig;
use crate::models::ModelSource;

type CaptionerFuture = Pin<Box<dyn Future<Output = Result<Arc<dyn Captioner>>> + Send>>;
type CaptionerFactory = Box<dyn Fn() -> CaptionerFuture + Send + Sync>;

pub struct ModelLoader {
    model_name: String,
    factory: CaptionerFactory,
    captioner: OnceCell<Arc<dyn Captioner>>,
}

impl std::fmt::Debug for ModelLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelLoader")
            .field("model_name", &self.model_name)
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

impl ModelLoader {
    /// Loader for the ViT-GPT2 ONNX model described by `config`
    pub fn from_config(config: &CaptionConfig) -> Self {
        let source = ModelSource::from_config(config);
        let intra_threads = config.intra_threads;

        Self::with_factory(source.describe(), move || {
            let source = source.clone();
            async move {
                let model = tokio::task::spawn_blocking(move || {
                    let artifacts = source.resolve()?;
                    VitGpt2Model::load(&artifacts, intra_threads)
                })
                .await
                .context("model load task failed")??;
                Ok(Arc::new(model) as Arc<dyn Captioner>)
            }
        })
    }

    /// Loader backed by an arbitrary async factory
    pub fn with_factory<F, Fut>(model_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn Captioner>>> + Send + 'static,
    {
        Self {
            model_name: model_name.into(),
            factory: Box::new(move || Box::pin(factory())),
            captioner: OnceCell::new(),
        }
    }

    /// Loader whose model is already in memory
    pub fn preloaded(model_name: impl Into<String>, captioner: Arc<dyn Captioner>) -> Self {
        let held = captioner.clone();
        let loader = Self::with_factory(model_name, move || {
            let captioner = held.clone();
            async move { Ok(captioner) }
        });
        // set() only fails on an initialized cell; this one is new
        let _ = loader.captioner.set(captioner);
        loader
    }

    /// Return the shared captioner, loading it on first use
    pub async fn get(&self) -> Result<Arc<dyn Captioner>> {
        let captioner = self
            .captioner
            .get_or_try_init(|| async {
                info!("Loading caption model {}", self.model_name);
                let start = Instant::now();
                match (self.factory)().await {
                    Ok(captioner) => {
                        info!(
                            "✅ Caption model {} loaded in {:?}",
                            self.model_name,
                            start.elapsed()
                        );
                        Ok(captioner)
                    }
                    Err(e) => {
                        error!("Failed to load caption model {}: {:#}", self.model_name, e);
                        Err(e)
                    }
                }
            })
            .await?;
        Ok(Arc::clone(captioner))
    }

    pub fn is_loaded(&self) -> bool {
        self.captioner.initialized()
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}
