// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod models;
pub mod session;
pub mod shell;
pub mod speech;
pub mod version;
pub mod vision;

pub use config::AppConfig;
pub use session::{SessionState, SessionStore, ShellPhase};
pub use shell::{ImageSource, ListenOutcome, Shell, ShellEvent, ShellView};
pub use speech::{AudioClip, AudioFormat, SpeechError, SpeechSynthesizer};
pub use vision::{CaptionError, CaptionPipeline, Captioner, ModelLoader};
