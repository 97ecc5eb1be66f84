// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Browser sessions: each one holds its own image and caption

pub mod state;
pub mod store;

pub use state::{ImageOrigin, SelectedImage, SessionState, ShellPhase};
pub use store::{SessionError, SessionHandle, SessionStore};
