// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Response types for the shell endpoints

use serde::{Deserialize, Serialize};

use crate::shell::ShellView;

/// Model readiness as shown by the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub name: String,
    pub loaded: bool,
    pub warmed_up: bool,
}

/// GET /api/session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionViewResponse {
    #[serde(flatten)]
    pub view: ShellView,
    pub model: ModelStatus,
}
