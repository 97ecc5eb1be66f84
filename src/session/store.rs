// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::state::SessionState;

/// Shared handle to one session's state
pub type SessionHandle = Arc<Mutex<SessionState>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("maximum number of sessions ({0}) reached")]
    StoreFull(usize),
}

#[derive(Debug)]
struct SessionEntry {
    state: SessionHandle,
    last_seen: Instant,
}

/// In-memory store of browser sessions keyed by an opaque id
#[derive(Debug)]
pub struct SessionStore {
    max_sessions: usize,
    ttl: Duration,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    pub fn new(max_sessions: usize, ttl: Duration) -> Self {
        Self {
            max_sessions,
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Look up `session_id`, or start a fresh session
    ///
    /// Unknown or expired ids are not adopted; a new id is generated and
    /// returned alongside the handle.
    pub async fn get_or_create(
        &self,
        session_id: Option<&str>,
    ) -> Result<(String, SessionHandle), SessionError> {
        let mut sessions = self.sessions.write().await;

        if let Some(id) = session_id {
            if let Some(entry) = sessions.get_mut(id) {
                if entry.last_seen.elapsed() < self.ttl {
                    entry.last_seen = Instant::now();
                    return Ok((id.to_string(), entry.state.clone()));
                }
                debug!("Session {} expired, starting a new one", id);
                sessions.remove(id);
            }
        }

        if sessions.len() >= self.max_sessions {
            return Err(SessionError::StoreFull(self.max_sessions));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let state: SessionHandle = Arc::new(Mutex::new(SessionState::new()));
        sessions.insert(
            id.clone(),
            SessionEntry {
                state: state.clone(),
                last_seen: Instant::now(),
            },
        );
        debug!("Created session {} ({} active)", id, sessions.len());
        Ok((id, state))
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than the TTL, returning how many went
    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let initial_count = sessions.len();

        sessions.retain(|_, entry| entry.last_seen.elapsed() < self.ttl);

        let removed = initial_count - sessions.len();
        if removed > 0 {
            info!("Expired {} idle session(s), {} remaining", removed, sessions.len());
        }
        removed
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
