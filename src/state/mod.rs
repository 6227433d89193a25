mod answers;
mod player;
mod session;

pub use answers::{EvaluationSummary, TextResult};

use crate::answer::AnswerMatcher;
use crate::broadcast::Broadcaster;
use crate::config::AppConfig;
use crate::session::GameSession;
use crate::store::ContentStore;
use crate::types::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: ContentStore,
    pub matcher: AnswerMatcher,
    pub players: Arc<RwLock<HashMap<PlayerId, Player>>>,
    /// The running (or last finished) mini-game
    pub session: Arc<RwLock<Option<GameSession>>>,
    pub broadcaster: Broadcaster,
    pub connections: Arc<RwLock<ConnectionCounts>>,
    /// Where content edits are saved; `None` keeps them in memory only
    content_path: Option<PathBuf>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), ContentStore::new())
    }

    pub fn with_config(config: AppConfig, store: ContentStore) -> Self {
        let matcher = config.matcher();
        Self {
            config,
            store,
            matcher,
            players: Arc::new(RwLock::new(HashMap::new())),
            session: Arc::new(RwLock::new(None)),
            broadcaster: Broadcaster::new(),
            connections: Arc::new(RwLock::new(ConnectionCounts::default())),
            content_path: None,
        }
    }

    /// Save content edits to the configured content file
    pub fn with_persistence(mut self) -> Self {
        self.content_path = Some(self.config.content_path.clone());
        self
    }

    /// Write the content store to disk, if persistence is enabled
    pub async fn persist_content(&self) -> Result<(), crate::error::StoreError> {
        let Some(path) = &self.content_path else {
            return Ok(());
        };
        self.store.save_to_path(path).await?;
        tracing::debug!("Content saved to {}", path.display());
        Ok(())
    }

    pub async fn connection_opened(&self, role: &Role) {
        let mut counts = self.connections.write().await;
        match role {
            Role::Admin => counts.admins += 1,
            Role::Display => counts.displays += 1,
            Role::Player => counts.players += 1,
        }
    }

    pub async fn connection_closed(&self, role: &Role) {
        let mut counts = self.connections.write().await;
        let slot = match role {
            Role::Admin => &mut counts.admins,
            Role::Display => &mut counts.displays,
            Role::Player => &mut counts.players,
        };
        *slot = slot.saturating_sub(1);
    }

    pub async fn connection_counts(&self) -> ConnectionCounts {
        self.connections.read().await.clone()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
