pub mod assign;
mod game;
pub mod registry;
pub mod scheduler;
pub mod score;
pub mod session;

use crate::prompts::{PromptRepository, StaticPromptRepository};
use crate::types::*;
use session::SessionHandle;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Active rooms by code
    pub sessions: Arc<RwLock<HashMap<RoomCode, SessionHandle>>>,
    /// Connections currently attached to each room
    pub members: Arc<RwLock<HashMap<RoomCode, HashSet<ConnectionId>>>>,
    pub prompts: Arc<dyn PromptRepository>,
    pub config: GameConfig,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(GameConfig::default())
    }

    pub fn with_config(config: GameConfig) -> Self {
        Self::with_prompts(Arc::new(StaticPromptRepository::builtin()), config)
    }

    pub fn with_prompts(prompts: Arc<dyn PromptRepository>, config: GameConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            members: Arc::new(RwLock::new(HashMap::new())),
            prompts,
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
