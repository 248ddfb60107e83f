//! Engine phase tracking

use std::sync::Arc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Phase of the exhibit engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EngineState {
    /// Schema parsed, nothing requested yet
    #[default]
    Init,
    /// Record chunks are being requested
    Load,
    /// Processing data or handling a command (recompute, fill, sort)
    Process,
    /// Visualizations are building from a new stream
    Build,
    /// Visualizations are updating selections
    Update,
    /// Waiting for user input
    Ready,
}

/// Shared cell holding the current engine phase
#[derive(Debug, Clone, Default)]
pub struct PhaseTracker {
    state: Arc<RwLock<EngineState>>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> EngineState {
        *self.state.read()
    }

    /// Move to a new phase, returning the previous one
    pub fn set(&self, next: EngineState) -> EngineState {
        let mut state = self.state.write();
        let previous = *state;
        if previous != next {
            tracing::debug!("Engine state {:?} -> {:?}", previous, next);
            *state = next;
        }
        previous
    }
}
