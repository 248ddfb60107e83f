//! Engine-wide configuration

use std::path::Path;
use chrono::{NaiveDate, Utc};
use serde::{Serialize, Deserialize};

use super::undefined_tokens::UndefinedTokens;
use crate::DataError;

/// Default number of records requested per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Color given to categories that no legend entry covers
pub const NEUTRAL_COLOR: &str = "#777777";

/// Configuration for the exhibit engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Records requested per loader round trip
    pub chunk_size: usize,

    /// Color for computed categories outside every legend entry
    pub neutral_color: String,

    /// Date used to resolve open ("ongoing") ranges; the current UTC date
    /// when unset
    pub today: Option<NaiveDate>,

    /// Raw values that mean "undefined"
    pub undefined: UndefinedTokens,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            neutral_color: NEUTRAL_COLOR.to_string(),
            today: None,
            undefined: UndefinedTokens::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON; missing fields keep their defaults
    pub fn from_json_str(text: &str) -> Result<Self, DataError> {
        let mut config: EngineConfig = serde_json::from_str(text)?;
        if config.chunk_size == 0 {
            tracing::warn!("Chunk size of 0 replaced by {}", DEFAULT_CHUNK_SIZE);
            config.chunk_size = DEFAULT_CHUNK_SIZE;
        }
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Pin the date used for open ranges
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Date used for open ranges
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}
