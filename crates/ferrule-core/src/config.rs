//! Endpoint configuration.
//!
//! JSON から読み込めます。省略したフィールドは `Default` の値になります。

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::Category;

/// Default limit for a single inbound text message, in bytes.
pub const DEFAULT_MAX_TEXT_MESSAGE_SIZE: usize = 64 * 1024;

/// Default limit for a single inbound binary message, in bytes.
pub const DEFAULT_MAX_BINARY_MESSAGE_SIZE: usize = 1024 * 1024;

/// Per-endpoint settings for a session and its handler registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Path the endpoint is served under (e.g. `/websockets/tests/hello`).
    pub path: String,
    /// Categories that must have a handler once the endpoint is built.
    pub expected_categories: Vec<Category>,
    /// Largest text payload (or fragment) delivered to a handler.
    pub max_text_message_size: usize,
    /// Largest binary payload (or fragment) delivered to a handler.
    pub max_binary_message_size: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            expected_categories: Vec::new(),
            max_text_message_size: DEFAULT_MAX_TEXT_MESSAGE_SIZE,
            max_binary_message_size: DEFAULT_MAX_BINARY_MESSAGE_SIZE,
        }
    }
}

/// ConfigError は設定の読み込みエラー
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid endpoint config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("endpoint path must start with '/', got {0:?}")]
    InvalidPath(String),
}

impl EndpointConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.path.starts_with('/') {
            return Err(ConfigError::InvalidPath(self.path.clone()));
        }
        Ok(())
    }

    pub fn max_message_size(&self, category: Category) -> Option<usize> {
        match category {
            Category::Text => Some(self.max_text_message_size),
            Category::Binary => Some(self.max_binary_message_size),
            // 制御フレームは transport 側で 125 bytes に制限済み
            Category::Pong => None,
        }
    }
}
