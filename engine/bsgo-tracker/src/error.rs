//! Error types for the BSGO tracker

use thiserror::Error;

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Failed to fetch stats from {source_url}: {message}")]
    Fetch { source_url: String, message: String },

    #[error("Webhook publish failed: {message}")]
    Publish { message: String },

    #[error("Message state store error: {message}")]
    StateStore { message: String },

    #[error("History store error: {message}")]
    History { message: String },

    #[error("Chart rendering error: {message}")]
    Chart { message: String },
}

impl TrackerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn fetch(source_url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch { source_url: source_url.into(), message: message.into() }
    }

    pub fn publish(message: impl Into<String>) -> Self {
        Self::Publish { message: message.into() }
    }

    pub fn state_store(message: impl Into<String>) -> Self {
        Self::StateStore { message: message.into() }
    }

    pub fn history(message: impl Into<String>) -> Self {
        Self::History { message: message.into() }
    }

    pub fn chart(message: impl Into<String>) -> Self {
        Self::Chart { message: message.into() }
    }

    /// Only configuration errors stop the service; everything else is per destination
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}
