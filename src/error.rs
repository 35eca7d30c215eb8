use thiserror::Error;

/// Main error type for the decision engine
#[derive(Error, Debug)]
pub enum EdgeError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown timeframe: {0} (expected one of M15, H1, H4, D1)")]
    UnknownTimeframe(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EdgeError {
    /// True for errors caused by caller input rather than the environment.
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            EdgeError::InvalidConfig(_) | EdgeError::UnknownTimeframe(_)
        )
    }
}

/// Result type alias for EdgeError
pub type Result<T> = std::result::Result<T, EdgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_input_classification() {
        assert!(EdgeError::UnknownTimeframe("M1".into()).is_rejected_input());
        assert!(EdgeError::InvalidConfig("alpha".into()).is_rejected_input());
        assert!(!EdgeError::Internal("x".into()).is_rejected_input());
    }

    #[test]
    fn unknown_timeframe_message_lists_vocabulary() {
        let msg = EdgeError::UnknownTimeframe("W1".into()).to_string();
        assert!(msg.contains("W1"));
        assert!(msg.contains("M15, H1, H4, D1"));
    }
}
