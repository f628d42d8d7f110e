use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid {entity} transition: {from} does not accept {event}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        event: String,
    },

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionFailed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CoreError::InvalidTransition {
            entity: "session",
            from: "completed".to_string(),
            event: "start".to_string(),
        };
        assert!(error.to_string().contains("completed"));
        assert!(error.to_string().contains("start"));
    }
}
