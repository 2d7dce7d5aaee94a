//! Domain error types

use thiserror::Error;

/// Domain-level errors
///
/// These are configuration errors: they are raised when an agent or a policy
/// is created or mutated with invalid values, and are never silently
/// corrected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid signal weights: {0}")]
    InvalidWeights(String),

    #[error("Unknown archetype: {0}")]
    UnknownArchetype(String),

    #[error("Invalid consensus policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid strategy limits: {0}")]
    InvalidLimits(String),

    #[error("Invalid agent config: {0}")]
    InvalidAgentConfig(String),
}

impl DomainError {
    /// Check if this error concerns an agent's own settings (as opposed to a
    /// fleet-wide policy)
    pub fn is_agent_config(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidWeights(_)
                | DomainError::UnknownArchetype(_)
                | DomainError::InvalidLimits(_)
                | DomainError::InvalidAgentConfig(_)
        )
    }

    /// Every domain error is a configuration error
    pub fn is_configuration(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_archetype_display() {
        let error = DomainError::UnknownArchetype("yolo".to_string());
        assert_eq!(error.to_string(), "Unknown archetype: yolo");
    }

    #[test]
    fn test_is_configuration() {
        assert!(DomainError::InvalidWeights("nan".to_string()).is_configuration());
        assert!(DomainError::UnknownArchetype("x".to_string()).is_configuration());
        assert!(DomainError::InvalidPolicy("x".to_string()).is_configuration());
        assert!(!DomainError::InvalidPolicy("x".to_string()).is_agent_config());
    }
}
