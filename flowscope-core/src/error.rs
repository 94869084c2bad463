//! Error types for the Flowscope core library.
//!
//! Simulated failures ("Kafka down", "payment fails") are not errors: they are
//! scripted branches inside scenario steps. The variants below cover genuine
//! faults: a step action that fails or panics, bad configuration, or a lookup
//! for a pattern/scenario that doesn't exist.
//!
//! # Error Codes Reference
//!
//! | Code Range | Category | Description |
//! |------------|----------|-------------|
//! | E1001-E1099 | Playback | Step execution and engine state errors |
//! | E2001-E2099 | Config | Config file, environment and validation errors |
//! | E3001-E3099 | Pattern | Unknown patterns, scenarios and controls |
//! | E9001-E9099 | General | Internal, IO and serialization errors |

use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

/// The main error type for the Flowscope core library.
#[derive(Debug, Error)]
pub enum FlowscopeError {
    // ========================================================================
    // Playback Errors (E1001-E1099)
    // ========================================================================
    /// A navigation command arrived before any scenario was loaded
    #[error("[E1001] No scenario loaded")]
    NoScenarioLoaded,

    /// A step action returned an error
    #[error("[E1002] Step {step} of '{scenario}' failed: {message}")]
    StepFailed {
        scenario: String,
        step: usize,
        message: String,
    },

    /// A step action panicked
    #[error("[E1003] Step {step} of '{scenario}' panicked")]
    StepPanicked { scenario: String, step: usize },

    /// A step action reported a failure of its own
    #[error("[E1004] Step action error: {0}")]
    Action(String),

    // ========================================================================
    // Configuration Errors (E2001-E2099)
    // ========================================================================
    /// Configuration file parse error
    #[error("[E2001] Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// Invalid configuration value
    #[error("[E2002] Invalid configuration value for '{key}': {message}")]
    InvalidConfigValue { key: String, message: String },

    /// Speed multiplier outside the supported range
    #[error("[E2003] Speed multiplier {0} is outside 0.5x-3.0x")]
    InvalidSpeed(f64),

    // ========================================================================
    // Pattern Errors (E3001-E3099)
    // ========================================================================
    /// No pattern with this id or name
    #[error("[E3001] Pattern not found: {0}")]
    PatternNotFound(String),

    /// The pattern has no scenario with this id
    #[error("[E3002] Scenario '{scenario}' not found for pattern '{pattern}'")]
    ScenarioNotFound { pattern: String, scenario: String },

    /// The pattern doesn't expose this control
    #[error("[E3003] Pattern '{pattern}' does not support control '{control}'")]
    UnsupportedControl { pattern: String, control: String },

    /// Control value outside its range
    #[error("[E3004] Invalid control value: {0}")]
    InvalidControlValue(String),

    // ========================================================================
    // General Errors (E9001-E9099)
    // ========================================================================
    /// Internal error (bug or unexpected state)
    #[error("[E9001] Internal error: {0}")]
    Internal(String),

    /// IO operation failed
    #[error("[E9002] IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("[E9003] Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type alias for Flowscope operations.
pub type FlowscopeResult<T> = Result<T, FlowscopeError>;

impl FlowscopeError {
    /// Shorthand for step actions that need to bail out.
    pub fn action(message: impl Into<String>) -> Self {
        FlowscopeError::Action(message.into())
    }

    pub fn scenario_not_found(pattern: impl Into<String>, scenario: impl Into<String>) -> Self {
        FlowscopeError::ScenarioNotFound {
            pattern: pattern.into(),
            scenario: scenario.into(),
        }
    }

    pub fn unsupported_control(pattern: impl Into<String>, control: impl Into<String>) -> Self {
        FlowscopeError::UnsupportedControl {
            pattern: pattern.into(),
            control: control.into(),
        }
    }

    /// Returns true for faults raised while a step was executing.
    pub fn is_playback_error(&self) -> bool {
        matches!(
            self,
            FlowscopeError::NoScenarioLoaded
                | FlowscopeError::StepFailed { .. }
                | FlowscopeError::StepPanicked { .. }
                | FlowscopeError::Action(_)
        )
    }

    /// Returns true for errors caused by what the user typed or configured.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            FlowscopeError::ConfigParseError(_)
                | FlowscopeError::InvalidConfigValue { .. }
                | FlowscopeError::InvalidSpeed(_)
                | FlowscopeError::PatternNotFound(_)
                | FlowscopeError::ScenarioNotFound { .. }
                | FlowscopeError::UnsupportedControl { .. }
                | FlowscopeError::InvalidControlValue(_)
        )
    }

    /// Returns an error code suitable for logging or external reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            FlowscopeError::NoScenarioLoaded => "E1001",
            FlowscopeError::StepFailed { .. } => "E1002",
            FlowscopeError::StepPanicked { .. } => "E1003",
            FlowscopeError::Action(_) => "E1004",
            FlowscopeError::ConfigParseError(_) => "E2001",
            FlowscopeError::InvalidConfigValue { .. } => "E2002",
            FlowscopeError::InvalidSpeed(_) => "E2003",
            FlowscopeError::PatternNotFound(_) => "E3001",
            FlowscopeError::ScenarioNotFound { .. } => "E3002",
            FlowscopeError::UnsupportedControl { .. } => "E3003",
            FlowscopeError::InvalidControlValue(_) => "E3004",
            FlowscopeError::Internal(_) => "E9001",
            FlowscopeError::IoError(_) => "E9002",
            FlowscopeError::SerializationError(_) => "E9003",
        }
    }

    /// Returns a user-friendly suggestion for how to resolve this error.
    pub fn user_suggestion(&self) -> Option<&'static str> {
        match self {
            FlowscopeError::NoScenarioLoaded => Some("Pick a scenario before stepping through it"),
            FlowscopeError::PatternNotFound(_) => {
                Some("Run 'flowscope patterns' to list the available patterns")
            }
            FlowscopeError::ScenarioNotFound { .. } => {
                Some("Run 'flowscope scenarios <pattern>' to list its scenarios")
            }
            FlowscopeError::InvalidSpeed(_) => Some("Use a speed between 0.5 and 3.0"),
            FlowscopeError::ConfigParseError(_) | FlowscopeError::InvalidConfigValue { .. } => {
                Some("Check config.toml or the FLOWSCOPE__* environment variables")
            }
            _ => None,
        }
    }

    /// Log this error with appropriate severity level.
    pub fn log(&self) {
        let code = self.error_code();
        let suggestion = self.user_suggestion();

        if self.is_user_error() {
            warn!(
                error_code = %code,
                suggestion = suggestion,
                "User error: {}",
                self
            );
        } else {
            error!(
                error_code = %code,
                suggestion = suggestion,
                "Error occurred: {}",
                self
            );
        }
    }
}

// ============================================================================
// User-friendly error formatting for CLI
// ============================================================================

/// Format an error for CLI display with its suggestion.
pub struct CliErrorDisplay<'a> {
    error: &'a FlowscopeError,
    show_suggestion: bool,
}

impl<'a> CliErrorDisplay<'a> {
    pub fn new(error: &'a FlowscopeError) -> Self {
        Self {
            error,
            show_suggestion: true,
        }
    }

    pub fn without_suggestion(mut self) -> Self {
        self.show_suggestion = false;
        self
    }
}

impl<'a> fmt::Display for CliErrorDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if self.show_suggestion {
            if let Some(suggestion) = self.error.user_suggestion() {
                writeln!(f)?;
                write!(f, "  Suggestion: {}", suggestion)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlowscopeError::StepFailed {
            scenario: "Kafka Down".to_string(),
            step: 3,
            message: "boom".to_string(),
        };
        assert!(err.to_string().contains("E1002"));
        assert!(err.to_string().contains("Kafka Down"));

        let err = FlowscopeError::scenario_not_found("outbox", "nope");
        assert!(err.to_string().contains("E3002"));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_error_codes_match_display() {
        let errors = vec![
            FlowscopeError::NoScenarioLoaded,
            FlowscopeError::InvalidSpeed(9.0),
            FlowscopeError::PatternNotFound("x".to_string()),
            FlowscopeError::Internal("x".to_string()),
        ];

        for err in errors {
            assert!(err.to_string().starts_with(&format!("[{}]", err.error_code())));
        }
    }

    #[test]
    fn test_error_categories() {
        assert!(FlowscopeError::NoScenarioLoaded.is_playback_error());
        assert!(FlowscopeError::action("x").is_playback_error());
        assert!(!FlowscopeError::InvalidSpeed(0.1).is_playback_error());

        assert!(FlowscopeError::InvalidSpeed(0.1).is_user_error());
        assert!(FlowscopeError::unsupported_control("saga", "lag").is_user_error());
        assert!(!FlowscopeError::Internal("x".to_string()).is_user_error());
    }

    #[test]
    fn test_cli_display_includes_suggestion() {
        let err = FlowscopeError::PatternNotFound("kafka".to_string());
        let shown = CliErrorDisplay::new(&err).to_string();
        assert!(shown.contains("Suggestion"));

        let shown = CliErrorDisplay::new(&err).without_suggestion().to_string();
        assert!(!shown.contains("Suggestion"));
    }
}
