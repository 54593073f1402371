//! Error types for score resolution

use thiserror::Error;

/// Resolver error enumeration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// A configured selector could not be parsed
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// The strategy has no usable element selectors
    #[error("Empty strategy: {0}")]
    EmptyStrategy(String),
}
