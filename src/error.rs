//! Error types with fix suggestions
//!
//! `ArazzoError` covers failures that stop an operation outright (unreadable
//! input, YAML syntax, serialization). Findings about the document itself are
//! `errors::ValidationError` and never abort a validation pass.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArazzoError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum ArazzoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ARAZZO-001: YAML syntax error at {line}:{column}: {details}")]
    Syntax {
        line: usize,
        column: usize,
        details: String,
    },

    #[error("ARAZZO-002: Document is empty")]
    EmptyDocument,

    #[error("ARAZZO-003: Anchors and aliases are not supported (alias at {line}:{column})")]
    AliasUnsupported { line: usize, column: usize },

    #[error("ARAZZO-010: Missing validation context: {0}")]
    MissingContext(String),

    #[error("ARAZZO-020: YAML serialization failed: {0}")]
    YamlSerialize(#[from] serde_yaml::Error),

    #[error("ARAZZO-021: JSON serialization failed: {0}")]
    JsonSerialize(#[from] serde_json::Error),
}

impl FixSuggestion for ArazzoError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ArazzoError::Io(_) => Some("Check file path and permissions"),
            ArazzoError::Syntax { .. } => Some("Check YAML syntax: indentation and quoting"),
            ArazzoError::EmptyDocument => {
                Some("Start the document with `arazzo: 1.0.1`, `info`, `sourceDescriptions` and `workflows`")
            }
            ArazzoError::AliasUnsupported { .. } => Some("Inline the anchored value or move it to `components`"),
            ArazzoError::MissingContext(_) => {
                Some("Validate through `Arazzo::validate` so the document context is available")
            }
            ArazzoError::YamlSerialize(_) | ArazzoError::JsonSerialize(_) => None,
        }
    }
}
