//! Runtime expressions
//!
//! `$url`, `$method`, `$statusCode`, `$request.*`, `$response.*`, `$inputs.*`,
//! `$outputs.*`, `$steps.*`, `$workflows.*`, `$sourceDescriptions.*` and
//! `$components.*`, optionally followed by a `#/json/pointer`.
//!
//! Validation here is position-agnostic: errors describe the offending
//! expression and callers attach the source position.

mod extract;
mod pointer;

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

pub use extract::extract_expressions;
pub use pointer::validate_json_pointer;

/// RFC 7230 header field token
const TOKEN_PATTERN: &str = r"^[!#$%&'*+\-.^_`|~0-9A-Za-z]+$";
/// Names are any non-empty run of 7-bit characters (NUL excluded)
const NAME_PATTERN: &str = r"^[\x01-\x7F]+$";

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(TOKEN_PATTERN).unwrap());
static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(NAME_PATTERN).unwrap());

/// The root of a runtime expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionType {
    Url,
    Method,
    StatusCode,
    Request,
    Response,
    Inputs,
    Outputs,
    Steps,
    Workflows,
    SourceDescriptions,
    Components,
}

impl ExpressionType {
    pub const ALL: [ExpressionType; 11] = [
        ExpressionType::Url,
        ExpressionType::Method,
        ExpressionType::StatusCode,
        ExpressionType::Request,
        ExpressionType::Response,
        ExpressionType::Inputs,
        ExpressionType::Outputs,
        ExpressionType::Steps,
        ExpressionType::Workflows,
        ExpressionType::SourceDescriptions,
        ExpressionType::Components,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpressionType::Url => "url",
            ExpressionType::Method => "method",
            ExpressionType::StatusCode => "statusCode",
            ExpressionType::Request => "request",
            ExpressionType::Response => "response",
            ExpressionType::Inputs => "inputs",
            ExpressionType::Outputs => "outputs",
            ExpressionType::Steps => "steps",
            ExpressionType::Workflows => "workflows",
            ExpressionType::SourceDescriptions => "sourceDescriptions",
            ExpressionType::Components => "components",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for ExpressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a `$request`/`$response` expression points into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceReference {
    Header,
    Query,
    Path,
    Body,
}

impl SourceReference {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "header" => Some(SourceReference::Header),
            "query" => Some(SourceReference::Query),
            "path" => Some(SourceReference::Path),
            "body" => Some(SourceReference::Body),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("expression is not valid, must begin with $ and be a single expression: {expression}")]
    NotAnExpression { expression: String },

    #[error("expression is not valid, must begin with one of [url, method, statusCode, request, response, inputs, outputs, steps, workflows, sourceDescriptions, components]: {expression}")]
    UnknownType { expression: String },

    #[error("expression is not valid, extra characters after ${expression_type}: {expression}")]
    UnexpectedSegments {
        expression_type: ExpressionType,
        expression: String,
    },

    #[error("expression is not valid, expected name after ${expression_type}: {expression}")]
    MissingName {
        expression_type: ExpressionType,
        expression: String,
    },

    #[error("expression is not valid, expected one of [header, query, path, body] after ${expression_type}: {expression}")]
    UnknownSourceReference {
        expression_type: ExpressionType,
        expression: String,
    },

    #[error("expression is not valid, expected name after ${expression_type}.{reference}: {expression}")]
    MissingSourceName {
        expression_type: ExpressionType,
        reference: String,
        expression: String,
    },

    #[error("expression is not valid, only json pointers are allowed after ${expression_type}.body: {expression}")]
    BodySegments {
        expression_type: ExpressionType,
        expression: String,
    },

    #[error("expression is not valid, expected output name after outputs: {expression}")]
    MissingOutputName { expression: String },

    #[error("expression is not valid, header '{header}' must match token grammar {pattern}: {expression}")]
    InvalidToken {
        header: String,
        pattern: &'static str,
        expression: String,
    },

    #[error("expression is not valid, name '{name}' must match {pattern}: {expression}")]
    InvalidName {
        name: String,
        pattern: &'static str,
        expression: String,
    },

    #[error("json pointers are not allowed in current context: {expression}")]
    JsonPointerNotAllowed { expression: String },

    #[error("a json pointer is required in current context: {expression}")]
    JsonPointerRequired { expression: String },

    #[error("expression is not valid, json pointer '{pointer}' is invalid: {reason}")]
    InvalidJsonPointer { pointer: String, reason: String },
}

/// The decomposed form of an expression: `$type.reference.parts...#pointer`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionParts<'a> {
    /// Text between `$` and the first `.` or `#`
    pub type_name: &'a str,
    pub expression_type: Option<ExpressionType>,
    pub reference: &'a str,
    pub parts: Vec<&'a str>,
    /// `Some` whenever a `#` is present, even if nothing follows it
    pub json_pointer: Option<&'a str>,
}

impl ExpressionParts<'_> {
    /// Reference and parts joined back with dots
    pub fn name(&self) -> String {
        std::iter::once(self.reference)
            .chain(self.parts.iter().copied())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// A runtime expression string
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Expression(String);

impl Expression {
    pub fn new(expression: impl Into<String>) -> Self {
        Self(expression.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the whole string is exactly one expression of a known type
    pub fn is_expression(&self) -> bool {
        self.is_single_expression() && self.expression_type().is_some()
    }

    fn is_single_expression(&self) -> bool {
        let found = extract_expressions(&self.0);
        found.len() == 1 && found[0] == self.0
    }

    pub fn expression_type(&self) -> Option<ExpressionType> {
        self.parts().expression_type
    }

    /// Split into `(type, reference, parts, pointer)`. Meaningful only for
    /// strings starting with `$`.
    pub fn parts(&self) -> ExpressionParts<'_> {
        let body = self.0.strip_prefix('$').unwrap_or(&self.0);
        let (head, json_pointer) = match body.split_once('#') {
            Some((head, pointer)) => (head, Some(pointer)),
            None => (body, None),
        };

        let mut segments = head.split('.');
        let type_name = segments.next().unwrap_or_default();
        let reference = segments.next().unwrap_or_default();

        ExpressionParts {
            type_name,
            expression_type: ExpressionType::parse(type_name),
            reference,
            parts: segments.collect(),
            json_pointer,
        }
    }

    /// Check the expression against the grammar of its type
    pub fn validate(&self) -> Result<(), ExpressionError> {
        if !self.is_single_expression() {
            return Err(ExpressionError::NotAnExpression {
                expression: self.0.clone(),
            });
        }

        let parts = self.parts();
        let Some(expression_type) = parts.expression_type else {
            return Err(ExpressionError::UnknownType {
                expression: self.0.clone(),
            });
        };

        let pointer_allowed = match expression_type {
            ExpressionType::Url | ExpressionType::Method | ExpressionType::StatusCode => {
                if !parts.reference.is_empty() || !parts.parts.is_empty() {
                    return Err(ExpressionError::UnexpectedSegments {
                        expression_type,
                        expression: self.0.clone(),
                    });
                }
                false
            }
            ExpressionType::Request | ExpressionType::Response => {
                self.validate_source(expression_type, &parts)?
            }
            ExpressionType::Inputs | ExpressionType::Components => {
                self.validate_names(expression_type, &parts)?;
                false
            }
            ExpressionType::Outputs => {
                self.validate_names(expression_type, &parts)?;
                true
            }
            ExpressionType::Steps | ExpressionType::Workflows => {
                self.validate_names(expression_type, &parts)?;
                if parts.parts.first() == Some(&"outputs") {
                    if parts.parts.len() < 2 {
                        return Err(ExpressionError::MissingOutputName {
                            expression: self.0.clone(),
                        });
                    }
                    true
                } else {
                    false
                }
            }
            ExpressionType::SourceDescriptions => {
                self.validate_names(expression_type, &parts)?;
                parts.name().ends_with("url")
            }
        };

        if let Some(pointer) = parts.json_pointer {
            if !pointer_allowed {
                return Err(ExpressionError::JsonPointerNotAllowed {
                    expression: self.0.clone(),
                });
            }
            validate_json_pointer(pointer)?;
        }

        Ok(())
    }

    /// `$request`/`$response` grammar; returns whether a pointer may follow
    fn validate_source(
        &self,
        expression_type: ExpressionType,
        parts: &ExpressionParts<'_>,
    ) -> Result<bool, ExpressionError> {
        let Some(reference) = SourceReference::parse(parts.reference) else {
            return Err(ExpressionError::UnknownSourceReference {
                expression_type,
                expression: self.0.clone(),
            });
        };

        match reference {
            SourceReference::Body => {
                if !parts.parts.is_empty() {
                    return Err(ExpressionError::BodySegments {
                        expression_type,
                        expression: self.0.clone(),
                    });
                }
                Ok(true)
            }
            SourceReference::Header => {
                if parts.parts.is_empty() {
                    return Err(self.missing_source_name(expression_type, parts));
                }
                let header = parts.parts.join(".");
                if !TOKEN_RE.is_match(&header) {
                    return Err(ExpressionError::InvalidToken {
                        header,
                        pattern: TOKEN_PATTERN,
                        expression: self.0.clone(),
                    });
                }
                Ok(false)
            }
            SourceReference::Query | SourceReference::Path => {
                if parts.parts.is_empty() {
                    return Err(self.missing_source_name(expression_type, parts));
                }
                for name in &parts.parts {
                    self.validate_name(name)?;
                }
                Ok(false)
            }
        }
    }

    fn missing_source_name(
        &self,
        expression_type: ExpressionType,
        parts: &ExpressionParts<'_>,
    ) -> ExpressionError {
        ExpressionError::MissingSourceName {
            expression_type,
            reference: parts.reference.to_string(),
            expression: self.0.clone(),
        }
    }

    fn validate_names(
        &self,
        expression_type: ExpressionType,
        parts: &ExpressionParts<'_>,
    ) -> Result<(), ExpressionError> {
        if parts.reference.is_empty() {
            return Err(ExpressionError::MissingName {
                expression_type,
                expression: self.0.clone(),
            });
        }
        self.validate_name(parts.reference)?;
        for name in &parts.parts {
            self.validate_name(name)?;
        }
        Ok(())
    }

    fn validate_name(&self, name: &str) -> Result<(), ExpressionError> {
        if NAME_RE.is_match(name) {
            Ok(())
        } else {
            Err(ExpressionError::InvalidName {
                name: name.to_string(),
                pattern: NAME_PATTERN,
                expression: self.0.clone(),
            })
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Expression {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Expression {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Expression {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
