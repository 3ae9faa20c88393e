//! Document loading and validation pipeline
//!
//! 1. YAML/JSON source to positioned node tree (`node::parse`)
//! 2. Node tree to typed model, collecting shape findings (`ast::FromNode`)
//! 3. Model validation (`Arazzo::validate`), unless skipped
//! 4. Findings sorted by (line, column)
//!
//! Only a source that cannot be read as YAML at all is an `Err`. Everything
//! else comes back as the decoded document plus its findings, so callers can
//! repair the model and validate again without re-parsing.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::ast::{Arazzo, FromNode};
use crate::config::Options;
use crate::error::ArazzoError;
use crate::errors::{sort_errors, ValidationError, ValidationResult};
use crate::node;

/// Decode `source` and validate it according to `options`
#[instrument(skip_all, fields(bytes = source.len()))]
pub fn unmarshal(source: &str, options: &Options) -> Result<(Arazzo, Vec<ValidationError>), ArazzoError> {
    let root = node::parse(source)?;

    let mut errors = Vec::new();
    let document = Arazzo::from_node(&root, &mut errors);
    debug!(decode_findings = errors.len(), workflows = document.workflows.len(), "document decoded");

    if !options.skip_validation {
        errors.extend(document.validate(options.caches()));
    }
    if options.sort_errors {
        sort_errors(&mut errors);
    }
    Ok((document, errors))
}

/// Validates documents and files with a fixed set of options
#[derive(Debug, Clone, Default)]
pub struct Validator {
    options: Options,
}

impl Validator {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Validate an already decoded (possibly edited) document
    pub fn validate(&self, document: &Arazzo, file_path: &str) -> ValidationResult {
        let mut result = ValidationResult::new(file_path);
        result.workflow_count = document.workflows.len();
        result.step_count = document.step_count();
        result.extend(document.validate(self.options.caches()));
        if self.options.sort_errors {
            result.sort();
        }
        result
    }

    /// Validate source text; decode findings are part of the result
    pub fn validate_source(&self, source: &str, file_path: &str) -> Result<ValidationResult> {
        let (document, errors) = unmarshal(source, &self.options)
            .with_context(|| format!("Failed to parse Arazzo document {file_path}"))?;

        let mut result = ValidationResult::new(file_path);
        result.workflow_count = document.workflows.len();
        result.step_count = document.step_count();
        result.extend(errors);
        Ok(result)
    }

    /// Validate a document file from path
    pub fn validate_file(&self, path: &Path) -> Result<ValidationResult> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read Arazzo document {:?}", path))?;
        self.validate_source(&source, &path.to_string_lossy())
    }
}
