use tracing::{debug, instrument};

use super::{validate_schema, Duplicates, Scope, Validate, ID_PATTERN, ID_RE, KEY_PATTERN, KEY_RE};
use crate::ast::{Arazzo, Components, Info, SourceDescription, SourceDescriptionType};
use crate::cache::Caches;
use crate::errors::ValidationError;

/// Highest supported document version
pub const MAX_VERSION: (u64, u64, u64) = (1, 0, 1);

fn parse_version(version: &str) -> Option<(u64, u64, u64)> {
    let mut parts = version.split('.').map(|p| p.parse::<u64>().ok());
    let version = (parts.next()??, parts.next()??, parts.next()??);
    parts.next().is_none().then_some(version)
}

impl Arazzo {
    /// Validate the whole document. Findings are in discovery order.
    #[instrument(skip_all, fields(workflows = self.workflows.len()))]
    pub fn validate(&self, caches: &Caches) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let scope = Scope::new(caches).with_document(self);

        let version_at = self.positions.field("arazzo");
        if self.arazzo.is_empty() {
            errors.push(ValidationError::new("arazzo is required", self.positions.at));
        } else {
            match parse_version(&self.arazzo) {
                None => errors.push(ValidationError::new(
                    format!("arazzo version must be in the format major.minor.patch, got {}", self.arazzo),
                    version_at,
                )),
                Some((major, minor, patch)) => {
                    let (max_major, max_minor, max_patch) = MAX_VERSION;
                    if major != max_major || minor != max_minor || patch > max_patch {
                        errors.push(ValidationError::new(
                            "only Arazzo version 1.0.1 and below is supported",
                            version_at,
                        ));
                    }
                }
            }
        }

        match &self.info {
            Some(info) => errors.extend(info.validate()),
            None => errors.push(ValidationError::new("info is required", self.positions.at)),
        }

        if self.source_descriptions.is_empty() {
            errors.push(ValidationError::new(
                "at least one sourceDescription is required",
                self.positions.field("sourceDescriptions"),
            ));
        }
        let mut names = Duplicates::new("sourceDescription name");
        for (i, source) in self.source_descriptions.iter().enumerate() {
            errors.extend(source.validate(caches));
            if !source.name.is_empty() {
                names.check(source.name.clone(), self.positions.item("sourceDescriptions", i), &mut errors);
            }
        }

        if self.workflows.is_empty() {
            errors.push(ValidationError::new(
                "at least one workflow is required",
                self.positions.field("workflows"),
            ));
        }
        let mut ids = Duplicates::new("workflowId");
        for (i, workflow) in self.workflows.iter().enumerate() {
            errors.extend(workflow.validate(&scope));
            if !workflow.workflow_id.is_empty() {
                ids.check(workflow.workflow_id.clone(), self.positions.item("workflows", i), &mut errors);
            }
        }

        if let Some(components) = &self.components {
            errors.extend(components.validate(&scope));
        }

        debug!(findings = errors.len(), "document validated");
        self.valid.set(errors.is_empty());
        errors
    }
}

impl Info {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.title.is_empty() {
            errors.push(ValidationError::new("title is required", self.positions.at));
        }
        if self.version.is_empty() {
            errors.push(ValidationError::new("version is required", self.positions.at));
        }
        self.valid.set(errors.is_empty());
        errors
    }
}

impl SourceDescription {
    pub fn validate(&self, caches: &Caches) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.name.is_empty() {
            errors.push(ValidationError::new("name is required", self.positions.at));
        } else if !ID_RE.is_match(&self.name) {
            errors.push(ValidationError::new(
                format!("name {} must match {}", self.name, ID_PATTERN),
                self.positions.field("name"),
            ));
        }

        if self.url.is_empty() {
            errors.push(ValidationError::new("url is required", self.positions.at));
        } else if let Err(e) = caches.parse_url(&self.url) {
            errors.push(ValidationError::new(
                format!("url {} is not valid: {}", self.url, e),
                self.positions.field("url"),
            ));
        }

        if let Some(type_) = &self.type_ {
            if SourceDescriptionType::parse(type_).is_none() {
                errors.push(ValidationError::new(
                    format!("type must be one of [openapi, arazzo], got {type_}"),
                    self.positions.field("type"),
                ));
            }
        }

        self.valid.set(errors.is_empty());
        errors
    }
}

impl Validate for Components {
    fn validate(&self, scope: &Scope<'_>) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let keys = self
            .inputs
            .keys()
            .map(|k| ("inputs", k))
            .chain(self.parameters.keys().map(|k| ("parameters", k)))
            .chain(self.success_actions.keys().map(|k| ("successActions", k)))
            .chain(self.failure_actions.keys().map(|k| ("failureActions", k)));
        for (field, key) in keys {
            if !KEY_RE.is_match(key) {
                errors.push(ValidationError::new(
                    format!("{field} key {key} must match {KEY_PATTERN}"),
                    self.positions.entry(field, key),
                ));
            }
        }

        for (key, schema) in &self.inputs {
            validate_schema(schema, &format!("inputs {key}"), self.positions.entry("inputs", key), &mut errors);
        }
        for (key, parameter) in &self.parameters {
            errors.extend(parameter.validate(&scope.with_component(key)));
        }
        for (key, action) in &self.success_actions {
            errors.extend(action.validate(&scope.with_component(key)));
        }
        for (key, action) in &self.failure_actions {
            errors.extend(action.validate(&scope.with_component(key)));
        }

        self.valid.set(errors.is_empty());
        errors
    }
}
