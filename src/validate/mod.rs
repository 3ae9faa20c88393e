//! Document validation
//!
//! Every model object validates itself and its children, collecting findings
//! instead of stopping at the first one:
//! - `document`: Arazzo root, info, source descriptions, components
//! - `workflow`: workflows, dependsOn, outputs
//! - `step`: steps, parameters, request bodies
//! - `action`: success/failure actions and their step targets
//!
//! Objects that need the surrounding document receive it through a `Scope`.
//! A missing scope member is a precondition failure reported as a single
//! finding for that object only.

mod action;
mod document;
mod step;
mod workflow;

use std::collections::HashSet;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::ast::{Arazzo, Component, Reusable, Step, Workflow};
use crate::cache::Caches;
use crate::error::ArazzoError;
use crate::errors::{Position, ValidationError};
use crate::expression::{extract_expressions, Expression, ExpressionType};
use crate::node::Positions;

/// Source description names, workflow ids and step ids
pub const ID_PATTERN: &str = r"^[A-Za-z0-9_\-]+$";
/// Component keys and output names
pub const KEY_PATTERN: &str = r"^[a-zA-Z0-9.\-_]+$";

pub(crate) static ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(ID_PATTERN).unwrap());
pub(crate) static KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(KEY_PATTERN).unwrap());

/// What an object is validated within
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub caches: &'a Caches,
    pub document: Option<&'a Arazzo>,
    pub workflow: Option<&'a Workflow>,
    pub step: Option<&'a Step>,
    /// Key under `components` when validating a component
    pub component: Option<&'a str>,
}

impl<'a> Scope<'a> {
    pub fn new(caches: &'a Caches) -> Self {
        Self {
            caches,
            document: None,
            workflow: None,
            step: None,
            component: None,
        }
    }

    pub fn with_document(self, document: &'a Arazzo) -> Self {
        Self {
            document: Some(document),
            ..self
        }
    }

    pub fn with_workflow(self, workflow: &'a Workflow) -> Self {
        Self {
            workflow: Some(workflow),
            ..self
        }
    }

    pub fn with_step(self, step: &'a Step) -> Self {
        Self {
            step: Some(step),
            ..self
        }
    }

    pub fn with_component(self, component: &'a str) -> Self {
        Self {
            component: Some(component),
            ..self
        }
    }

    /// The document, or the precondition finding for `what`
    pub(crate) fn require_document(&self, what: &str, at: Position) -> Result<&'a Arazzo, ValidationError> {
        self.document
            .ok_or_else(|| missing_context(&format!("an Arazzo document is required to validate a {what}"), at))
    }

    pub(crate) fn require_workflow(&self, what: &str, at: Position) -> Result<&'a Workflow, ValidationError> {
        self.workflow
            .ok_or_else(|| missing_context(&format!("a workflow is required to validate a {what}"), at))
    }
}

fn missing_context(details: &str, at: Position) -> ValidationError {
    ValidationError::new(ArazzoError::MissingContext(details.to_string()).to_string(), at)
}

/// Objects validated against a scope
pub trait Validate {
    fn validate(&self, scope: &Scope<'_>) -> Vec<ValidationError>;
}

impl<T: Component + Validate> Validate for Reusable<T> {
    fn validate(&self, scope: &Scope<'_>) -> Vec<ValidationError> {
        match self {
            Reusable::Object(object) => object.validate(scope),
            Reusable::Reference {
                reference,
                value,
                positions,
                valid,
            } => {
                let errors = validate_reference::<T>(reference, value.as_ref(), positions, scope);
                valid.set(errors.is_empty());
                errors
            }
        }
    }
}

fn validate_reference<T: Component>(
    reference: &Expression,
    value: Option<&Value>,
    positions: &Positions,
    scope: &Scope<'_>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let at = positions.field("reference");

    if value.is_some() && T::KIND != "parameters" {
        errors.push(ValidationError::new(
            "value is only allowed when referencing a parameter",
            positions.field("value"),
        ));
    }

    if reference.is_empty() {
        errors.push(ValidationError::new("reference is required", positions.at));
        return errors;
    }
    if let Err(e) = reference.validate() {
        errors.push(ValidationError::new(format!("reference is not valid: {e}"), at));
        return errors;
    }

    let parts = reference.parts();
    if parts.expression_type != Some(ExpressionType::Components) || parts.reference != T::KIND {
        errors.push(ValidationError::new(
            format!("reference must point to $components.{}, got {}", T::KIND, reference),
            at,
        ));
        return errors;
    }

    let document = match scope.require_document("reference", positions.at) {
        Ok(document) => document,
        Err(e) => {
            errors.push(e);
            return errors;
        }
    };
    let name = parts.parts.join(".");
    let found = document
        .components
        .as_ref()
        .is_some_and(|components| T::lookup(components, &name).is_some());
    if !found {
        errors.push(ValidationError::new(
            format!("component {} not found in components.{}", name, T::KIND),
            at,
        ));
    }

    errors
}

/// Flag repeats of `key` among siblings
pub(crate) struct Duplicates {
    seen: HashSet<String>,
    what: &'static str,
}

impl Duplicates {
    pub(crate) fn new(what: &'static str) -> Self {
        Self {
            seen: HashSet::new(),
            what,
        }
    }

    pub(crate) fn check(&mut self, key: String, at: Position, errors: &mut Vec<ValidationError>) {
        if !self.seen.insert(key.clone()) {
            errors.push(ValidationError::new(format!("duplicate {} found: {}", self.what, key), at));
        }
    }
}

/// Output names and their expressions
pub(crate) fn validate_outputs(
    outputs: &IndexMap<String, Expression>,
    positions: &Positions,
    errors: &mut Vec<ValidationError>,
) {
    for (name, expression) in outputs {
        let at = positions.entry("outputs", name);
        if !KEY_RE.is_match(name) {
            errors.push(ValidationError::new(
                format!("output name {name} must match {KEY_PATTERN}"),
                at,
            ));
        }
        if let Err(e) = expression.validate() {
            errors.push(ValidationError::new(format!("output {name} is not valid: {e}"), at));
        }
    }
}

/// Validate every expression embedded in string values of `value`
pub(crate) fn validate_embedded(value: &Value, what: &str, at: Position, errors: &mut Vec<ValidationError>) {
    match value {
        Value::String(s) => {
            for found in extract_expressions(s) {
                if let Err(e) = Expression::new(found).validate() {
                    errors.push(ValidationError::new(format!("{what} is not valid: {e}"), at));
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                validate_embedded(item, what, at, errors);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                validate_embedded(item, what, at, errors);
            }
        }
        _ => {}
    }
}

/// `$sourceDescriptions.<name>...` that must name an existing source description
pub(crate) fn validate_source_expression(
    expression: &Expression,
    field: &str,
    document: &Arazzo,
    at: Position,
    errors: &mut Vec<ValidationError>,
) {
    if let Err(e) = expression.validate() {
        errors.push(ValidationError::new(format!("{field} is not valid: {e}"), at));
        return;
    }
    let parts = expression.parts();
    if parts.expression_type != Some(ExpressionType::SourceDescriptions) {
        errors.push(ValidationError::new(
            format!("{field} must be a sourceDescriptions expression, got {expression}"),
            at,
        ));
        return;
    }
    if document.source_description(parts.reference).is_none() {
        errors.push(ValidationError::new(
            format!("{field} references unknown sourceDescription {}", parts.reference),
            at,
        ));
    }
}

/// A `workflowId` value: a sourceDescriptions expression or a workflow of this document
pub(crate) fn validate_workflow_target(
    workflow_id: &Expression,
    document: &Arazzo,
    at: Position,
    errors: &mut Vec<ValidationError>,
) {
    if workflow_id.is_expression() {
        validate_source_expression(workflow_id, "workflowId", document, at, errors);
    } else if document.workflow(workflow_id.as_str()).is_none() {
        errors.push(ValidationError::new(
            format!("workflowId {workflow_id} does not exist"),
            at,
        ));
    }
}

/// JSON Schema compilation check for `inputs`
pub(crate) fn validate_schema(schema: &Value, what: &str, at: Position, errors: &mut Vec<ValidationError>) {
    if let Err(e) = jsonschema::validator_for(schema) {
        errors.push(ValidationError::new(
            format!("{what} is not a valid JSON Schema: {e}"),
            at,
        ));
    }
}
