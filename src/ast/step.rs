use std::cell::Cell;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::action::{FailureAction, SuccessAction};
use super::decode::{Extensions, Fields, FromNode};
use super::reusable::Reusable;
use crate::criterion::Criterion;
use crate::errors::ValidationError;
use crate::expression::Expression;
use crate::node::{Node, Positions};

/// A single call: an API operation or another workflow
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub step_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<Expression>,
    /// `{$sourceDescriptions.<name>.url}#/json/pointer`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<Expression>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Reusable<Parameter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub success_criteria: Vec<Criterion>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub on_success: Vec<Reusable<SuccessAction>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub on_failure: Vec<Reusable<FailureAction>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, Expression>,
    #[serde(flatten)]
    pub extensions: Extensions,
    #[serde(skip)]
    pub positions: Positions,
    #[serde(skip)]
    pub(crate) valid: Cell<bool>,
}

impl Step {
    pub fn new(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            ..Default::default()
        }
    }

    /// Targets an API operation rather than a workflow
    pub fn targets_operation(&self) -> bool {
        self.operation_id.is_some() || self.operation_path.is_some()
    }

    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }
}

impl FromNode for Step {
    fn from_node(node: &Node, errors: &mut Vec<ValidationError>) -> Self {
        let mut fields = Fields::new(node, "step", errors);
        let step_id = fields.required_string("stepId");
        let description = fields.string("description");
        let operation_id = fields.expression("operationId");
        let operation_path = fields.string("operationPath");
        let workflow_id = fields.expression("workflowId");
        let parameters = fields.list("parameters");
        let request_body = fields.child("requestBody");
        let success_criteria = fields.list("successCriteria");
        let on_success = fields.list("onSuccess");
        let on_failure = fields.list("onFailure");
        let outputs = fields.expression_map("outputs");
        let (positions, extensions) = fields.finish();
        Self {
            step_id,
            description,
            operation_id,
            operation_path,
            workflow_id,
            parameters,
            request_body,
            success_criteria,
            on_success,
            on_failure,
            outputs,
            extensions,
            positions,
            valid: Cell::new(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterIn {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterIn {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterIn::Path => "path",
            ParameterIn::Query => "query",
            ParameterIn::Header => "header",
            ParameterIn::Cookie => "cookie",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(ParameterIn::Path),
            "query" => Some(ParameterIn::Query),
            "header" => Some(ParameterIn::Header),
            "cookie" => Some(ParameterIn::Cookie),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub in_: Option<String>,
    /// A literal or a runtime expression
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(flatten)]
    pub extensions: Extensions,
    #[serde(skip)]
    pub positions: Positions,
    #[serde(skip)]
    pub(crate) valid: Cell<bool>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, in_: Option<ParameterIn>, value: Value) -> Self {
        Self {
            name: name.into(),
            in_: in_.map(|i| i.as_str().to_string()),
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn location(&self) -> Option<ParameterIn> {
        self.in_.as_deref().and_then(ParameterIn::parse)
    }

    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }
}

impl FromNode for Parameter {
    fn from_node(node: &Node, errors: &mut Vec<ValidationError>) -> Self {
        let mut fields = Fields::new(node, "parameter", errors);
        let name = fields.required_string("name");
        let in_ = fields.string("in");
        let value = fields.value("value");
        let (positions, extensions) = fields.finish();
        Self {
            name,
            in_,
            value,
            extensions,
            positions,
            valid: Cell::new(false),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replacements: Vec<PayloadReplacement>,
    #[serde(flatten)]
    pub extensions: Extensions,
    #[serde(skip)]
    pub positions: Positions,
    #[serde(skip)]
    pub(crate) valid: Cell<bool>,
}

impl RequestBody {
    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }
}

impl FromNode for RequestBody {
    fn from_node(node: &Node, errors: &mut Vec<ValidationError>) -> Self {
        let mut fields = Fields::new(node, "request body", errors);
        let content_type = fields.string("contentType");
        let payload = fields.value("payload");
        let replacements = fields.list("replacements");
        let (positions, extensions) = fields.finish();
        Self {
            content_type,
            payload,
            replacements,
            extensions,
            positions,
            valid: Cell::new(false),
        }
    }
}

/// Replaces the value at `target` (JSON pointer or XPath) in the payload
#[derive(Debug, Clone, Default, Serialize)]
pub struct PayloadReplacement {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(flatten)]
    pub extensions: Extensions,
    #[serde(skip)]
    pub positions: Positions,
    #[serde(skip)]
    pub(crate) valid: Cell<bool>,
}

impl PayloadReplacement {
    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }
}

impl FromNode for PayloadReplacement {
    fn from_node(node: &Node, errors: &mut Vec<ValidationError>) -> Self {
        let mut fields = Fields::new(node, "payload replacement", errors);
        let target = fields.required_string("target");
        let value = fields.value("value");
        let (positions, extensions) = fields.finish();
        Self {
            target,
            value,
            extensions,
            positions,
            valid: Cell::new(false),
        }
    }
}
