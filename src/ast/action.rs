use std::cell::Cell;
use std::fmt;

use serde::Serialize;

use super::decode::{Extensions, Fields, FromNode};
use crate::criterion::Criterion;
use crate::errors::ValidationError;
use crate::expression::Expression;
use crate::node::{Node, Positions};

/// What an action does once its criteria hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    End,
    Goto,
    Retry,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::End => "end",
            ActionType::Goto => "goto",
            ActionType::Retry => "retry",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "end" => Some(ActionType::End),
            "goto" => Some(ActionType::Goto),
            "retry" => Some(ActionType::Retry),
            _ => None,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessAction {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<Expression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub criteria: Vec<Criterion>,
    #[serde(flatten)]
    pub extensions: Extensions,
    #[serde(skip)]
    pub positions: Positions,
    #[serde(skip)]
    pub(crate) valid: Cell<bool>,
}

impl SuccessAction {
    pub fn new(name: impl Into<String>, type_: ActionType) -> Self {
        Self {
            name: name.into(),
            type_: type_.as_str().to_string(),
            ..Default::default()
        }
    }

    pub fn action_type(&self) -> Option<ActionType> {
        ActionType::parse(&self.type_)
    }

    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }
}

impl FromNode for SuccessAction {
    fn from_node(node: &Node, errors: &mut Vec<ValidationError>) -> Self {
        let mut fields = Fields::new(node, "success action", errors);
        let name = fields.required_string("name");
        let type_ = fields.required_string("type");
        let workflow_id = fields.expression("workflowId");
        let step_id = fields.string("stepId");
        let criteria = fields.list("criteria");
        let (positions, extensions) = fields.finish();
        Self {
            name,
            type_,
            workflow_id,
            step_id,
            criteria,
            extensions,
            positions,
            valid: Cell::new(false),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureAction {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<Expression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    /// Seconds to wait before retrying
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_limit: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub criteria: Vec<Criterion>,
    #[serde(flatten)]
    pub extensions: Extensions,
    #[serde(skip)]
    pub positions: Positions,
    #[serde(skip)]
    pub(crate) valid: Cell<bool>,
}

impl FailureAction {
    pub fn new(name: impl Into<String>, type_: ActionType) -> Self {
        Self {
            name: name.into(),
            type_: type_.as_str().to_string(),
            ..Default::default()
        }
    }

    pub fn action_type(&self) -> Option<ActionType> {
        ActionType::parse(&self.type_)
    }

    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }
}

impl FromNode for FailureAction {
    fn from_node(node: &Node, errors: &mut Vec<ValidationError>) -> Self {
        let mut fields = Fields::new(node, "failure action", errors);
        let name = fields.required_string("name");
        let type_ = fields.required_string("type");
        let workflow_id = fields.expression("workflowId");
        let step_id = fields.string("stepId");
        let retry_after = fields.number("retryAfter");
        let retry_limit = fields.integer("retryLimit");
        let criteria = fields.list("criteria");
        let (positions, extensions) = fields.finish();
        Self {
            name,
            type_,
            workflow_id,
            step_id,
            retry_after,
            retry_limit,
            criteria,
            extensions,
            positions,
            valid: Cell::new(false),
        }
    }
}
