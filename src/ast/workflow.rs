use std::cell::Cell;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::action::{FailureAction, SuccessAction};
use super::decode::{Extensions, Fields, FromNode};
use super::reusable::Reusable;
use super::step::{Parameter, Step};
use crate::errors::ValidationError;
use crate::expression::Expression;
use crate::node::{Node, Positions};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub workflow_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Reusable<Parameter>>,
    /// JSON Schema of the workflow inputs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<Expression>,
    pub steps: Vec<Step>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub success_actions: Vec<Reusable<SuccessAction>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failure_actions: Vec<Reusable<FailureAction>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, Expression>,
    #[serde(flatten)]
    pub extensions: Extensions,
    #[serde(skip)]
    pub positions: Positions,
    #[serde(skip)]
    pub(crate) valid: Cell<bool>,
}

impl Workflow {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            ..Default::default()
        }
    }

    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }
}

impl FromNode for Workflow {
    fn from_node(node: &Node, errors: &mut Vec<ValidationError>) -> Self {
        let mut fields = Fields::new(node, "workflow", errors);
        let workflow_id = fields.required_string("workflowId");
        let summary = fields.string("summary");
        let description = fields.string("description");
        let parameters = fields.list("parameters");
        let inputs = fields.value("inputs");
        let depends_on = fields
            .string_list("dependsOn")
            .into_iter()
            .map(Expression::new)
            .collect();
        let steps = fields.list("steps");
        let success_actions = fields.list("successActions");
        let failure_actions = fields.list("failureActions");
        let outputs = fields.expression_map("outputs");
        let (positions, extensions) = fields.finish();
        Self {
            workflow_id,
            summary,
            description,
            parameters,
            inputs,
            depends_on,
            steps,
            success_actions,
            failure_actions,
            outputs,
            extensions,
            positions,
            valid: Cell::new(false),
        }
    }
}
