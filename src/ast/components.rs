use std::cell::Cell;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::action::{FailureAction, SuccessAction};
use super::decode::{Extensions, Fields, FromNode};
use super::reusable::Component;
use super::step::Parameter;
use crate::errors::ValidationError;
use crate::node::{Node, Positions};

/// Reusable objects referenced from workflows as `$components.<kind>.<name>`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    /// JSON Schemas for workflow inputs
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub inputs: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Parameter>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub success_actions: IndexMap<String, SuccessAction>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub failure_actions: IndexMap<String, FailureAction>,
    #[serde(flatten)]
    pub extensions: Extensions,
    #[serde(skip)]
    pub positions: Positions,
    #[serde(skip)]
    pub(crate) valid: Cell<bool>,
}

impl Components {
    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }

    /// Whether `<kind>.<name>` exists
    pub fn contains(&self, kind: &str, name: &str) -> bool {
        match kind {
            "inputs" => self.inputs.contains_key(name),
            "parameters" => self.parameters.contains_key(name),
            "successActions" => self.success_actions.contains_key(name),
            "failureActions" => self.failure_actions.contains_key(name),
            _ => false,
        }
    }
}

impl FromNode for Components {
    fn from_node(node: &Node, errors: &mut Vec<ValidationError>) -> Self {
        let mut fields = Fields::new(node, "components", errors);
        let inputs = fields.value_map("inputs");
        let parameters = fields.map("parameters");
        let success_actions = fields.map("successActions");
        let failure_actions = fields.map("failureActions");
        let (positions, extensions) = fields.finish();
        Self {
            inputs,
            parameters,
            success_actions,
            failure_actions,
            extensions,
            positions,
            valid: Cell::new(false),
        }
    }
}

impl Component for Parameter {
    const KIND: &'static str = "parameters";

    fn lookup<'a>(components: &'a Components, name: &str) -> Option<&'a Self> {
        components.parameters.get(name)
    }
}

impl Component for SuccessAction {
    const KIND: &'static str = "successActions";

    fn lookup<'a>(components: &'a Components, name: &str) -> Option<&'a Self> {
        components.success_actions.get(name)
    }
}

impl Component for FailureAction {
    const KIND: &'static str = "failureActions";

    fn lookup<'a>(components: &'a Components, name: &str) -> Option<&'a Self> {
        components.failure_actions.get(name)
    }
}
