use tracing::debug;

use super::{
    validate_outputs, validate_schema, validate_source_expression, Duplicates, Scope, Validate, ID_PATTERN, ID_RE,
};
use crate::ast::{Arazzo, Component, Parameter, Reusable, Workflow};
use crate::errors::ValidationError;

/// Duplicate key of a reusable: its reference, or the inline object's identity
pub(crate) fn reusable_key<T: Component>(reusable: &Reusable<T>, inline: impl Fn(&T) -> String) -> String {
    match reusable {
        Reusable::Reference { reference, .. } => reference.to_string(),
        Reusable::Object(object) => inline(object),
    }
}

pub(crate) fn parameter_key(parameter: &Parameter) -> String {
    format!("{} ({})", parameter.name, parameter.in_.as_deref().unwrap_or("unset"))
}

/// References are keyed by the parameter they resolve to, so they collide
/// with inline parameters of the same name and location
pub(crate) fn resolved_parameter_key(parameter: &Reusable<Parameter>, document: &Arazzo) -> String {
    match parameter.get(document.components.as_ref()) {
        Some(resolved) => parameter_key(resolved),
        None => reusable_key(parameter, parameter_key),
    }
}

impl Validate for Workflow {
    fn validate(&self, scope: &Scope<'_>) -> Vec<ValidationError> {
        let document = match scope.require_document("workflow", self.positions.at) {
            Ok(document) => document,
            Err(e) => return vec![e],
        };
        let scope = scope.with_workflow(self);
        let mut errors = Vec::new();

        if self.workflow_id.is_empty() {
            errors.push(ValidationError::new("workflowId is required", self.positions.at));
        } else if !ID_RE.is_match(&self.workflow_id) {
            errors.push(ValidationError::new(
                format!("workflowId {} must match {}", self.workflow_id, ID_PATTERN),
                self.positions.field("workflowId"),
            ));
        }

        if let Some(inputs) = &self.inputs {
            validate_schema(inputs, "inputs", self.positions.field("inputs"), &mut errors);
        }

        for (i, dependency) in self.depends_on.iter().enumerate() {
            let at = self.positions.item("dependsOn", i);
            if dependency.is_expression() {
                validate_source_expression(dependency, "dependsOn", document, at, &mut errors);
            } else if document.workflow(dependency.as_str()).is_none() {
                errors.push(ValidationError::new(
                    format!("dependsOn {dependency} does not reference an existing workflow"),
                    at,
                ));
            }
        }

        let mut parameters = Duplicates::new("parameter");
        for (i, parameter) in self.parameters.iter().enumerate() {
            errors.extend(parameter.validate(&scope));
            let key = resolved_parameter_key(parameter, document);
            parameters.check(key, self.positions.item("parameters", i), &mut errors);
        }

        if self.steps.is_empty() {
            errors.push(ValidationError::new("at least one step is required", self.positions.at));
        }
        let mut step_ids = Duplicates::new("stepId");
        for (i, step) in self.steps.iter().enumerate() {
            errors.extend(step.validate(&scope));
            if !step.step_id.is_empty() {
                step_ids.check(step.step_id.clone(), self.positions.item("steps", i), &mut errors);
            }
        }

        let mut actions = Duplicates::new("successAction");
        for (i, action) in self.success_actions.iter().enumerate() {
            errors.extend(action.validate(&scope));
            let key = reusable_key(action, |a| format!("{} ({})", a.name, a.type_));
            actions.check(key, self.positions.item("successActions", i), &mut errors);
        }
        let mut actions = Duplicates::new("failureAction");
        for (i, action) in self.failure_actions.iter().enumerate() {
            errors.extend(action.validate(&scope));
            let key = reusable_key(action, |a| format!("{} ({})", a.name, a.type_));
            actions.check(key, self.positions.item("failureActions", i), &mut errors);
        }

        validate_outputs(&self.outputs, &self.positions, &mut errors);

        debug!(workflow = %self.workflow_id, findings = errors.len(), "workflow validated");
        self.valid.set(errors.is_empty());
        errors
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Arazzo, FromNode, Workflow};
    use crate::cache::Caches;
    use crate::node::parse;
    use crate::validate::{Scope, Validate};
    use pretty_assertions::assert_eq;

    fn messages(yaml: &str) -> Vec<String> {
        let mut errors = Vec::new();
        let doc = Arazzo::from_node(&parse(yaml).unwrap(), &mut errors);
        assert!(errors.is_empty(), "{errors:?}");
        doc.validate(&Caches::new()).into_iter().map(|e| e.message).collect()
    }

    fn doc(workflows: &str) -> String {
        format!(
            "arazzo: 1.0.1\ninfo:\n  title: t\n  version: v\nsourceDescriptions:\n  - name: api\n    url: ./api.yaml\n    type: openapi\nworkflows:\n{workflows}"
        )
    }

    #[test]
    fn workflow_without_document_is_a_precondition_failure() {
        let caches = Caches::new();
        let workflow = Workflow::new("w");
        let errors = workflow.validate(&Scope::new(&caches));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("an Arazzo document is required to validate a workflow"));
    }

    #[test]
    fn ids_and_steps() {
        assert_eq!(
            messages(&doc("  - workflowId: bad id\n    steps: []\n")),
            vec![
                "workflowId bad id must match ^[A-Za-z0-9_\\-]+$",
                "at least one step is required",
            ]
        );
    }

    #[test]
    fn duplicate_step_ids() {
        let yaml = doc("  - workflowId: w\n    steps:\n      - stepId: s\n        operationId: a\n      - stepId: s\n        operationId: b\n");
        assert_eq!(messages(&yaml), vec!["duplicate stepId found: s"]);
    }

    #[test]
    fn depends_on() {
        let yaml = doc(concat!(
            "  - workflowId: a\n    steps:\n      - stepId: s\n        operationId: op\n",
            "  - workflowId: b\n    dependsOn:\n      - a\n      - missing\n      - $sourceDescriptions.api.flow\n      - $sourceDescriptions.other.flow\n",
            "    steps:\n      - stepId: s\n        operationId: op\n",
        ));
        assert_eq!(
            messages(&yaml),
            vec![
                "dependsOn missing does not reference an existing workflow",
                "dependsOn references unknown sourceDescription other",
            ]
        );
    }

    #[test]
    fn inputs_must_be_a_schema() {
        let yaml = doc("  - workflowId: w\n    inputs:\n      type: [1]\n    steps:\n      - stepId: s\n        operationId: op\n");
        let messages = messages(&yaml);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("inputs is not a valid JSON Schema"));
    }

    #[test]
    fn duplicate_workflow_parameters_and_actions() {
        let yaml = doc(concat!(
            "  - workflowId: w\n    parameters:\n",
            "      - name: id\n        in: query\n        value: 1\n",
            "      - name: id\n        in: query\n        value: 2\n",
            "    steps:\n      - stepId: s\n        operationId: op\n",
            "    successActions:\n",
            "      - name: done\n        type: end\n",
            "      - name: done\n        type: end\n",
        ));
        assert_eq!(
            messages(&yaml),
            vec![
                "duplicate parameter found: id (query)",
                "duplicate successAction found: done (end)",
            ]
        );
    }

    #[test]
    fn referenced_workflow_parameters_collide_with_inline_ones() {
        let yaml = doc(concat!(
            "  - workflowId: w\n    parameters:\n",
            "      - reference: $components.parameters.page\n",
            "      - name: page\n        in: query\n        value: 2\n",
            "    steps:\n      - stepId: s\n        operationId: op\n",
            "components:\n  parameters:\n    page:\n      name: page\n      in: query\n      value: 1\n",
        ));
        assert_eq!(messages(&yaml), vec!["duplicate parameter found: page (query)"]);
    }
}
