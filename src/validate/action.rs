use std::convert::Infallible;

use tracing::debug;

use super::{validate_workflow_target, Scope, Validate};
use crate::ast::{ActionType, Arazzo, Component, FailureAction, Reusable, Step, SuccessAction};
use crate::criterion::Criterion;
use crate::errors::ValidationError;
use crate::expression::{Expression, ExpressionType};
use crate::node::Positions;
use crate::walk::{walk_with, Flow, Matcher, WalkItem};

/// Fields shared by success and failure actions
struct ActionFields<'a> {
    name: &'a str,
    type_: &'a str,
    workflow_id: Option<&'a Expression>,
    step_id: Option<&'a str>,
    criteria: &'a [Criterion],
    positions: &'a Positions,
}

impl Validate for SuccessAction {
    fn validate(&self, scope: &Scope<'_>) -> Vec<ValidationError> {
        let fields = ActionFields {
            name: &self.name,
            type_: &self.type_,
            workflow_id: self.workflow_id.as_ref(),
            step_id: self.step_id.as_deref(),
            criteria: &self.criteria,
            positions: &self.positions,
        };
        let errors = validate_action::<SuccessAction>(&fields, &[ActionType::End, ActionType::Goto], scope);
        self.valid.set(errors.is_empty());
        errors
    }
}

impl Validate for FailureAction {
    fn validate(&self, scope: &Scope<'_>) -> Vec<ValidationError> {
        let fields = ActionFields {
            name: &self.name,
            type_: &self.type_,
            workflow_id: self.workflow_id.as_ref(),
            step_id: self.step_id.as_deref(),
            criteria: &self.criteria,
            positions: &self.positions,
        };
        let mut errors = validate_action::<FailureAction>(
            &fields,
            &[ActionType::End, ActionType::Retry, ActionType::Goto],
            scope,
        );

        let is_retry = self.action_type() == Some(ActionType::Retry);
        if let Some(retry_after) = self.retry_after {
            let at = self.positions.field("retryAfter");
            if !is_retry {
                errors.push(ValidationError::new("retryAfter is only allowed when type is retry", at));
            } else if retry_after < 0.0 {
                errors.push(ValidationError::new("retryAfter must be non-negative", at));
            }
        }
        if let Some(retry_limit) = self.retry_limit {
            let at = self.positions.field("retryLimit");
            if !is_retry {
                errors.push(ValidationError::new("retryLimit is only allowed when type is retry", at));
            } else if retry_limit < 0 {
                errors.push(ValidationError::new("retryLimit must be non-negative", at));
            }
        }

        self.valid.set(errors.is_empty());
        errors
    }
}

/// Which actions list of a step a component action can be referenced from
trait StepActions: Component {
    fn referenced_by(step: &Step, name: &str) -> bool;
}

impl StepActions for SuccessAction {
    fn referenced_by(step: &Step, name: &str) -> bool {
        step.on_success.iter().any(|a| references(a, Self::KIND, name))
    }
}

impl StepActions for FailureAction {
    fn referenced_by(step: &Step, name: &str) -> bool {
        step.on_failure.iter().any(|a| references(a, Self::KIND, name))
    }
}

fn references<T>(reusable: &Reusable<T>, kind: &str, name: &str) -> bool {
    reusable.as_reference().is_some_and(|reference| {
        let parts = reference.parts();
        parts.expression_type == Some(ExpressionType::Components)
            && parts.reference == kind
            && parts.parts.join(".") == name
    })
}

fn validate_action<T: StepActions>(
    action: &ActionFields<'_>,
    allowed: &[ActionType],
    scope: &Scope<'_>,
) -> Vec<ValidationError> {
    let positions = action.positions;
    let document = match scope.require_document("action", positions.at) {
        Ok(document) => document,
        Err(e) => return vec![e],
    };
    let mut errors = Vec::new();

    if action.name.is_empty() {
        errors.push(ValidationError::new("name is required", positions.at));
    }

    let action_type = ActionType::parse(action.type_).filter(|t| allowed.contains(t));
    if action.type_.is_empty() {
        errors.push(ValidationError::new("type is required", positions.at));
    } else if action_type.is_none() {
        let allowed: Vec<&str> = allowed.iter().map(ActionType::as_str).collect();
        errors.push(ValidationError::new(
            format!("type must be one of [{}], got {}", allowed.join(", "), action.type_),
            positions.field("type"),
        ));
    }

    let both = action.workflow_id.is_some() && action.step_id.is_some();
    let neither = action.workflow_id.is_none() && action.step_id.is_none();
    match action_type {
        Some(ActionType::End) if !neither => errors.push(ValidationError::new(
            "workflowId and stepId must not be set when type is end",
            positions.at,
        )),
        Some(ActionType::Goto) if neither => errors.push(ValidationError::new(
            "one of workflowId or stepId must be set when type is goto",
            positions.at,
        )),
        Some(ActionType::Goto | ActionType::Retry) if both => errors.push(ValidationError::new(
            "workflowId and stepId are mutually exclusive, only one can be set",
            positions.at,
        )),
        _ => {}
    }

    if let Some(workflow_id) = action.workflow_id {
        validate_workflow_target(workflow_id, document, positions.field("workflowId"), &mut errors);
    }
    if let Some(step_id) = action.step_id {
        let at = positions.field("stepId");
        match (scope.workflow, scope.component) {
            (Some(workflow), _) => {
                if workflow.step(step_id).is_none() {
                    errors.push(ValidationError::new(
                        format!("stepId {} does not exist in workflow {}", step_id, workflow.workflow_id),
                        at,
                    ));
                }
            }
            (None, Some(component)) => {
                if !step_reachable::<T>(document, component, step_id) {
                    errors.push(ValidationError::new(
                        format!(
                            "stepId {} does not exist in any workflow referencing $components.{}.{}",
                            step_id,
                            T::KIND,
                            component
                        ),
                        at,
                    ));
                }
            }
            (None, None) => errors.push(ValidationError::new(
                format!("stepId {step_id} cannot be resolved outside of a workflow"),
                at,
            )),
        }
    }

    for criterion in action.criteria {
        errors.extend(criterion.validate(scope.caches));
    }

    errors
}

/// Finds a step that uses a component action and has a sibling with the target id
struct StepTargetFinder<'n, T> {
    component: &'n str,
    step_id: &'n str,
    found: bool,
    kind: std::marker::PhantomData<T>,
}

impl<'a, T: StepActions> Matcher<'a> for StepTargetFinder<'_, T> {
    type Error = Infallible;

    fn step(&mut self, step: &'a Step, item: &WalkItem<'a>) -> Result<Flow, Self::Error> {
        if !T::referenced_by(step, self.component) {
            return Ok(Flow::Continue);
        }
        if item.workflow().is_some_and(|w| w.step(self.step_id).is_some()) {
            self.found = true;
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    }
}

fn step_reachable<T: StepActions>(document: &Arazzo, component: &str, step_id: &str) -> bool {
    let mut finder = StepTargetFinder::<T> {
        component,
        step_id,
        found: false,
        kind: std::marker::PhantomData,
    };
    walk_with(document, &mut finder).unwrap_or_else(|never| match never {});
    debug!(component, step_id, found = finder.found, "resolved component action target");
    finder.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FromNode;
    use crate::cache::Caches;
    use crate::node::parse;
    use pretty_assertions::assert_eq;

    fn messages(yaml: &str) -> Vec<String> {
        let mut errors = Vec::new();
        let doc = Arazzo::from_node(&parse(yaml).unwrap(), &mut errors);
        assert!(errors.is_empty(), "{errors:?}");
        doc.validate(&Caches::new()).into_iter().map(|e| e.message).collect()
    }

    fn doc(step_extra: &str, tail: &str) -> String {
        format!(
            "arazzo: 1.0.1\ninfo:\n  title: t\n  version: v\nsourceDescriptions:\n  - name: api\n    url: ./api.yaml\nworkflows:\n  - workflowId: w\n    steps:\n      - stepId: first\n        operationId: a\n{step_extra}      - stepId: second\n        operationId: b\n{tail}"
        )
    }

    #[test]
    fn action_type_rules() {
        let yaml = doc(
            concat!(
                "        onSuccess:\n",
                "          - name: stop\n            type: end\n            stepId: second\n",
                "          - name: jump\n            type: goto\n",
                "          - name: again\n            type: retry\n",
                "        onFailure:\n",
                "          - name: both\n            type: goto\n            stepId: second\n            workflowId: w\n",
                "          - name: wait\n            type: goto\n            stepId: second\n            retryAfter: 2\n",
                "          - name: later\n            type: retry\n            retryAfter: -1\n            retryLimit: -2\n",
            ),
            "",
        );
        assert_eq!(
            messages(&yaml),
            vec![
                "workflowId and stepId must not be set when type is end",
                "one of workflowId or stepId must be set when type is goto",
                "type must be one of [end, goto], got retry",
                "workflowId and stepId are mutually exclusive, only one can be set",
                "retryAfter is only allowed when type is retry",
                "retryAfter must be non-negative",
                "retryLimit must be non-negative",
            ]
        );
    }

    #[test]
    fn step_targets_resolve_in_enclosing_workflow() {
        let yaml = doc(
            "        onSuccess:\n          - name: next\n            type: goto\n            stepId: third\n",
            "",
        );
        assert_eq!(messages(&yaml), vec!["stepId third does not exist in workflow w"]);
    }

    #[test]
    fn workflow_targets() {
        let yaml = doc(
            "        onFailure:\n          - name: other\n            type: goto\n            workflowId: elsewhere\n",
            "",
        );
        assert_eq!(messages(&yaml), vec!["workflowId elsewhere does not exist"]);
    }

    #[test]
    fn component_actions_resolve_through_referencing_steps() {
        let components = concat!(
            "components:\n  successActions:\n",
            "    toSecond:\n      name: toSecond\n      type: goto\n      stepId: second\n",
            "    toNowhere:\n      name: toNowhere\n      type: goto\n      stepId: nowhere\n",
            "    unused:\n      name: unused\n      type: goto\n      stepId: second\n",
        );
        let yaml = doc(
            concat!(
                "        onSuccess:\n",
                "          - reference: $components.successActions.toSecond\n",
                "          - reference: $components.successActions.toNowhere\n",
            ),
            components,
        );
        assert_eq!(
            messages(&yaml),
            vec![
                "stepId nowhere does not exist in any workflow referencing $components.successActions.toNowhere",
                "stepId second does not exist in any workflow referencing $components.successActions.unused",
            ]
        );
    }

    #[test]
    fn duplicate_step_actions() {
        let yaml = doc(
            concat!(
                "        onSuccess:\n",
                "          - name: done\n            type: end\n",
                "          - name: done\n            type: end\n",
            ),
            "",
        );
        assert_eq!(messages(&yaml), vec!["duplicate onSuccess action found: done (end)"]);
    }

    #[test]
    fn criteria_are_validated() {
        let yaml = doc(
            concat!(
                "        onFailure:\n",
                "          - name: retry\n            type: retry\n            criteria:\n",
                "              - condition: $statusCode\n",
            ),
            "",
        );
        assert_eq!(
            messages(&yaml),
            vec!["condition must at least be in the format [expression] [operator] [value]"]
        );
    }
}
