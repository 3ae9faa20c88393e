use serde_json::Value;

use super::workflow::{resolved_parameter_key, reusable_key};
use super::{
    validate_embedded, validate_outputs, validate_source_expression, validate_workflow_target, Duplicates, Scope,
    Validate, ID_PATTERN, ID_RE,
};
use crate::ast::{Arazzo, Parameter, ParameterIn, PayloadReplacement, RequestBody, SourceDescriptionType, Step};
use crate::errors::{Position, ValidationError};
use crate::expression::{extract_expressions, Expression, ExpressionError, ExpressionType};

impl Validate for Step {
    fn validate(&self, scope: &Scope<'_>) -> Vec<ValidationError> {
        let document = match scope.require_document("step", self.positions.at) {
            Ok(document) => document,
            Err(e) => return vec![e],
        };
        if let Err(e) = scope.require_workflow("step", self.positions.at) {
            return vec![e];
        }
        let scope = scope.with_step(self);
        let mut errors = Vec::new();

        if self.step_id.is_empty() {
            errors.push(ValidationError::new("stepId is required", self.positions.at));
        } else if !ID_RE.is_match(&self.step_id) {
            errors.push(ValidationError::new(
                format!("stepId {} must match {}", self.step_id, ID_PATTERN),
                self.positions.field("stepId"),
            ));
        }

        let targets = [
            self.operation_id.is_some(),
            self.operation_path.is_some(),
            self.workflow_id.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count();
        match targets {
            0 => errors.push(ValidationError::new(
                "at least one of operationId, operationPath or workflowId must be set",
                self.positions.at,
            )),
            1 => {}
            _ => errors.push(ValidationError::new(
                "only one of operationId, operationPath or workflowId can be set",
                self.positions.at,
            )),
        }

        if let Some(operation_id) = &self.operation_id {
            validate_operation_id(operation_id, document, self.positions.field("operationId"), &mut errors);
        }
        if let Some(operation_path) = &self.operation_path {
            validate_operation_path(operation_path, document, self.positions.field("operationPath"), &mut errors);
        }
        if let Some(workflow_id) = &self.workflow_id {
            validate_workflow_target(workflow_id, document, self.positions.field("workflowId"), &mut errors);
        }

        let mut parameters = Duplicates::new("parameter");
        for (i, parameter) in self.parameters.iter().enumerate() {
            errors.extend(parameter.validate(&scope));
            let key = resolved_parameter_key(parameter, document);
            parameters.check(key, self.positions.item("parameters", i), &mut errors);
        }

        if let Some(body) = &self.request_body {
            if self.workflow_id.is_some() {
                errors.push(ValidationError::new(
                    "requestBody is only allowed when the step targets an operation",
                    self.positions.field("requestBody"),
                ));
            }
            errors.extend(body.validate(&scope));
        }

        for criterion in &self.success_criteria {
            errors.extend(criterion.validate(scope.caches));
        }

        let mut actions = Duplicates::new("onSuccess action");
        for (i, action) in self.on_success.iter().enumerate() {
            errors.extend(action.validate(&scope));
            let key = reusable_key(action, |a| format!("{} ({})", a.name, a.type_));
            actions.check(key, self.positions.item("onSuccess", i), &mut errors);
        }
        let mut actions = Duplicates::new("onFailure action");
        for (i, action) in self.on_failure.iter().enumerate() {
            errors.extend(action.validate(&scope));
            let key = reusable_key(action, |a| format!("{} ({})", a.name, a.type_));
            actions.check(key, self.positions.item("onFailure", i), &mut errors);
        }

        validate_outputs(&self.outputs, &self.positions, &mut errors);

        self.valid.set(errors.is_empty());
        errors
    }
}

fn validate_operation_id(operation_id: &Expression, document: &Arazzo, at: Position, errors: &mut Vec<ValidationError>) {
    if operation_id.is_expression() {
        validate_source_expression(operation_id, "operationId", document, at, errors);
        return;
    }

    let openapi_sources = document
        .source_descriptions
        .iter()
        .filter(|s| s.source_type() == Some(SourceDescriptionType::OpenApi))
        .count();
    if openapi_sources > 1 {
        errors.push(ValidationError::new(
            "operationId must be a valid expression if there are multiple OpenAPI source descriptions",
            at,
        ));
    }
}

/// `{$sourceDescriptions.<name>.url}#<json pointer>`
fn validate_operation_path(operation_path: &str, document: &Arazzo, at: Position, errors: &mut Vec<ValidationError>) {
    let found = extract_expressions(operation_path);
    let [expression] = found.as_slice() else {
        errors.push(ValidationError::new(
            format!(
                "operationPath must be in the format {{$sourceDescriptions.<name>.url}}#<json pointer>, got {operation_path}"
            ),
            at,
        ));
        return;
    };

    let expression = Expression::new(expression.as_str());
    let parts = expression.parts();
    let is_url = parts.expression_type == Some(ExpressionType::SourceDescriptions) && parts.parts == ["url"];
    if !is_url {
        errors.push(ValidationError::new(
            format!("operationPath must reference the url of a sourceDescription, got {operation_path}"),
            at,
        ));
        return;
    }
    if parts.json_pointer.map_or(true, str::is_empty) {
        errors.push(ValidationError::new(
            format!(
                "operationPath is not valid: {}",
                ExpressionError::JsonPointerRequired {
                    expression: operation_path.to_string(),
                }
            ),
            at,
        ));
        return;
    }
    validate_source_expression(&expression, "operationPath", document, at, errors);
}

impl Validate for Parameter {
    fn validate(&self, scope: &Scope<'_>) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.name.is_empty() {
            errors.push(ValidationError::new("name is required", self.positions.at));
        }

        match (&self.in_, scope.step) {
            (Some(in_), step) => {
                if ParameterIn::parse(in_).is_none() {
                    errors.push(ValidationError::new(
                        format!("in must be one of [path, query, header, cookie], got {in_}"),
                        self.positions.field("in"),
                    ));
                }
                if step.is_some_and(|s| s.workflow_id.is_some()) {
                    errors.push(ValidationError::new(
                        "in must not be set when the step targets a workflow",
                        self.positions.field("in"),
                    ));
                }
            }
            (None, Some(step)) if step.targets_operation() => errors.push(ValidationError::new(
                "in is required when the step targets an operation",
                self.positions.at,
            )),
            (None, _) => {}
        }

        match &self.value {
            None | Some(Value::Null) => errors.push(ValidationError::new("value is required", self.positions.at)),
            Some(value) => validate_embedded(value, "value", self.positions.field("value"), &mut errors),
        }

        self.valid.set(errors.is_empty());
        errors
    }
}

impl Validate for RequestBody {
    fn validate(&self, scope: &Scope<'_>) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let Some(payload) = &self.payload {
            validate_embedded(payload, "payload", self.positions.field("payload"), &mut errors);
        }
        for replacement in &self.replacements {
            errors.extend(replacement.validate(scope));
        }

        self.valid.set(errors.is_empty());
        errors
    }
}

impl Validate for PayloadReplacement {
    fn validate(&self, _scope: &Scope<'_>) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.target.is_empty() {
            errors.push(ValidationError::new("target is required", self.positions.at));
        }
        match &self.value {
            None | Some(Value::Null) => errors.push(ValidationError::new("value is required", self.positions.at)),
            Some(value) => validate_embedded(value, "value", self.positions.field("value"), &mut errors),
        }

        self.valid.set(errors.is_empty());
        errors
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Arazzo, FromNode};
    use crate::cache::Caches;
    use crate::errors::Position;
    use crate::node::parse;
    use pretty_assertions::assert_eq;

    fn findings(yaml: &str) -> Vec<(String, Position)> {
        let mut errors = Vec::new();
        let doc = Arazzo::from_node(&parse(yaml).unwrap(), &mut errors);
        assert!(errors.is_empty(), "{errors:?}");
        doc.validate(&Caches::new())
            .into_iter()
            .map(|e| {
                let at = e.position();
                (e.message, at)
            })
            .collect()
    }

    fn messages(yaml: &str) -> Vec<String> {
        findings(yaml).into_iter().map(|(m, _)| m).collect()
    }

    fn doc(sources: &str, steps: &str) -> String {
        format!(
            "arazzo: 1.0.1\ninfo:\n  title: t\n  version: v\nsourceDescriptions:\n{sources}workflows:\n  - workflowId: w\n    steps:\n{steps}"
        )
    }

    const ONE_SOURCE: &str = "  - name: petstore\n    url: https://example.com/openapi.yaml\n    type: openapi\n";
    const TWO_SOURCES: &str = "  - name: petstore\n    url: ./pets.yaml\n    type: openapi\n  - name: users\n    url: ./users.yaml\n    type: openapi\n";

    #[test]
    fn operation_id_and_workflow_id_are_exclusive() {
        let yaml = doc(ONE_SOURCE, "      - stepId: s\n        operationId: getPet\n        workflowId: w\n");
        let findings = findings(&yaml);
        assert_eq!(
            findings,
            vec![(
                "only one of operationId, operationPath or workflowId can be set".to_string(),
                Position::new(12, 9)
            )]
        );
    }

    #[test]
    fn step_needs_a_target() {
        let yaml = doc(ONE_SOURCE, "      - stepId: s\n        description: nothing to call\n");
        assert_eq!(
            messages(&yaml),
            vec!["at least one of operationId, operationPath or workflowId must be set"]
        );
    }

    #[test]
    fn operation_id_must_be_an_expression_with_many_sources() {
        let yaml = doc(TWO_SOURCES, "      - stepId: s\n        operationId: getPet\n");
        assert_eq!(
            messages(&yaml),
            vec!["operationId must be a valid expression if there are multiple OpenAPI source descriptions"]
        );

        let yaml = doc(TWO_SOURCES, "      - stepId: s\n        operationId: $sourceDescriptions.petstore.getPet\n");
        assert!(messages(&yaml).is_empty());

        let yaml = doc(TWO_SOURCES, "      - stepId: s\n        operationId: $sourceDescriptions.orders.getOrder\n");
        assert_eq!(
            messages(&yaml),
            vec!["operationId references unknown sourceDescription orders"]
        );
    }

    #[test]
    fn operation_path() {
        let ok = doc(
            ONE_SOURCE,
            "      - stepId: s\n        operationPath: '{$sourceDescriptions.petstore.url}#/paths/~1pets/get'\n",
        );
        assert!(messages(&ok).is_empty());

        let no_pointer = doc(
            ONE_SOURCE,
            "      - stepId: s\n        operationPath: '{$sourceDescriptions.petstore.url}'\n",
        );
        assert!(messages(&no_pointer)[0].starts_with("operationPath is not valid: a json pointer is required in current context"));

        let not_url = doc(
            ONE_SOURCE,
            "      - stepId: s\n        operationPath: '{$sourceDescriptions.petstore.getPet}#/paths'\n",
        );
        assert!(messages(&not_url)[0].starts_with("operationPath must reference the url"));

        let literal = doc(ONE_SOURCE, "      - stepId: s\n        operationPath: /paths/pets\n");
        assert!(messages(&literal)[0].starts_with("operationPath must be in the format"));

        let unknown = doc(
            ONE_SOURCE,
            "      - stepId: s\n        operationPath: '{$sourceDescriptions.users.url}#/paths/~1users/get'\n",
        );
        assert_eq!(
            messages(&unknown),
            vec!["operationPath references unknown sourceDescription users"]
        );
    }

    #[test]
    fn workflow_id_targets() {
        let yaml = doc(ONE_SOURCE, "      - stepId: s\n        workflowId: nowhere\n");
        assert_eq!(messages(&yaml), vec!["workflowId nowhere does not exist"]);

        let yaml = doc(ONE_SOURCE, "      - stepId: s\n        workflowId: $sourceDescriptions.petstore.flow\n");
        assert!(messages(&yaml).is_empty());
    }

    #[test]
    fn parameter_location_rules() {
        let yaml = doc(
            ONE_SOURCE,
            concat!(
                "      - stepId: call\n        operationId: getPet\n        parameters:\n",
                "          - name: id\n            value: $inputs.id\n",
                "          - name: trace\n            in: body\n            value: x\n",
                "      - stepId: nested\n        workflowId: w\n        parameters:\n",
                "          - name: id\n            in: query\n            value: 1\n",
            ),
        );
        assert_eq!(
            messages(&yaml),
            vec![
                "in is required when the step targets an operation",
                "in must be one of [path, query, header, cookie], got body",
                "in must not be set when the step targets a workflow",
            ]
        );
    }

    #[test]
    fn parameter_value_is_required_and_checked() {
        let yaml = doc(
            ONE_SOURCE,
            concat!(
                "      - stepId: call\n        operationId: getPet\n        parameters:\n",
                "          - name: id\n            in: path\n",
                "          - name: q\n            in: query\n            value: $inputs\n",
            ),
        );
        let messages = messages(&yaml);
        assert_eq!(messages[0], "value is required");
        assert!(messages[1].starts_with("value is not valid: expression is not valid, expected name after $inputs"));
    }

    #[test]
    fn duplicate_parameters_resolve_references() {
        let yaml = format!(
            "{}components:\n  parameters:\n    id:\n      name: id\n      in: path\n      value: 1\n",
            doc(
                ONE_SOURCE,
                concat!(
                    "      - stepId: call\n        operationId: getPet\n        parameters:\n",
                    "          - name: id\n            in: path\n            value: 2\n",
                    "          - reference: $components.parameters.id\n",
                ),
            )
        );
        assert_eq!(messages(&yaml), vec!["duplicate parameter found: id (path)"]);
    }

    #[test]
    fn request_body_rules() {
        let yaml = doc(
            ONE_SOURCE,
            concat!(
                "      - stepId: call\n        operationId: addPet\n        requestBody:\n",
                "          contentType: application/json\n",
                "          payload: '{\"name\": \"{$inputs.name}\", \"owner\": \"{$unknown.owner}\"}'\n",
                "          replacements:\n            - target: /name\n              value: $inputs.name\n            - value: x\n",
                "      - stepId: nested\n        workflowId: w\n        requestBody:\n          payload: {}\n",
            ),
        );
        let messages = messages(&yaml);
        assert_eq!(messages.len(), 3, "{messages:?}");
        assert!(messages[0].starts_with("payload is not valid"));
        assert_eq!(messages[1], "target is required");
        assert_eq!(messages[2], "requestBody is only allowed when the step targets an operation");
    }

    #[test]
    fn success_criteria_are_validated() {
        let yaml = doc(
            ONE_SOURCE,
            "      - stepId: s\n        operationId: getPet\n        successCriteria:\n          - condition: $statusCode\n",
        );
        assert_eq!(
            messages(&yaml),
            vec!["condition must at least be in the format [expression] [operator] [value]"]
        );
    }

    #[test]
    fn step_outputs() {
        let yaml = doc(
            ONE_SOURCE,
            "      - stepId: s\n        operationId: getPet\n        outputs:\n          pet id: $response.body\n",
        );
        assert!(messages(&yaml)[0].starts_with("output name pet id must match"));
    }
}
