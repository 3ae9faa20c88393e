//! Success/failure criteria
//!
//! A criterion is a condition checked with one of four strategies:
//! - `simple`: `<expression> <operator> <value>` comparisons (the default)
//! - `regex`: the condition is a regular expression applied to `context`
//! - `jsonpath`: the condition is a JSONPath query applied to `context`
//! - `xpath`: the condition is an XPath expression (version checked only)

pub mod condition;
pub mod jsonpath;

use std::cell::Cell;
use std::fmt;

use serde::Serialize;

use crate::ast::decode::{Extensions, Fields, FromNode};
use crate::cache::Caches;
use crate::errors::ValidationError;
use crate::expression::Expression;
use crate::node::{Node, NodeKind, Positions};

pub use condition::{new_condition, Condition, ConditionError, Operator};

pub const JSONPATH_VERSIONS: [&str; 1] = ["draft-goessner-dispatch-jsonpath-00"];
pub const XPATH_VERSIONS: [&str; 3] = ["xpath-10", "xpath-20", "xpath-30"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriterionType {
    Simple,
    Regex,
    JsonPath,
    XPath,
}

impl CriterionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CriterionType::Simple => "simple",
            CriterionType::Regex => "regex",
            CriterionType::JsonPath => "jsonpath",
            CriterionType::XPath => "xpath",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "simple" => Some(CriterionType::Simple),
            "regex" => Some(CriterionType::Regex),
            "jsonpath" => Some(CriterionType::JsonPath),
            "xpath" => Some(CriterionType::XPath),
            _ => None,
        }
    }
}

impl fmt::Display for CriterionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{type, version}` form of a criterion type
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CriterionExpressionType {
    #[serde(rename = "type")]
    pub type_: String,
    pub version: String,
    #[serde(flatten)]
    pub extensions: Extensions,
    #[serde(skip)]
    pub positions: Positions,
}

impl CriterionExpressionType {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let (field, versions) = match CriterionType::parse(&self.type_) {
            Some(CriterionType::JsonPath) => ("jsonpath", &JSONPATH_VERSIONS[..]),
            Some(CriterionType::XPath) => ("xpath", &XPATH_VERSIONS[..]),
            // version only applies to jsonpath and xpath; unknown types are
            // reported by the owning criterion
            Some(CriterionType::Simple | CriterionType::Regex) | None => return errors,
        };
        if self.version.is_empty() {
            errors.push(ValidationError::new(
                "version is required",
                self.positions.at,
            ));
        } else if !versions.contains(&self.version.as_str()) {
            errors.push(ValidationError::new(
                format!(
                    "version of {} must be one of [{}], got {}",
                    field,
                    versions.join(", "),
                    self.version
                ),
                self.positions.field("version"),
            ));
        }
        errors
    }
}

/// Either a bare type tag or the structured `{type, version}` form
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CriterionTypeUnion {
    Type(String),
    ExpressionType(CriterionExpressionType),
}

impl From<CriterionType> for CriterionTypeUnion {
    fn from(type_: CriterionType) -> Self {
        CriterionTypeUnion::Type(type_.as_str().to_string())
    }
}

impl CriterionTypeUnion {
    pub fn type_name(&self) -> &str {
        match self {
            CriterionTypeUnion::Type(t) => t,
            CriterionTypeUnion::ExpressionType(t) => &t.type_,
        }
    }

    pub fn criterion_type(&self) -> Option<CriterionType> {
        CriterionType::parse(self.type_name())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Criterion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Expression>,
    pub condition: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<CriterionTypeUnion>,
    #[serde(flatten)]
    pub extensions: Extensions,
    #[serde(skip)]
    pub positions: Positions,
    #[serde(skip)]
    pub(crate) valid: Cell<bool>,
}

impl Criterion {
    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<Expression>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_type(mut self, type_: impl Into<CriterionTypeUnion>) -> Self {
        self.type_ = Some(type_.into());
        self
    }

    /// Effective strategy; unset means `simple`
    pub fn criterion_type(&self) -> Option<CriterionType> {
        match &self.type_ {
            None => Some(CriterionType::Simple),
            Some(t) => t.criterion_type(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }

    pub fn validate(&self, caches: &Caches) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.condition.is_empty() {
            errors.push(ValidationError::new("condition is required", self.positions.at));
        }

        match (&self.type_, &self.context) {
            (Some(_), None) => errors.push(ValidationError::new(
                "context is required, if type is set",
                self.positions.at,
            )),
            (_, Some(context)) => {
                if let Err(e) = context.validate() {
                    errors.push(ValidationError::new(
                        format!("context is not valid: {e}"),
                        self.positions.field("context"),
                    ));
                }
            }
            (None, None) => {}
        }

        if let Some(CriterionTypeUnion::ExpressionType(t)) = &self.type_ {
            errors.extend(t.validate());
        }

        let at = self.positions.field("condition");
        match self.criterion_type() {
            Some(CriterionType::Simple) => match new_condition(&self.condition) {
                Ok(Some(condition)) => {
                    if let Err(e) = condition.validate() {
                        errors.push(ValidationError::new(e.to_string(), at));
                    }
                }
                Ok(None) => {}
                Err(e) => errors.push(ValidationError::new(e.to_string(), at)),
            },
            Some(CriterionType::Regex) => {
                if let Err(e) = caches.compile_regex(&self.condition) {
                    errors.push(ValidationError::new(format!("invalid regex condition: {e}"), at));
                }
            }
            Some(CriterionType::JsonPath) => {
                if let Err(e) = caches.check_jsonpath(&self.condition) {
                    errors.push(ValidationError::new(format!("invalid jsonpath condition: {e}"), at));
                }
            }
            // XPath syntax is not checked
            Some(CriterionType::XPath) => {}
            None => {
                let type_name = self.type_.as_ref().map(|t| t.type_name()).unwrap_or_default();
                errors.push(ValidationError::new(
                    format!("type must be one of [simple, regex, jsonpath, xpath], got {type_name}"),
                    self.positions.field("type"),
                ));
            }
        }

        self.valid.set(errors.is_empty());
        errors
    }
}

impl FromNode for CriterionExpressionType {
    fn from_node(node: &Node, errors: &mut Vec<ValidationError>) -> Self {
        let mut fields = Fields::new(node, "criterion type", errors);
        let type_ = fields.required_string("type");
        let version = fields.required_string("version");
        let (positions, extensions) = fields.finish();
        Self {
            type_,
            version,
            extensions,
            positions,
        }
    }
}

impl FromNode for Criterion {
    fn from_node(node: &Node, errors: &mut Vec<ValidationError>) -> Self {
        let mut fields = Fields::new(node, "criterion", errors);
        let context = fields.expression("context");
        let condition = fields.required_string("condition");
        let type_ = match node.get("type") {
            Some(t) if t.kind == NodeKind::Mapping => fields
                .child::<CriterionExpressionType>("type")
                .map(CriterionTypeUnion::ExpressionType),
            _ => fields.string("type").map(CriterionTypeUnion::Type),
        };
        let (positions, extensions) = fields.finish();
        Self {
            context,
            condition,
            type_,
            extensions,
            positions,
            valid: Cell::new(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::parse;

    fn decode(yaml: &str) -> Criterion {
        let mut errors = Vec::new();
        let criterion = Criterion::from_node(&parse(yaml).unwrap(), &mut errors);
        assert!(errors.is_empty(), "{errors:?}");
        criterion
    }

    fn messages(criterion: &Criterion) -> Vec<String> {
        criterion
            .validate(&Caches::new())
            .into_iter()
            .map(|e| e.message)
            .collect()
    }

    #[test]
    fn simple_condition_without_type() {
        let criterion = decode("condition: $statusCode == 200\n");
        assert!(messages(&criterion).is_empty());
        assert!(criterion.is_valid());
        assert_eq!(criterion.criterion_type(), Some(CriterionType::Simple));
    }

    #[test]
    fn simple_condition_format_error() {
        let criterion = decode("condition: $statusCode\n");
        assert_eq!(
            messages(&criterion),
            vec!["condition must at least be in the format [expression] [operator] [value]"]
        );
        assert!(!criterion.is_valid());
    }

    #[test]
    fn invalid_regex() {
        let criterion = decode("context: $response.body\ncondition: '[invalid'\ntype:\n  type: regex\n");
        let msgs = messages(&criterion);
        assert_eq!(msgs.len(), 1, "{msgs:?}");
        assert!(msgs[0].starts_with("invalid regex condition"));
    }

    #[test]
    fn structured_simple_and_regex_ignore_version() {
        let criterion = decode("context: $statusCode
condition: '^2'
type:
  type: regex
  version: anything
");
        assert!(messages(&criterion).is_empty());

        let criterion = decode("context: $statusCode
condition: $statusCode == 200
type:
  type: simple
");
        assert!(messages(&criterion).is_empty());
    }

    #[test]
    fn structured_unknown_type_is_reported_once() {
        let criterion = decode("context: $response.body
condition: x
type:
  type: fuzzy
  version: v1
");
        assert_eq!(
            messages(&criterion),
            vec!["type must be one of [simple, regex, jsonpath, xpath], got fuzzy"]
        );
    }

    #[test]
    fn regex_tag() {
        let criterion = decode("context: $statusCode\ncondition: '^2\\d\\d$'\ntype: regex\n");
        assert!(messages(&criterion).is_empty());
    }

    #[test]
    fn invalid_jsonpath() {
        let criterion = decode(
            "context: $response.body\ncondition: $[invalid jsonpath\ntype:\n  type: jsonpath\n  version: draft-goessner-dispatch-jsonpath-00\n",
        );
        let msgs = messages(&criterion);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].starts_with("invalid jsonpath condition"));
    }

    #[test]
    fn valid_jsonpath() {
        let criterion = decode(
            "context: $response.body\ncondition: $.pets[?(@.name == 'Fluffy Cat')]\ntype: jsonpath\n",
        );
        assert!(messages(&criterion).is_empty());
    }

    #[test]
    fn type_requires_context() {
        let criterion = decode("condition: $.pets\ntype: jsonpath\n");
        assert_eq!(messages(&criterion), vec!["context is required, if type is set"]);
    }

    #[test]
    fn context_must_be_a_valid_expression() {
        let criterion = decode("context: $inputs\ncondition: $.a\ntype: jsonpath\n");
        let msgs = messages(&criterion);
        assert!(msgs[0].starts_with("context is not valid"));
    }

    #[test]
    fn unsupported_versions() {
        let criterion = decode(
            "context: $response.body\ncondition: $.a\ntype:\n  type: jsonpath\n  version: rfc9535\n",
        );
        assert_eq!(
            messages(&criterion),
            vec!["version of jsonpath must be one of [draft-goessner-dispatch-jsonpath-00], got rfc9535"]
        );

        let criterion = decode(
            "context: $response.body\ncondition: //pet\ntype:\n  type: xpath\n  version: xpath-40\n",
        );
        assert_eq!(
            messages(&criterion),
            vec!["version of xpath must be one of [xpath-10, xpath-20, xpath-30], got xpath-40"]
        );
    }

    #[test]
    fn structured_type_needs_version() {
        let criterion = decode("context: $response.body\ncondition: //pet\ntype:\n  type: xpath\n");
        assert_eq!(messages(&criterion), vec!["version is required"]);
    }

    #[test]
    fn xpath_syntax_is_not_checked() {
        let criterion = decode(
            "context: $response.body\ncondition: '((('\ntype:\n  type: xpath\n  version: xpath-30\n",
        );
        assert!(messages(&criterion).is_empty());
    }

    #[test]
    fn unknown_type() {
        let criterion = decode("context: $response.body\ncondition: x\ntype: fuzzy\n");
        assert_eq!(
            messages(&criterion),
            vec!["type must be one of [simple, regex, jsonpath, xpath], got fuzzy"]
        );
    }

    #[test]
    fn missing_condition() {
        let criterion = Criterion::default();
        assert_eq!(messages(&criterion), vec!["condition is required"]);
    }

    #[test]
    fn builder_and_serialize() {
        let criterion = Criterion::new("$.ok")
            .with_context("$response.body")
            .with_type(CriterionTypeUnion::Type("jsonpath".to_string()));
        let json = serde_json::to_value(&criterion).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"context": "$response.body", "condition": "$.ok", "type": "jsonpath"})
        );
    }
}
