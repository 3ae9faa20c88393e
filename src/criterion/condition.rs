//! Simple criterion conditions: `<expression> <operator> <value>`

use std::fmt;

use thiserror::Error;

use crate::expression::{Expression, ExpressionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Equal,
    NotEqual,
    Not,
    And,
    Or,
}

impl Operator {
    pub const ALL: [Operator; 9] = [
        Operator::LessThan,
        Operator::LessThanOrEqual,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqual,
        Operator::Equal,
        Operator::NotEqual,
        Operator::Not,
        Operator::And,
        Operator::Or,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Not => "!",
            Operator::And => "&&",
            Operator::Or => "||",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("condition must at least be in the format [expression] [operator] [value]")]
    Format,

    #[error("condition operator must be one of [<, <=, >, >=, ==, !=, !, &&, ||], got {0}")]
    UnknownOperator(String),

    #[error("condition value containing spaces must be quoted: {0}")]
    UnquotedValue(String),

    #[error("condition value is required")]
    EmptyValue,

    #[error("condition expression is not valid: {0}")]
    Expression(#[from] ExpressionError),
}

/// A parsed comparison. The value keeps its quotes when it had them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub expression: Expression,
    pub operator: Operator,
    pub value: String,
}

/// Parse a raw condition string.
///
/// Returns `Ok(None)` for strings that are not conditions at all: anything not
/// starting with `$`, and compound conditions containing `&` or `|`, which are
/// accepted unparsed.
pub fn new_condition(raw: &str) -> Result<Option<Condition>, ConditionError> {
    if raw.contains(['&', '|']) {
        return Ok(None);
    }
    if !raw.starts_with('$') {
        return Ok(None);
    }

    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(ConditionError::Format);
    }

    let operator = Operator::parse(tokens[1])
        .ok_or_else(|| ConditionError::UnknownOperator(tokens[1].to_string()))?;

    let value = tokens[2..].join(" ");
    if tokens.len() > 3 && !is_quoted(&value) {
        return Err(ConditionError::UnquotedValue(value));
    }

    Ok(Some(Condition {
        expression: Expression::new(tokens[0]),
        operator,
        value,
    }))
}

fn is_quoted(value: &str) -> bool {
    value.len() >= 2
        && ((value.starts_with('\'') && value.ends_with('\''))
            || (value.starts_with('"') && value.ends_with('"')))
}

impl Condition {
    pub fn validate(&self) -> Result<(), ConditionError> {
        self.expression.validate()?;
        let unquoted = if is_quoted(&self.value) {
            &self.value[1..self.value.len() - 1]
        } else {
            self.value.as_str()
        };
        if unquoted.is_empty() {
            return Err(ConditionError::EmptyValue);
        }
        Ok(())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.expression, self.operator, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_comparison() {
        let condition = new_condition("$statusCode == 200").unwrap().unwrap();
        assert_eq!(condition.expression, Expression::new("$statusCode"));
        assert_eq!(condition.operator, Operator::Equal);
        assert_eq!(condition.value, "200");
        assert!(condition.validate().is_ok());
    }

    #[test]
    fn expression_alone_is_a_format_error() {
        let err = new_condition("$statusCode").unwrap_err();
        assert_eq!(
            err.to_string(),
            "condition must at least be in the format [expression] [operator] [value]"
        );
    }

    #[test]
    fn raw_values_are_not_conditions() {
        assert_eq!(new_condition("some raw value"), Ok(None));
        assert_eq!(new_condition(""), Ok(None));
    }

    #[test]
    fn compound_conditions_are_deferred() {
        assert_eq!(new_condition("$statusCode == 200 && $response.body#/ok == true"), Ok(None));
        assert_eq!(new_condition("$statusCode == 200 || $statusCode == 201"), Ok(None));
    }

    #[test]
    fn quoted_values_with_spaces_are_rejoined() {
        let condition = new_condition("$response.body#/name == 'Fluffy  Cat'").unwrap().unwrap();
        assert_eq!(condition.value, "'Fluffy Cat'");

        let condition = new_condition(r#"$inputs.greeting != "hello world""#).unwrap().unwrap();
        assert_eq!(condition.value, "\"hello world\"");
    }

    #[test]
    fn unquoted_values_with_spaces_are_rejected() {
        assert_eq!(
            new_condition("$inputs.name == Fluffy Cat"),
            Err(ConditionError::UnquotedValue("Fluffy Cat".to_string()))
        );
        assert!(new_condition("$inputs.name == 'Fluffy Cat\"").is_err());
    }

    #[test]
    fn every_operator_parses() {
        // && and || are only reachable through Operator::parse; the raw
        // string would be treated as compound
        for op in Operator::ALL.into_iter().filter(|op| !matches!(op, Operator::And | Operator::Or)) {
            let raw = format!("$statusCode {op} 200");
            assert_eq!(new_condition(&raw).map(|c| c.map(|c| c.operator)), Ok(Some(op)));
        }
        assert_eq!(Operator::parse("&&"), Some(Operator::And));
        assert_eq!(
            new_condition("$statusCode === 200"),
            Err(ConditionError::UnknownOperator("===".to_string()))
        );
    }

    #[test]
    fn validate_checks_expression_and_value() {
        let condition = new_condition("$unknown.thing == 1").unwrap().unwrap();
        assert!(matches!(condition.validate(), Err(ConditionError::Expression(_))));

        let condition = new_condition("$statusCode == ''").unwrap().unwrap();
        assert_eq!(condition.validate(), Err(ConditionError::EmptyValue));
    }
}
