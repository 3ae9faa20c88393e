//! Node tree → typed model
//!
//! Decoding never fails. Shape mismatches become position-tagged findings and
//! the offending field is left unset, so a partly broken document still yields
//! a model that can be validated, repaired and re-serialized.

use indexmap::IndexMap;
use serde_json::Value;

use crate::errors::ValidationError;
use crate::expression::Expression;
use crate::node::{Node, NodeKind, Positions};

/// `x-` extensions, in document order
pub type Extensions = IndexMap<String, Value>;

pub trait FromNode: Sized {
    fn from_node(node: &Node, errors: &mut Vec<ValidationError>) -> Self;
}

pub(crate) fn mismatch(what: &str, expected: NodeKind, node: &Node) -> ValidationError {
    ValidationError::new(
        format!(
            "expected a {} for {}, got {}",
            expected.as_str(),
            what,
            node.kind.as_str()
        ),
        node.position(),
    )
}

/// Field reader over one mapping node
pub struct Fields<'n, 'e> {
    node: &'n Node,
    what: &'static str,
    errors: &'e mut Vec<ValidationError>,
    positions: Positions,
}

impl<'n, 'e> Fields<'n, 'e> {
    pub fn new(node: &'n Node, what: &'static str, errors: &'e mut Vec<ValidationError>) -> Self {
        if node.kind != NodeKind::Mapping && !node.is_null() {
            errors.push(mismatch(what, NodeKind::Mapping, node));
        }
        Self {
            node,
            what,
            errors,
            positions: Positions::new(node.position()),
        }
    }

    /// Value node for `key`, recording its position. Explicit nulls count as absent.
    fn lookup(&mut self, key: &str) -> Option<&'n Node> {
        let value = self.node.get(key)?;
        self.positions.record(key, value.position());
        (!value.is_null()).then_some(value)
    }

    fn scalar(&mut self, key: &str) -> Option<&'n Node> {
        let value = self.lookup(key)?;
        if value.is_scalar() {
            Some(value)
        } else {
            self.errors.push(mismatch(&format!("{}.{}", self.what, key), NodeKind::Scalar, value));
            None
        }
    }

    pub fn string(&mut self, key: &str) -> Option<String> {
        self.scalar(key).map(|n| n.value.clone())
    }

    /// Required strings decode to empty when missing; validation reports them
    pub fn required_string(&mut self, key: &str) -> String {
        self.string(key).unwrap_or_default()
    }

    pub fn expression(&mut self, key: &str) -> Option<Expression> {
        self.string(key).map(Expression::new)
    }

    pub fn integer(&mut self, key: &str) -> Option<i64> {
        let node = self.scalar(key)?;
        match node.value.parse::<i64>() {
            Ok(n) => Some(n),
            Err(_) => {
                self.errors.push(ValidationError::new(
                    format!("{}.{} must be an integer, got {}", self.what, key, node.value),
                    node.position(),
                ));
                None
            }
        }
    }

    pub fn number(&mut self, key: &str) -> Option<f64> {
        let node = self.scalar(key)?;
        match node.value.parse::<f64>() {
            Ok(n) => Some(n),
            Err(_) => {
                self.errors.push(ValidationError::new(
                    format!("{}.{} must be a number, got {}", self.what, key, node.value),
                    node.position(),
                ));
                None
            }
        }
    }

    /// Any value, converted to JSON
    pub fn value(&mut self, key: &str) -> Option<Value> {
        let node = self.node.get(key)?;
        self.positions.record(key, node.position());
        Some(node.to_json())
    }

    pub fn child<T: FromNode>(&mut self, key: &str) -> Option<T> {
        let node = self.lookup(key)?;
        Some(T::from_node(node, self.errors))
    }

    fn sequence(&mut self, key: &str) -> &'n [Node] {
        let Some(node) = self.lookup(key) else {
            return &[];
        };
        if node.kind != NodeKind::Sequence {
            self.errors.push(mismatch(&format!("{}.{}", self.what, key), NodeKind::Sequence, node));
            return &[];
        }
        for (i, item) in node.items.iter().enumerate() {
            self.positions.record(format!("{key}[{i}]"), item.position());
        }
        &node.items
    }

    pub fn list<T: FromNode>(&mut self, key: &str) -> Vec<T> {
        let items = self.sequence(key);
        items.iter().map(|item| T::from_node(item, self.errors)).collect()
    }

    pub fn string_list(&mut self, key: &str) -> Vec<String> {
        let items = self.sequence(key);
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            if item.is_scalar() {
                out.push(item.value.clone());
            } else {
                self.errors.push(mismatch(&format!("{}.{}", self.what, key), NodeKind::Scalar, item));
            }
        }
        out
    }

    fn mapping(&mut self, key: &str) -> &'n [(Node, Node)] {
        let Some(node) = self.lookup(key) else {
            return &[];
        };
        if node.kind != NodeKind::Mapping {
            self.errors.push(mismatch(&format!("{}.{}", self.what, key), NodeKind::Mapping, node));
            return &[];
        }
        for (k, v) in &node.entries {
            self.positions.record(format!("{key}.{}", k.value), v.position());
        }
        &node.entries
    }

    pub fn map<T: FromNode>(&mut self, key: &str) -> IndexMap<String, T> {
        let entries = self.mapping(key);
        entries
            .iter()
            .map(|(k, v)| (k.value.clone(), T::from_node(v, self.errors)))
            .collect()
    }

    pub fn value_map(&mut self, key: &str) -> IndexMap<String, Value> {
        let entries = self.mapping(key);
        entries.iter().map(|(k, v)| (k.value.clone(), v.to_json())).collect()
    }

    pub fn expression_map(&mut self, key: &str) -> IndexMap<String, Expression> {
        let entries = self.mapping(key);
        let mut out = IndexMap::with_capacity(entries.len());
        for (k, v) in entries {
            if v.is_scalar() {
                out.insert(k.value.clone(), Expression::new(v.value.clone()));
            } else {
                self.errors.push(mismatch(&format!("{}.{}", self.what, k.value), NodeKind::Scalar, v));
            }
        }
        out
    }

    /// Collect `x-` extensions and hand back the recorded positions
    pub fn finish(self) -> (Positions, Extensions) {
        let extensions = self
            .node
            .entries
            .iter()
            .filter(|(k, _)| k.value.starts_with("x-"))
            .map(|(k, v)| (k.value.clone(), v.to_json()))
            .collect();
        (self.positions, extensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Position;
    use crate::node::parse;
    use serde_json::json;

    #[test]
    fn reads_fields_and_positions() {
        let root = parse("name: petstore\nretryLimit: 3\nx-internal: true\nlist: [a, b]\n").unwrap();
        let mut errors = Vec::new();
        let mut fields = Fields::new(&root, "test", &mut errors);

        assert_eq!(fields.string("name").as_deref(), Some("petstore"));
        assert_eq!(fields.integer("retryLimit"), Some(3));
        assert_eq!(fields.string_list("list"), vec!["a", "b"]);
        assert_eq!(fields.string("missing"), None);

        let (positions, extensions) = fields.finish();
        assert_eq!(positions.field("name"), Position::new(1, 7));
        assert_eq!(positions.item("list", 1), Position::new(4, 11));
        assert_eq!(extensions.get("x-internal"), Some(&json!(true)));
        assert!(errors.is_empty());
    }

    #[test]
    fn shape_mismatches_become_findings() {
        let root = parse("name: [1]\nretryLimit: soon\nlist: nope\n").unwrap();
        let mut errors = Vec::new();
        let mut fields = Fields::new(&root, "test", &mut errors);

        assert_eq!(fields.string("name"), None);
        assert_eq!(fields.integer("retryLimit"), None);
        assert!(fields.string_list("list").is_empty());
        drop(fields);

        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "expected a scalar for test.name, got sequence",
                "test.retryLimit must be an integer, got soon",
                "expected a sequence for test.list, got scalar",
            ]
        );
    }

    #[test]
    fn non_mapping_object_is_reported() {
        let root = parse("- a\n").unwrap();
        let mut errors = Vec::new();
        let _ = Fields::new(&root, "workflow", &mut errors);
        assert_eq!(errors[0].message, "expected a mapping for workflow, got sequence");
    }
}
