//! Document node layer
//!
//! A positioned YAML/JSON tree: every node knows its kind, its scalar value
//! and where it starts in the source. Mapping entries keep insertion order.
//! The typed model in `ast` is decoded from this tree.

use std::collections::HashMap;

use serde_json::{Map, Number, Value};
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::error::ArazzoError;
use crate::errors::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scalar,
    Sequence,
    Mapping,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Scalar => "scalar",
            NodeKind::Sequence => "sequence",
            NodeKind::Mapping => "mapping",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Raw scalar text (empty for collections)
    pub value: String,
    /// Scalar was written quoted, so it is always a string
    pub quoted: bool,
    pub line: usize,
    pub column: usize,
    pub items: Vec<Node>,
    pub entries: Vec<(Node, Node)>,
}

impl Node {
    fn empty(kind: NodeKind, at: Position) -> Self {
        Self {
            kind,
            value: String::new(),
            quoted: false,
            line: at.line,
            column: at.column,
            items: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn scalar(value: impl Into<String>, at: Position) -> Self {
        Self {
            value: value.into(),
            ..Self::empty(NodeKind::Scalar, at)
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub fn is_scalar(&self) -> bool {
        self.kind == NodeKind::Scalar
    }

    /// Plain `null`, `~` or empty scalar
    pub fn is_null(&self) -> bool {
        self.is_scalar() && !self.quoted && matches!(self.value.as_str(), "" | "~" | "null" | "Null" | "NULL")
    }

    /// Scalar text, `None` for collections
    pub fn as_str(&self) -> Option<&str> {
        self.is_scalar().then_some(self.value.as_str())
    }

    /// Look up a mapping value by key
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entry(key).map(|(_, v)| v)
    }

    /// Look up a mapping entry (key node and value node) by key
    pub fn entry(&self, key: &str) -> Option<(&Node, &Node)> {
        self.entries
            .iter()
            .find(|(k, _)| k.value == key)
            .map(|(k, v)| (k, v))
    }

    /// Convert the subtree to JSON. Plain scalars are typed the way YAML core
    /// schema resolves them; quoted scalars stay strings.
    pub fn to_json(&self) -> Value {
        match self.kind {
            NodeKind::Scalar => scalar_to_json(self),
            NodeKind::Sequence => Value::Array(self.items.iter().map(Node::to_json).collect()),
            NodeKind::Mapping => {
                let mut map = Map::new();
                for (k, v) in &self.entries {
                    map.insert(k.value.clone(), v.to_json());
                }
                Value::Object(map)
            }
        }
    }
}

fn scalar_to_json(node: &Node) -> Value {
    if node.quoted {
        return Value::String(node.value.clone());
    }
    if node.is_null() {
        return Value::Null;
    }
    match node.value.as_str() {
        "true" | "True" | "TRUE" => return Value::Bool(true),
        "false" | "False" | "FALSE" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = node.value.parse::<i64>() {
        return Value::Number(i.into());
    }
    let looks_numeric = node
        .value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if looks_numeric {
        if let Some(n) = node.value.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    Value::String(node.value.clone())
}

/// Source positions of a decoded object and of its fields.
///
/// Field paths are `field`, `field[index]` for sequence items and
/// `field.key` for map entries. Lookups fall back to the closest recorded
/// ancestor, then to the object itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Positions {
    pub at: Position,
    fields: HashMap<String, Position>,
}

impl Positions {
    pub fn new(at: Position) -> Self {
        Self {
            at,
            fields: HashMap::new(),
        }
    }

    pub fn record(&mut self, path: impl Into<String>, at: Position) {
        self.fields.insert(path.into(), at);
    }

    pub fn field(&self, name: &str) -> Position {
        self.fields.get(name).copied().unwrap_or(self.at)
    }

    pub fn item(&self, field: &str, index: usize) -> Position {
        self.fields
            .get(&format!("{field}[{index}]"))
            .copied()
            .unwrap_or_else(|| self.field(field))
    }

    pub fn entry(&self, field: &str, key: &str) -> Position {
        self.fields
            .get(&format!("{field}.{key}"))
            .copied()
            .unwrap_or_else(|| self.field(field))
    }
}

enum Frame {
    Sequence(Node),
    Mapping { node: Node, pending_key: Option<Node> },
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Frame>,
    root: Option<Node>,
    alias_at: Option<Position>,
}

impl TreeBuilder {
    fn push_value(&mut self, node: Node) {
        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
            Some(Frame::Sequence(seq)) => seq.items.push(node),
            Some(Frame::Mapping { node: map, pending_key }) => match pending_key.take() {
                Some(key) => map.entries.push((key, node)),
                None => {
                    // Block mappings are marked at the `:` after their first key
                    if map.entries.is_empty() && node.position() < map.position() {
                        map.line = node.line;
                        map.column = node.column;
                    }
                    *pending_key = Some(node);
                }
            },
        }
    }
}

fn marker_position(mark: &Marker) -> Position {
    Position::new(mark.line(), mark.col() + 1)
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, ev: Event, mark: Marker) {
        let at = marker_position(&mark);
        match ev {
            Event::Scalar(value, style, ..) => {
                let mut node = Node::scalar(value, at);
                node.quoted = !matches!(style, TScalarStyle::Plain);
                self.push_value(node);
            }
            Event::SequenceStart(..) => {
                self.stack.push(Frame::Sequence(Node::empty(NodeKind::Sequence, at)));
            }
            Event::MappingStart(..) => {
                self.stack.push(Frame::Mapping {
                    node: Node::empty(NodeKind::Mapping, at),
                    pending_key: None,
                });
            }
            Event::SequenceEnd | Event::MappingEnd => {
                if let Some(frame) = self.stack.pop() {
                    let node = match frame {
                        Frame::Sequence(node) => node,
                        Frame::Mapping { node, .. } => node,
                    };
                    self.push_value(node);
                }
            }
            Event::Alias(..) => {
                if self.alias_at.is_none() {
                    self.alias_at = Some(at);
                }
                self.push_value(Node::scalar("", at));
            }
            _ => {}
        }
    }
}

/// Parse YAML (or JSON) source into a positioned node tree. Only the first
/// document of a stream is loaded.
pub fn parse(source: &str) -> Result<Node, ArazzoError> {
    let mut builder = TreeBuilder::default();
    let mut parser = Parser::new_from_str(source);
    parser.load(&mut builder, false).map_err(|e| {
        let at = marker_position(e.marker());
        ArazzoError::Syntax {
            line: at.line,
            column: at.column,
            details: e.info().to_string(),
        }
    })?;

    if let Some(at) = builder.alias_at {
        return Err(ArazzoError::AliasUnsupported {
            line: at.line,
            column: at.column,
        });
    }

    match builder.root {
        Some(root) if !root.is_null() => Ok(root),
        _ => Err(ArazzoError::EmptyDocument),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_mapping_with_positions() {
        let root = parse("arazzo: 1.0.1\ninfo:\n  title: Test\n").unwrap();
        assert_eq!(root.kind, NodeKind::Mapping);
        assert_eq!(root.get("arazzo").unwrap().value, "1.0.1");

        let (key, info) = root.entry("info").unwrap();
        assert_eq!(key.position(), Position::new(2, 1));
        let title = info.get("title").unwrap();
        assert_eq!(title.position(), Position::new(3, 10));
    }

    #[test]
    fn block_mappings_start_at_their_first_key() {
        let root = parse("arazzo: 1.0.1\ninfo:\n  title: t\nsteps:\n  - stepId: s\n    operationId: op\n").unwrap();
        assert_eq!(root.position(), Position::new(1, 1));
        assert_eq!(root.get("info").unwrap().position(), Position::new(3, 3));
        let step = &root.get("steps").unwrap().items[0];
        assert_eq!(step.position(), Position::new(5, 5));
    }

    #[test]
    fn flow_mappings_start_at_their_brace() {
        let root = parse("info: {title: t}\n").unwrap();
        assert_eq!(root.get("info").unwrap().position(), Position::new(1, 7));
    }

    #[test]
    fn parse_sequence_keeps_order() {
        let root = parse("- b\n- a\n- c\n").unwrap();
        let values: Vec<&str> = root.items.iter().filter_map(Node::as_str).collect();
        assert_eq!(values, vec!["b", "a", "c"]);
    }

    #[test]
    fn parse_json_source() {
        let root = parse(r#"{"a": [1, "two", true]}"#).unwrap();
        assert_eq!(root.to_json(), json!({"a": [1, "two", true]}));
    }

    #[test]
    fn scalars_are_typed_unless_quoted() {
        let root = parse("a: 200\nb: '200'\nc: ~\nd: 1.5\ne: yes please\n").unwrap();
        assert_eq!(
            root.to_json(),
            json!({"a": 200, "b": "200", "c": null, "d": 1.5, "e": "yes please"})
        );
    }

    #[test]
    fn mapping_order_is_preserved_in_json() {
        let root = parse("z: 1\na: 2\nm: 3\n").unwrap();
        let keys: Vec<String> = root.to_json().as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(parse(""), Err(ArazzoError::EmptyDocument)));
        assert!(matches!(parse("# only a comment\n"), Err(ArazzoError::EmptyDocument)));
    }

    #[test]
    fn syntax_error_reports_position() {
        let err = parse("a: [1, 2\nb: 3\n").unwrap_err();
        assert!(matches!(err, ArazzoError::Syntax { .. }));
    }

    #[test]
    fn positions_fall_back_to_the_nearest_ancestor() {
        let mut positions = Positions::new(Position::new(1, 1));
        positions.record("steps", Position::new(3, 5));
        positions.record("steps[1]", Position::new(9, 7));
        positions.record("outputs.token", Position::new(12, 14));

        assert_eq!(positions.field("steps"), Position::new(3, 5));
        assert_eq!(positions.item("steps", 1), Position::new(9, 7));
        assert_eq!(positions.item("steps", 4), Position::new(3, 5));
        assert_eq!(positions.entry("outputs", "token"), Position::new(12, 14));
        assert_eq!(positions.entry("outputs", "missing"), Position::new(1, 1));
        assert_eq!(positions.field("stepId"), Position::new(1, 1));
    }

    #[test]
    fn aliases_are_rejected() {
        let err = parse("a: &x 1\nb: *x\n").unwrap_err();
        assert!(matches!(err, ArazzoError::AliasUnsupported { line: 2, .. }));
    }
}
