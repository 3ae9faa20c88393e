//! Inline-or-referenced component values

use std::cell::Cell;

use serde::Serialize;
use serde_json::Value;

use super::components::Components;
use super::decode::{Fields, FromNode};
use crate::errors::ValidationError;
use crate::expression::Expression;
use crate::node::{Node, Positions};

/// A model type that can live under `components`
pub trait Component: FromNode {
    /// Key of the `components` map holding this type
    const KIND: &'static str;

    fn lookup<'a>(components: &'a Components, name: &str) -> Option<&'a Self>;
}

/// Either `{reference: $components.<kind>.<name>, value?}` or an inline `T`
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reusable<T> {
    Reference {
        reference: Expression,
        /// Overrides the referenced parameter's value
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        #[serde(skip)]
        positions: Positions,
        #[serde(skip)]
        valid: Cell<bool>,
    },
    Object(T),
}

impl<T> Reusable<T> {
    pub fn reference(reference: impl Into<Expression>) -> Self {
        Reusable::Reference {
            reference: reference.into(),
            value: None,
            positions: Positions::default(),
            valid: Cell::new(false),
        }
    }

    pub fn object(object: T) -> Self {
        Reusable::Object(object)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Reusable::Reference { .. })
    }

    pub fn as_reference(&self) -> Option<&Expression> {
        match self {
            Reusable::Reference { reference, .. } => Some(reference),
            Reusable::Object(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&T> {
        match self {
            Reusable::Reference { .. } => None,
            Reusable::Object(object) => Some(object),
        }
    }
}

impl<T: Component> Reusable<T> {
    /// Resolve to the inline object or the referenced component
    pub fn get<'a>(&'a self, components: Option<&'a Components>) -> Option<&'a T> {
        match self {
            Reusable::Object(object) => Some(object),
            Reusable::Reference { reference, .. } => {
                let parts = reference.parts();
                if parts.reference != T::KIND {
                    return None;
                }
                T::lookup(components?, &parts.parts.join("."))
            }
        }
    }
}

impl<T: FromNode> FromNode for Reusable<T> {
    fn from_node(node: &Node, errors: &mut Vec<ValidationError>) -> Self {
        if node.get("reference").is_none() {
            return Reusable::Object(T::from_node(node, errors));
        }
        let mut fields = Fields::new(node, "reusable", errors);
        let reference = fields.expression("reference").unwrap_or_default();
        let value = fields.value("value");
        let (positions, _) = fields.finish();
        Reusable::Reference {
            reference,
            value,
            positions,
            valid: Cell::new(false),
        }
    }
}
