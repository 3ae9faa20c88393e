use std::cell::Cell;
use std::fmt;

use serde::Serialize;

use super::components::Components;
use super::decode::{Extensions, Fields, FromNode};
use super::workflow::Workflow;
use crate::errors::ValidationError;
use crate::node::{Node, Positions};

/// Root of an Arazzo document
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Arazzo {
    pub arazzo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<Info>,
    pub source_descriptions: Vec<SourceDescription>,
    pub workflows: Vec<Workflow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    #[serde(flatten)]
    pub extensions: Extensions,
    #[serde(skip)]
    pub positions: Positions,
    #[serde(skip)]
    pub(crate) valid: Cell<bool>,
}

impl Arazzo {
    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }

    pub fn workflow(&self, workflow_id: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.workflow_id == workflow_id)
    }

    pub fn source_description(&self, name: &str) -> Option<&SourceDescription> {
        self.source_descriptions.iter().find(|s| s.name == name)
    }

    pub fn step_count(&self) -> usize {
        self.workflows.iter().map(|w| w.steps.len()).sum()
    }
}

impl FromNode for Arazzo {
    fn from_node(node: &Node, errors: &mut Vec<ValidationError>) -> Self {
        let mut fields = Fields::new(node, "arazzo document", errors);
        let arazzo = fields.required_string("arazzo");
        let info = fields.child("info");
        let source_descriptions = fields.list("sourceDescriptions");
        let workflows = fields.list("workflows");
        let components = fields.child("components");
        let (positions, extensions) = fields.finish();
        Self {
            arazzo,
            info,
            source_descriptions,
            workflows,
            components,
            extensions,
            positions,
            valid: Cell::new(false),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Info {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: String,
    #[serde(flatten)]
    pub extensions: Extensions,
    #[serde(skip)]
    pub positions: Positions,
    #[serde(skip)]
    pub(crate) valid: Cell<bool>,
}

impl Info {
    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }
}

impl FromNode for Info {
    fn from_node(node: &Node, errors: &mut Vec<ValidationError>) -> Self {
        let mut fields = Fields::new(node, "info", errors);
        let title = fields.required_string("title");
        let summary = fields.string("summary");
        let description = fields.string("description");
        let version = fields.required_string("version");
        let (positions, extensions) = fields.finish();
        Self {
            title,
            summary,
            description,
            version,
            extensions,
            positions,
            valid: Cell::new(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceDescriptionType {
    OpenApi,
    Arazzo,
}

impl SourceDescriptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceDescriptionType::OpenApi => "openapi",
            SourceDescriptionType::Arazzo => "arazzo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "openapi" => Some(SourceDescriptionType::OpenApi),
            "arazzo" => Some(SourceDescriptionType::Arazzo),
            _ => None,
        }
    }
}

impl fmt::Display for SourceDescriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An OpenAPI or Arazzo document the workflows call into
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceDescription {
    pub name: String,
    pub url: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(flatten)]
    pub extensions: Extensions,
    #[serde(skip)]
    pub positions: Positions,
    #[serde(skip)]
    pub(crate) valid: Cell<bool>,
}

impl SourceDescription {
    pub fn new(name: impl Into<String>, url: impl Into<String>, type_: SourceDescriptionType) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            type_: Some(type_.as_str().to_string()),
            ..Default::default()
        }
    }

    pub fn source_type(&self) -> Option<SourceDescriptionType> {
        self.type_.as_deref().and_then(SourceDescriptionType::parse)
    }

    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }
}

impl FromNode for SourceDescription {
    fn from_node(node: &Node, errors: &mut Vec<ValidationError>) -> Self {
        let mut fields = Fields::new(node, "source description", errors);
        let name = fields.required_string("name");
        let url = fields.required_string("url");
        let type_ = fields.string("type");
        let (positions, extensions) = fields.finish();
        Self {
            name,
            url,
            type_,
            extensions,
            positions,
            valid: Cell::new(false),
        }
    }
}
