//! Lazy document traversal
//!
//! `walk` yields every object of a document depth-first in pre-order,
//! together with the chain of parents that leads to it. Nothing is buffered:
//! dropping the iterator (or returning `Flow::Stop` from a matcher driven by
//! `walk_with`) ends the traversal.

mod matcher;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{instrument, trace};

use crate::ast::{
    Arazzo, Components, Extensions, FailureAction, Info, Parameter, PayloadReplacement, RequestBody, Reusable,
    SourceDescription, Step, SuccessAction, Workflow,
};
use crate::criterion::Criterion;
use crate::expression::Expression;

pub use matcher::{Flow, Matcher};

/// A borrowed handle to one walked object
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Arazzo(&'a Arazzo),
    Info(&'a Info),
    SourceDescription(&'a SourceDescription),
    Workflow(&'a Workflow),
    ReusableParameter(&'a Reusable<Parameter>),
    Parameter(&'a Parameter),
    /// Workflow or component `inputs`
    Schema(&'a Value),
    Step(&'a Step),
    RequestBody(&'a RequestBody),
    PayloadReplacement(&'a PayloadReplacement),
    Criterion(&'a Criterion),
    ReusableSuccessAction(&'a Reusable<SuccessAction>),
    SuccessAction(&'a SuccessAction),
    ReusableFailureAction(&'a Reusable<FailureAction>),
    FailureAction(&'a FailureAction),
    Outputs(&'a IndexMap<String, Expression>),
    Components(&'a Components),
    Extensions(&'a Extensions),
}

impl<'a> NodeRef<'a> {
    pub fn kind(&self) -> &'static str {
        match self {
            NodeRef::Arazzo(_) => "arazzo",
            NodeRef::Info(_) => "info",
            NodeRef::SourceDescription(_) => "sourceDescription",
            NodeRef::Workflow(_) => "workflow",
            NodeRef::ReusableParameter(_) => "reusableParameter",
            NodeRef::Parameter(_) => "parameter",
            NodeRef::Schema(_) => "schema",
            NodeRef::Step(_) => "step",
            NodeRef::RequestBody(_) => "requestBody",
            NodeRef::PayloadReplacement(_) => "payloadReplacement",
            NodeRef::Criterion(_) => "criterion",
            NodeRef::ReusableSuccessAction(_) => "reusableSuccessAction",
            NodeRef::SuccessAction(_) => "successAction",
            NodeRef::ReusableFailureAction(_) => "reusableFailureAction",
            NodeRef::FailureAction(_) => "failureAction",
            NodeRef::Outputs(_) => "outputs",
            NodeRef::Components(_) => "components",
            NodeRef::Extensions(_) => "extensions",
        }
    }

    fn is_reusable(&self) -> bool {
        matches!(
            self,
            NodeRef::ReusableParameter(_) | NodeRef::ReusableSuccessAction(_) | NodeRef::ReusableFailureAction(_)
        )
    }

    /// Direct children in document order
    fn children(&self) -> Vec<Child<'a>> {
        let mut out = Children::default();
        match *self {
            NodeRef::Arazzo(doc) => {
                if let Some(info) = &doc.info {
                    out.field("info", NodeRef::Info(info));
                }
                out.list("sourceDescriptions", doc.source_descriptions.iter().map(NodeRef::SourceDescription));
                out.list("workflows", doc.workflows.iter().map(NodeRef::Workflow));
                if let Some(components) = &doc.components {
                    out.field("components", NodeRef::Components(components));
                }
                out.extensions(&doc.extensions);
            }
            NodeRef::Info(info) => out.extensions(&info.extensions),
            NodeRef::SourceDescription(source) => out.extensions(&source.extensions),
            NodeRef::Workflow(workflow) => {
                out.list("parameters", workflow.parameters.iter().map(NodeRef::ReusableParameter));
                if let Some(inputs) = &workflow.inputs {
                    out.field("inputs", NodeRef::Schema(inputs));
                }
                out.list("steps", workflow.steps.iter().map(NodeRef::Step));
                out.list("successActions", workflow.success_actions.iter().map(NodeRef::ReusableSuccessAction));
                out.list("failureActions", workflow.failure_actions.iter().map(NodeRef::ReusableFailureAction));
                out.outputs(&workflow.outputs);
                out.extensions(&workflow.extensions);
            }
            NodeRef::ReusableParameter(reusable) => {
                if let Some(parameter) = reusable.as_object() {
                    out.field("object", NodeRef::Parameter(parameter));
                }
            }
            NodeRef::Parameter(parameter) => out.extensions(&parameter.extensions),
            NodeRef::Schema(_) | NodeRef::Outputs(_) | NodeRef::Extensions(_) => {}
            NodeRef::Step(step) => {
                out.list("parameters", step.parameters.iter().map(NodeRef::ReusableParameter));
                if let Some(body) = &step.request_body {
                    out.field("requestBody", NodeRef::RequestBody(body));
                }
                out.list("successCriteria", step.success_criteria.iter().map(NodeRef::Criterion));
                out.list("onSuccess", step.on_success.iter().map(NodeRef::ReusableSuccessAction));
                out.list("onFailure", step.on_failure.iter().map(NodeRef::ReusableFailureAction));
                out.outputs(&step.outputs);
                out.extensions(&step.extensions);
            }
            NodeRef::RequestBody(body) => {
                out.list("replacements", body.replacements.iter().map(NodeRef::PayloadReplacement));
                out.extensions(&body.extensions);
            }
            NodeRef::PayloadReplacement(replacement) => out.extensions(&replacement.extensions),
            NodeRef::Criterion(criterion) => out.extensions(&criterion.extensions),
            NodeRef::ReusableSuccessAction(reusable) => {
                if let Some(action) = reusable.as_object() {
                    out.field("object", NodeRef::SuccessAction(action));
                }
            }
            NodeRef::SuccessAction(action) => {
                out.list("criteria", action.criteria.iter().map(NodeRef::Criterion));
                out.extensions(&action.extensions);
            }
            NodeRef::ReusableFailureAction(reusable) => {
                if let Some(action) = reusable.as_object() {
                    out.field("object", NodeRef::FailureAction(action));
                }
            }
            NodeRef::FailureAction(action) => {
                out.list("criteria", action.criteria.iter().map(NodeRef::Criterion));
                out.extensions(&action.extensions);
            }
            NodeRef::Components(components) => {
                out.map("inputs", components.inputs.iter().map(|(k, v)| (k, NodeRef::Schema(v))));
                out.map("parameters", components.parameters.iter().map(|(k, v)| (k, NodeRef::Parameter(v))));
                out.map(
                    "successActions",
                    components.success_actions.iter().map(|(k, v)| (k, NodeRef::SuccessAction(v))),
                );
                out.map(
                    "failureActions",
                    components.failure_actions.iter().map(|(k, v)| (k, NodeRef::FailureAction(v))),
                );
                out.extensions(&components.extensions);
            }
        }
        out.0
    }
}

struct Child<'a> {
    node: NodeRef<'a>,
    field: &'static str,
    key: Option<&'a str>,
    index: Option<usize>,
}

#[derive(Default)]
struct Children<'a>(Vec<Child<'a>>);

impl<'a> Children<'a> {
    fn field(&mut self, field: &'static str, node: NodeRef<'a>) {
        self.0.push(Child {
            node,
            field,
            key: None,
            index: None,
        });
    }

    fn list(&mut self, field: &'static str, nodes: impl Iterator<Item = NodeRef<'a>>) {
        for (i, node) in nodes.enumerate() {
            self.0.push(Child {
                node,
                field,
                key: None,
                index: Some(i),
            });
        }
    }

    fn map(&mut self, field: &'static str, nodes: impl Iterator<Item = (&'a String, NodeRef<'a>)>) {
        for (key, node) in nodes {
            self.0.push(Child {
                node,
                field,
                key: Some(key.as_str()),
                index: None,
            });
        }
    }

    fn outputs(&mut self, outputs: &'a IndexMap<String, Expression>) {
        if !outputs.is_empty() {
            self.field("outputs", NodeRef::Outputs(outputs));
        }
    }

    fn extensions(&mut self, extensions: &'a Extensions) {
        if !extensions.is_empty() {
            self.field("extensions", NodeRef::Extensions(extensions));
        }
    }
}

/// One step of the ancestor chain: the parent and how the child hangs off it
#[derive(Debug, Clone, Copy)]
pub struct LocationContext<'a> {
    pub parent: NodeRef<'a>,
    pub parent_field: &'static str,
    pub parent_key: Option<&'a str>,
    pub parent_index: Option<usize>,
}

/// Ancestor chain from the document root down to a node's parent
pub type Locations<'a> = Vec<LocationContext<'a>>;

#[derive(Debug, Clone)]
pub struct WalkItem<'a> {
    pub node: NodeRef<'a>,
    pub location: Locations<'a>,
    pub document: &'a Arazzo,
}

impl<'a> WalkItem<'a> {
    /// JSON pointer of the node within the document, e.g. `/workflows/0/steps/1`
    pub fn pointer(&self) -> String {
        let mut out = String::new();
        for ctx in &self.location {
            // The inline object of a reusable is the reusable itself
            if ctx.parent.is_reusable() {
                continue;
            }
            out.push('/');
            out.push_str(ctx.parent_field);
            if let Some(key) = ctx.parent_key {
                out.push('/');
                out.push_str(&key.replace('~', "~0").replace('/', "~1"));
            }
            if let Some(index) = ctx.parent_index {
                out.push('/');
                out.push_str(&index.to_string());
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }

    /// Nearest enclosing workflow, if any
    pub fn workflow(&self) -> Option<&'a Workflow> {
        self.location.iter().rev().find_map(|ctx| match ctx.parent {
            NodeRef::Workflow(workflow) => Some(workflow),
            _ => None,
        })
    }
}

/// Pre-order iterator over a document
pub struct Walker<'a> {
    document: &'a Arazzo,
    pending: Vec<(NodeRef<'a>, Locations<'a>)>,
}

impl<'a> Iterator for Walker<'a> {
    type Item = WalkItem<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (node, location) = self.pending.pop()?;

        for child in node.children().into_iter().rev() {
            let mut child_location = location.clone();
            child_location.push(LocationContext {
                parent: node,
                parent_field: child.field,
                parent_key: child.key,
                parent_index: child.index,
            });
            self.pending.push((child.node, child_location));
        }

        trace!(kind = node.kind(), depth = location.len(), "walk");
        Some(WalkItem {
            node,
            location,
            document: self.document,
        })
    }
}

pub fn walk(document: &Arazzo) -> Walker<'_> {
    Walker {
        document,
        pending: vec![(NodeRef::Arazzo(document), Vec::new())],
    }
}

/// Drive `matcher` over the whole document until a handler returns
/// `Flow::Stop` (not an error) or an error
#[instrument(skip_all)]
pub fn walk_with<'a, M: Matcher<'a>>(document: &'a Arazzo, matcher: &mut M) -> Result<(), M::Error> {
    for item in walk(document) {
        if item.matches(matcher)?.is_stop() {
            trace!(kind = item.node.kind(), "walk stopped");
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FromNode;
    use crate::node::parse;
    use pretty_assertions::assert_eq;
    use std::convert::Infallible;

    const DOC: &str = r#"arazzo: 1.0.1
info:
  title: Walk
  version: 1.0.0
sourceDescriptions:
  - name: api
    url: ./openapi.yaml
workflows:
  - workflowId: first
    inputs:
      type: object
    steps:
      - stepId: a
        operationId: opA
        successCriteria:
          - condition: $statusCode == 200
        onSuccess:
          - name: done
            type: end
      - stepId: b
        operationId: opB
        parameters:
          - reference: $components.parameters.page
    outputs:
      id: $steps.a.outputs.id
  - workflowId: second
    steps:
      - stepId: c
        workflowId: first
components:
  parameters:
    page:
      name: page
      in: query
      value: 1
x-trace: true
"#;

    fn document() -> Arazzo {
        let mut errors = Vec::new();
        Arazzo::from_node(&parse(DOC).unwrap(), &mut errors)
    }

    #[test]
    fn pre_order_document_order() {
        let doc = document();
        let visited: Vec<(String, &'static str)> = walk(&doc).map(|item| (item.pointer(), item.node.kind())).collect();
        let expected = vec![
            ("/", "arazzo"),
            ("/info", "info"),
            ("/sourceDescriptions/0", "sourceDescription"),
            ("/workflows/0", "workflow"),
            ("/workflows/0/inputs", "schema"),
            ("/workflows/0/steps/0", "step"),
            ("/workflows/0/steps/0/successCriteria/0", "criterion"),
            ("/workflows/0/steps/0/onSuccess/0", "reusableSuccessAction"),
            ("/workflows/0/steps/0/onSuccess/0", "successAction"),
            ("/workflows/0/steps/1", "step"),
            ("/workflows/0/steps/1/parameters/0", "reusableParameter"),
            ("/workflows/0/outputs", "outputs"),
            ("/workflows/1", "workflow"),
            ("/workflows/1/steps/0", "step"),
            ("/components", "components"),
            ("/components/parameters/page", "parameter"),
            ("/extensions", "extensions"),
        ];
        let expected: Vec<(String, &'static str)> = expected.into_iter().map(|(p, k)| (p.to_string(), k)).collect();
        assert_eq!(visited, expected);
    }

    #[test]
    fn locations_carry_parent_field_and_index() {
        let doc = document();
        let item = walk(&doc)
            .find(|item| matches!(item.node, NodeRef::Step(step) if step.step_id == "b"))
            .unwrap();

        assert_eq!(item.location.len(), 2);
        assert!(matches!(item.location[0].parent, NodeRef::Arazzo(_)));
        assert_eq!(item.location[0].parent_field, "workflows");
        assert_eq!(item.location[0].parent_index, Some(0));
        assert_eq!(item.location[1].parent_field, "steps");
        assert_eq!(item.location[1].parent_index, Some(1));
        assert_eq!(item.workflow().unwrap().workflow_id, "first");
    }

    #[derive(Default)]
    struct StopAtFirstStep {
        steps: Vec<String>,
        seen: usize,
    }

    impl<'a> Matcher<'a> for StopAtFirstStep {
        type Error = Infallible;

        fn step(&mut self, step: &'a Step, _: &WalkItem<'a>) -> Result<Flow, Self::Error> {
            self.steps.push(step.step_id.clone());
            Ok(Flow::Stop)
        }

        fn any(&mut self, _: NodeRef<'a>, _: &WalkItem<'a>) -> Result<Flow, Self::Error> {
            self.seen += 1;
            Ok(Flow::Continue)
        }
    }

    #[test]
    fn stop_on_first_step_visits_one_step() {
        let doc = document();
        let mut matcher = StopAtFirstStep::default();
        walk_with(&doc, &mut matcher).unwrap();
        assert_eq!(matcher.steps, vec!["a"]);
        // arazzo, info, sourceDescription, workflow, schema
        assert_eq!(matcher.seen, 5);
    }

    struct FailOnCriterion;

    impl<'a> Matcher<'a> for FailOnCriterion {
        type Error = String;

        fn criterion(&mut self, criterion: &'a Criterion, _: &WalkItem<'a>) -> Result<Flow, Self::Error> {
            Err(criterion.condition.clone())
        }
    }

    #[test]
    fn handler_errors_propagate() {
        let doc = document();
        assert_eq!(walk_with(&doc, &mut FailOnCriterion), Err("$statusCode == 200".to_string()));
    }

    /// Records the name of every span opened while it is the default subscriber
    #[derive(Clone, Default)]
    struct SpanNames(std::sync::Arc<std::sync::Mutex<Vec<&'static str>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for SpanNames {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _: &tracing::span::Id,
            _: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.0.lock().unwrap().push(attrs.metadata().name());
        }
    }

    #[test]
    fn walk_with_opens_a_span() {
        use tracing_subscriber::layer::SubscriberExt;

        let doc = document();
        let names = SpanNames::default();
        let subscriber = tracing_subscriber::registry().with(names.clone());
        tracing::subscriber::with_default(subscriber, || {
            walk_with(&doc, &mut StopAtFirstStep::default()).unwrap();
        });
        assert!(names.0.lock().unwrap().contains(&"walk_with"));
    }

    #[test]
    fn iterator_can_be_abandoned() {
        let doc = document();
        let mut walker = walk(&doc);
        assert!(matches!(walker.next().unwrap().node, NodeRef::Arazzo(_)));
        assert!(matches!(walker.next().unwrap().node, NodeRef::Info(_)));
        drop(walker);
        assert_eq!(walk(&doc).filter(|i| matches!(i.node, NodeRef::Step(_))).count(), 3);
    }
}
