//! Per-kind dispatch for walked nodes

use indexmap::IndexMap;
use serde_json::Value;

use super::{NodeRef, WalkItem};
use crate::ast::{
    Arazzo, Components, Extensions, FailureAction, Info, Parameter, PayloadReplacement, RequestBody, Reusable,
    SourceDescription, Step, SuccessAction, Workflow,
};
use crate::criterion::Criterion;
use crate::expression::Expression;

/// Whether a walk should go on after a handler returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

impl Flow {
    pub fn is_stop(&self) -> bool {
        matches!(self, Flow::Stop)
    }
}

/// Handler table for walked nodes.
///
/// Every method defaults to `Ok(Flow::Continue)`, so implementors only
/// override the kinds they care about. `any` runs for every node after the
/// kind-specific handler.
#[allow(unused_variables)]
pub trait Matcher<'a> {
    type Error;

    fn arazzo(&mut self, arazzo: &'a Arazzo, item: &WalkItem<'a>) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn info(&mut self, info: &'a Info, item: &WalkItem<'a>) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn source_description(
        &mut self,
        source_description: &'a SourceDescription,
        item: &WalkItem<'a>,
    ) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn workflow(&mut self, workflow: &'a Workflow, item: &WalkItem<'a>) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn reusable_parameter(
        &mut self,
        parameter: &'a Reusable<Parameter>,
        item: &WalkItem<'a>,
    ) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn parameter(&mut self, parameter: &'a Parameter, item: &WalkItem<'a>) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn schema(&mut self, schema: &'a Value, item: &WalkItem<'a>) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn step(&mut self, step: &'a Step, item: &WalkItem<'a>) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn request_body(&mut self, request_body: &'a RequestBody, item: &WalkItem<'a>) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn payload_replacement(
        &mut self,
        replacement: &'a PayloadReplacement,
        item: &WalkItem<'a>,
    ) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn criterion(&mut self, criterion: &'a Criterion, item: &WalkItem<'a>) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn reusable_success_action(
        &mut self,
        action: &'a Reusable<SuccessAction>,
        item: &WalkItem<'a>,
    ) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn success_action(&mut self, action: &'a SuccessAction, item: &WalkItem<'a>) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn reusable_failure_action(
        &mut self,
        action: &'a Reusable<FailureAction>,
        item: &WalkItem<'a>,
    ) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn failure_action(&mut self, action: &'a FailureAction, item: &WalkItem<'a>) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn outputs(
        &mut self,
        outputs: &'a IndexMap<String, Expression>,
        item: &WalkItem<'a>,
    ) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn components(&mut self, components: &'a Components, item: &WalkItem<'a>) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn extensions(&mut self, extensions: &'a Extensions, item: &WalkItem<'a>) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    fn any(&mut self, node: NodeRef<'a>, item: &WalkItem<'a>) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }
}

impl<'a> WalkItem<'a> {
    /// Call the handler for this item's kind, then `any`
    pub fn matches<M: Matcher<'a>>(&self, matcher: &mut M) -> Result<Flow, M::Error> {
        let flow = match self.node {
            NodeRef::Arazzo(n) => matcher.arazzo(n, self)?,
            NodeRef::Info(n) => matcher.info(n, self)?,
            NodeRef::SourceDescription(n) => matcher.source_description(n, self)?,
            NodeRef::Workflow(n) => matcher.workflow(n, self)?,
            NodeRef::ReusableParameter(n) => matcher.reusable_parameter(n, self)?,
            NodeRef::Parameter(n) => matcher.parameter(n, self)?,
            NodeRef::Schema(n) => matcher.schema(n, self)?,
            NodeRef::Step(n) => matcher.step(n, self)?,
            NodeRef::RequestBody(n) => matcher.request_body(n, self)?,
            NodeRef::PayloadReplacement(n) => matcher.payload_replacement(n, self)?,
            NodeRef::Criterion(n) => matcher.criterion(n, self)?,
            NodeRef::ReusableSuccessAction(n) => matcher.reusable_success_action(n, self)?,
            NodeRef::SuccessAction(n) => matcher.success_action(n, self)?,
            NodeRef::ReusableFailureAction(n) => matcher.reusable_failure_action(n, self)?,
            NodeRef::FailureAction(n) => matcher.failure_action(n, self)?,
            NodeRef::Outputs(n) => matcher.outputs(n, self)?,
            NodeRef::Components(n) => matcher.components(n, self)?,
            NodeRef::Extensions(n) => matcher.extensions(n, self)?,
        };
        if flow.is_stop() {
            return Ok(Flow::Stop);
        }
        matcher.any(self.node, self)
    }
}
