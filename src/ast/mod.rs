//! AST Module - typed Arazzo document model
//!
//! - `document`: Arazzo, Info, SourceDescription
//! - `workflow`: Workflow
//! - `step`: Step, Parameter, RequestBody, PayloadReplacement
//! - `action`: SuccessAction, FailureAction
//! - `components`: Components
//! - `reusable`: Reusable<T> and the Component trait
//!
//! Every object keeps the source positions of its fields (`Positions`) and a
//! validity flag set by its last validation. Checks live in `validate`.

mod action;
mod components;
pub mod decode;
mod document;
mod reusable;
mod step;
mod workflow;

pub use action::{ActionType, FailureAction, SuccessAction};
pub use components::Components;
pub use decode::{Extensions, FromNode};
pub use document::{Arazzo, Info, SourceDescription, SourceDescriptionType};
pub use reusable::{Component, Reusable};
pub use step::{Parameter, ParameterIn, PayloadReplacement, RequestBody, Step};
pub use workflow::Workflow;
