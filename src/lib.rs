//! Arazzo - workflow document model, runtime expressions and validation
//!
//! ```no_run
//! use arazzo::{unmarshal, Options};
//!
//! let source = std::fs::read_to_string("pets.arazzo.yaml").unwrap();
//! let (document, errors) = unmarshal(&source, &Options::default()).unwrap();
//! for error in &errors {
//!     eprintln!("{error}");
//! }
//! println!("{} workflows", document.workflows.len());
//! ```

pub mod ast;
pub mod cache;
pub mod config;
pub mod criterion;
pub mod error;
pub mod errors;
pub mod expression;
pub mod marshal;
pub mod node;
pub mod validate;
pub mod validator;
pub mod walk;

pub use ast::{
    ActionType, Arazzo, Components, FailureAction, Info, Parameter, ParameterIn, PayloadReplacement, RequestBody,
    Reusable, SourceDescription, SourceDescriptionType, Step, SuccessAction, Workflow,
};
pub use cache::{CacheStats, Caches};
pub use config::Options;
pub use criterion::condition::{new_condition, Condition, ConditionError, Operator};
pub use criterion::{Criterion, CriterionExpressionType, CriterionType, CriterionTypeUnion};
pub use error::{ArazzoError, FixSuggestion};
pub use errors::{Position, ValidationError, ValidationResult};
pub use expression::{extract_expressions, Expression, ExpressionError, ExpressionType};
pub use validate::{Scope, Validate};
pub use validator::{unmarshal, Validator};
pub use walk::{walk, walk_with, Flow, Matcher, NodeRef, WalkItem, Walker};
