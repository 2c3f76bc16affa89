//! Prelude module for convenient imports
//!
//! Re-exports the types and entry points most callers need, so a single
//! `use tenkan::prelude::*;` covers parsing, transformation and inspection of
//! the resulting workflow.
//!
//! # Example
//!
//! ```rust,no_run
//! use tenkan::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let sources = vec![
//!     std::fs::read_to_string("Orders.odx")?,
//!     std::fs::read_to_string("Invoices.odx")?,
//! ];
//! let options = TransformOptions::from_file("tenkan.toml")?;
//!
//! for outcome in transform_batch(&sources, &BindingSet::default(), &options) {
//!     let workflow = outcome?;
//!     println!("{}: {} actions", workflow.name, workflow.flatten().len());
//! }
//! # Ok(())
//! # }
//! ```

// Parsing and analysis
pub use crate::analyzer::{PatternAnalysis, TriggerPattern, analyze};
pub use crate::model::{NodeKind, ProcessFlow, ProcessNode};
pub use crate::parser::parse_orchestration;

// Transformation
pub use crate::transformer::{
    Transformer, synthesize_workflows, transform_batch, transform_flow, transform_source,
};

// Inputs
pub use crate::bindings::BindingSet;
pub use crate::config::TransformOptions;

// Expressions
pub use crate::expression::{ExpressionTranslator, VariableSet};

// Output model
pub use crate::workflow::{Action, ActionKind, Finding, Severity, Trigger, Workflow};

// Error types
pub use crate::error::{BindingError, ConfigError, MalformedSource};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
