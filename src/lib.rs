//! # Tenkan - Orchestration to Workflow Transpiler
//!
//! **Tenkan** migrates orchestration process flows into cloud workflow action
//! graphs. An orchestration source file embeds its designer metadata as an XML
//! block; Tenkan parses that block into a typed process-flow tree, classifies
//! how the flow is activated, and lowers every shape into an equivalent action
//! with expressions rewritten into the target's function-call syntax.
//!
//! ## Core Workflow
//!
//! 1.  **Parse**: `parse_orchestration` extracts the designer block and builds a `ProcessFlow`.
//!     This is the only step that can fail, with a `MalformedSource` error.
//! 2.  **Analyze**: `analyze` classifies the activation pattern and reports blocking patterns.
//! 3.  **Transform**: `Transformer::builder` combines the flow with optional binding metadata
//!     and `TransformOptions`, then `transform` produces a `Workflow`: one trigger, an ordered
//!     action tree with producer/consumer wiring, and findings for anything degraded.
//! 4.  **Bindings only**: when no orchestration exists, `synthesize_workflows` derives
//!     workflows from receive locations, send ports and their filters.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tenkan::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let source = std::fs::read_to_string("OrderProcess.odx")?;
//!     let bindings = BindingSet::from_file("bindings.json")?;
//!
//!     let flow = parse_orchestration(&source)?;
//!     let workflow = Transformer::builder(flow)
//!         .with_bindings(bindings)
//!         .with_options(TransformOptions::default())
//!         .build()
//!         .transform();
//!
//!     println!("Trigger: {}", workflow.trigger.name);
//!     for action in workflow.flatten() {
//!         println!("  {:>3} {:?} {}", action.sequence, action.kind, action.name);
//!     }
//!     for finding in &workflow.findings {
//!         println!("  [{:?}] {}", finding.severity, finding.message);
//!     }
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod bindings;
pub mod config;
pub mod error;
pub mod expression;
pub mod model;
pub mod parser;
pub mod prelude;
pub mod transformer;
pub mod workflow;
