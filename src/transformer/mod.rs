//! Workflow transformer.
//!
//! Lowers a parsed [`ProcessFlow`] into a target [`Workflow`]: the trigger is
//! selected from the activation pattern, variables are hoisted to the top,
//! every node is lowered recursively, and consumers are wired to the actions
//! that produce their input messages.

use crate::analyzer::analyze;
use crate::bindings::BindingSet;
use crate::config::TransformOptions;
use crate::error::MalformedSource;
use crate::expression::{ExpressionTranslator, VariableSet};
use crate::model::ProcessFlow;
use crate::parser::parse_orchestration;
use crate::workflow::{Action, Finding, Severity, Workflow};
use rayon::prelude::*;

mod condition;
pub mod connector;
mod dataflow;
mod endpoint;
mod hoist;
mod lower;
mod names;
mod synthesis;
mod trigger;

pub use condition::{extract_loop_threshold, invert_condition};
pub use connector::{infer_connector, is_edi_envelope};
pub use dataflow::resolve_data_flow;
pub use hoist::{HoistedVariable, VariableOrigin, hoist_variables};
pub use lower::UnitContext;
pub use synthesis::{
    CATCH_ALL_WORKFLOW, INBOUND_MESSAGE, RoutingGroup, routing_groups, synthesize_workflows,
};
pub use trigger::{REQUEST_TRIGGER_NAME, TriggerSelection};

use hoist::initializer_actions;
use lower::Lowerer;
use names::NameRegistry;
use trigger::select_trigger;

/// Transforms one parsed flow.
pub struct Transformer {
    flow: ProcessFlow,
    bindings: BindingSet,
    options: TransformOptions,
}

pub struct TransformerBuilder {
    flow: ProcessFlow,
    bindings: BindingSet,
    options: TransformOptions,
}

impl TransformerBuilder {
    pub fn new(flow: ProcessFlow) -> Self {
        Self {
            flow,
            bindings: BindingSet::default(),
            options: TransformOptions::default(),
        }
    }

    pub fn with_bindings(mut self, bindings: BindingSet) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_options(mut self, options: TransformOptions) -> Self {
        self.options = options;
        self
    }

    /// Forces a generic inbound trigger regardless of the activation shape.
    pub fn callable(mut self, callable: bool) -> Self {
        self.options.callable = callable;
        self
    }

    pub fn build(self) -> Transformer {
        Transformer {
            flow: self.flow,
            bindings: self.bindings,
            options: self.options,
        }
    }
}

impl Transformer {
    pub fn builder(flow: ProcessFlow) -> TransformerBuilder {
        TransformerBuilder::new(flow)
    }

    pub fn flow(&self) -> &ProcessFlow {
        &self.flow
    }

    pub fn transform(&self) -> Workflow {
        transform_flow(&self.flow, &self.bindings, &self.options)
    }
}

/// Runs every pass over one flow.
pub fn transform_flow(
    flow: &ProcessFlow,
    bindings: &BindingSet,
    options: &TransformOptions,
) -> Workflow {
    let unit = UnitContext::for_flow(flow);
    let analysis = analyze(flow);
    let mut names = NameRegistry::default();

    let hoisted = hoist_variables(flow);
    let variables: VariableSet = hoisted.iter().map(|v| v.name.as_str()).collect();
    let messages: VariableSet = flow.messages.iter().map(|m| m.name.as_str()).collect();
    let mut actions = initializer_actions(&hoisted, &mut names);

    let selection = select_trigger(flow, &analysis, bindings, options.callable, &mut names);
    actions.extend(selection.preamble);

    let mut lowerer = Lowerer::new(
        flow,
        &unit,
        &analysis,
        bindings,
        options,
        ExpressionTranslator::new(&variables).with_messages(&messages),
        &mut names,
    );
    let body = lowerer.lower_nodes(&flow.nodes);
    let mut findings = lowerer.into_findings();
    actions.extend(body);

    resolve_data_flow(&mut actions, selection.initial_message.as_deref());
    assign_sequences(&mut actions);

    if let Some(reason) = &analysis.blocking_reason {
        findings.insert(
            0,
            Finding::new(Severity::Blocking, flow.qualified_name.as_str(), reason.as_str()),
        );
    }

    let mut workflow = Workflow::new(&flow.name, selection.trigger);
    workflow.actions = actions;
    workflow.variables = hoisted.into_iter().map(|v| v.name).collect();
    workflow.analysis = Some(analysis);
    workflow.findings = findings;

    tracing::info!(
        flow = %flow.qualified_name,
        actions = workflow.flatten().len(),
        findings = workflow.findings.len(),
        blocked = workflow.is_blocked(),
        "Transformed flow"
    );
    workflow
}

/// Parses and transforms one orchestration source.
pub fn transform_source(
    source: &str,
    bindings: &BindingSet,
    options: &TransformOptions,
) -> Result<Workflow, MalformedSource> {
    let flow = parse_orchestration(source)?;
    Ok(transform_flow(&flow, bindings, options))
}

/// Transforms independent sources on the rayon pool, one outcome per source
/// in input order.
pub fn transform_batch<S: AsRef<str> + Sync>(
    sources: &[S],
    bindings: &BindingSet,
    options: &TransformOptions,
) -> Vec<Result<Workflow, MalformedSource>> {
    sources
        .par_iter()
        .map(|source| transform_source(source.as_ref(), bindings, options))
        .collect()
}

/// Numbers actions in pre-order, so earlier actions get lower sequences.
pub(crate) fn assign_sequences(actions: &mut [Action]) {
    fn visit(action: &mut Action, next: &mut u32) {
        action.sequence = *next;
        *next += 1;
        for child in action.nested_mut() {
            visit(child, next);
        }
    }
    let mut next = 0;
    for action in actions {
        visit(action, &mut next);
    }
}
