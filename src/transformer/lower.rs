//! Recursive lowering of process-flow nodes into target actions.

use super::condition::{extract_loop_threshold, invert_condition};
use super::endpoint::{outbound_actions, receive_endpoint, send_endpoint};
use super::names::NameRegistry;
use super::trigger::message_type;
use crate::analyzer::PatternAnalysis;
use crate::bindings::BindingSet;
use crate::config::TransformOptions;
use crate::expression::{ExpressionTranslator, literal, scan};
use crate::model::{NodeKind, PortDirection, ProcessFlow, ProcessNode, TransactionKind};
use crate::workflow::{Action, ActionKind, Finding, Severity};
use regex::Regex;
use std::sync::LazyLock;

/// Message-type lookup the trigger exposes for listen dispatch.
const MESSAGE_TYPE_EXPRESSION: &str = "triggerOutputs()?['headers']?['MessageType']";

static TIMESPAN_CTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^new\s+(System\.)?TimeSpan\s*\(\s*(\d+(?:\s*,\s*\d+)*)\s*\)$")
        .expect("valid regex")
});
static TIMESPAN_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(System\.)?TimeSpan\.From(Days|Hours|Minutes|Seconds|Milliseconds)\s*\(\s*(\d+)\s*\)$")
        .expect("valid regex")
});
static ASSIGNED_ROOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)").expect("valid regex"));

/// Names of the unit under transformation, used to detect self-invocation.
///
/// Passed explicitly into lowering so concurrent transformations never share it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitContext {
    pub name: String,
    pub qualified_name: String,
}

impl UnitContext {
    pub fn new(name: &str, qualified_name: &str) -> Self {
        Self {
            name: name.to_string(),
            qualified_name: qualified_name.to_string(),
        }
    }

    pub fn for_flow(flow: &ProcessFlow) -> Self {
        Self::new(&flow.name, &flow.qualified_name)
    }

    /// Whether a call target names this unit, by short or qualified name, in
    /// either direction of a dotted-suffix match.
    pub fn is_self_reference(&self, target: &str) -> bool {
        let target = target.trim();
        if target.is_empty() {
            return false;
        }
        [self.name.as_str(), self.qualified_name.as_str()]
            .iter()
            .filter(|own| !own.is_empty())
            .any(|own| {
                target == *own
                    || target.ends_with(&format!(".{}", own))
                    || own.ends_with(&format!(".{}", target))
            })
    }
}

pub(super) struct Lowerer<'a> {
    flow: &'a ProcessFlow,
    unit: &'a UnitContext,
    analysis: &'a PatternAnalysis,
    bindings: &'a BindingSet,
    options: &'a TransformOptions,
    translator: ExpressionTranslator<'a>,
    names: &'a mut NameRegistry,
    findings: Vec<Finding>,
    /// Decision branches currently open; names inside them carry the node id.
    branch_depth: usize,
}

impl<'a> Lowerer<'a> {
    pub(super) fn new(
        flow: &'a ProcessFlow,
        unit: &'a UnitContext,
        analysis: &'a PatternAnalysis,
        bindings: &'a BindingSet,
        options: &'a TransformOptions,
        translator: ExpressionTranslator<'a>,
        names: &'a mut NameRegistry,
    ) -> Self {
        Self {
            flow,
            unit,
            analysis,
            bindings,
            options,
            translator,
            names,
            findings: Vec::new(),
            branch_depth: 0,
        }
    }

    pub(super) fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    pub(super) fn lower_nodes(&mut self, nodes: &[ProcessNode]) -> Vec<Action> {
        let mut actions = Vec::new();
        for node in nodes {
            actions.extend(self.lower_node(node));
        }
        actions
    }

    fn lower_node(&mut self, node: &ProcessNode) -> Vec<Action> {
        match &node.kind {
            NodeKind::Receive(receive) => {
                if Some(node.id) == self.analysis.primary_receive {
                    return Vec::new();
                }
                let mut action = Action::new(self.name_for(node), ActionKind::ReceiveMessage)
                    .with_details(receive.operation.as_str());
                action.output_message_name = Some(receive.message.clone());
                if let Some(endpoint) = receive_endpoint(self.flow, &receive.port, self.bindings) {
                    action.connector_kind = Some(endpoint.connector_kind());
                    action.target_address = endpoint.address.clone();
                }
                action
                    .property_assignments
                    .insert("port".to_string(), receive.port.clone());
                if !receive.follows.is_empty() {
                    action
                        .property_assignments
                        .insert("correlation".to_string(), receive.follows.join(","));
                }
                vec![action]
            }
            NodeKind::Send { port, message, .. } => {
                let responds = self
                    .flow
                    .port(port)
                    .is_some_and(|p| p.direction == PortDirection::ReceiveSend);
                let (kind, endpoint) = if responds {
                    (ActionKind::Response, None)
                } else {
                    (
                        ActionKind::Send,
                        send_endpoint(self.flow, port, self.bindings),
                    )
                };
                let base = self.base_name(node);
                let mut actions =
                    outbound_actions(&base, kind, message, endpoint.as_ref(), self.names);
                if let Some(outbound) = actions.last_mut() {
                    outbound
                        .property_assignments
                        .insert("port".to_string(), port.clone());
                }
                actions
            }
            NodeKind::Decide {
                expression,
                true_branch,
                false_branch,
            } => {
                let name = self.name_for(node);
                let details = self.translate(&name, expression);
                self.branch_depth += 1;
                let when_true = self.lower_nodes(true_branch);
                let when_false = self.lower_nodes(false_branch);
                self.branch_depth -= 1;

                let mut action = Action::new(name, ActionKind::Condition).with_details(details);
                action.true_branch = Some(when_true);
                action.false_branch = Some(when_false);
                vec![action]
            }
            NodeKind::Switch {
                expression,
                cases,
                default,
            } => {
                let name = self.name_for(node);
                let details = self.translate(&name, expression);
                let mut containers = Vec::with_capacity(cases.len() + 1);
                for (value, nodes) in cases {
                    let children = self.lower_nodes(nodes);
                    let mut case = Action::container(
                        self.names.claim(&format!("{}_case_{}", name, value)),
                        ActionKind::Scope,
                        children,
                    );
                    case.case_value = Some(value.clone());
                    containers.push(case);
                }
                let children = self.lower_nodes(default);
                containers.push(Action::container(
                    self.names.claim(&format!("{}_default", name)),
                    ActionKind::Scope,
                    children,
                ));

                let mut action = Action::new(name, ActionKind::Switch).with_details(details);
                action.children = containers;
                vec![action]
            }
            NodeKind::Loop {
                expression,
                collection_expr,
                item_var,
            } => {
                if collection_expr.trim().is_empty() {
                    return vec![self.lower_loop(node, expression)];
                }
                let name = self.name_for(node);
                let details = self.translate(&name, collection_expr);
                let mut action = Action::new(name, ActionKind::Foreach).with_details(details);
                if !item_var.trim().is_empty() {
                    action
                        .property_assignments
                        .insert("item".to_string(), item_var.trim().to_string());
                }
                action.children = self.lower_nodes(&node.children);
                vec![action]
            }
            NodeKind::While { expression } | NodeKind::Until { expression } => {
                vec![self.lower_loop(node, expression)]
            }
            NodeKind::Parallel => {
                let name = self.name_for(node);
                let mut action = Action::new(name, ActionKind::Parallel);
                action.children = self.lower_nodes(&node.children);
                vec![action]
            }
            NodeKind::Listen { branches } => vec![self.lower_listen(node, branches)],
            NodeKind::Branch | NodeKind::Group | NodeKind::Task => {
                let name = self.name_for(node);
                let children = self.lower_nodes(&node.children);
                vec![Action::container(name, ActionKind::Scope, children)]
            }
            NodeKind::Construct {
                constructed_messages,
                inner,
            } => self.lower_construct(node, constructed_messages, inner),
            NodeKind::Transform {
                class_ref,
                input_messages,
                output_messages,
            } => {
                let mut action = Action::new(self.name_for(node), ActionKind::Transform)
                    .with_details(class_ref.as_str());
                action.input_message_name = input_messages.first().cloned();
                action.output_message_name = output_messages.first().cloned();
                if input_messages.len() > 1 {
                    action
                        .property_assignments
                        .insert("additionalInputs".to_string(), input_messages[1..].join(","));
                }
                vec![action]
            }
            NodeKind::VariableDecl { .. } | NodeKind::CorrelationDecl { .. } => Vec::new(),
            NodeKind::MessageAssign { expression } => {
                let name = self.name_for(node);
                let mut action = Action::new(name, ActionKind::ConstructMessage);
                self.merge_assignments(&mut action, expression);
                vec![action]
            }
            NodeKind::VariableAssign { expression } => self.lower_variable_assign(node, expression),
            NodeKind::Scope { transaction } => {
                let name = self.name_for(node);
                let (catches, body): (Vec<&ProcessNode>, Vec<&ProcessNode>) = node
                    .children
                    .iter()
                    .partition(|c| matches!(c.kind, NodeKind::Catch { .. }));
                let mut children = Vec::new();
                for child in body {
                    children.extend(self.lower_node(child));
                }
                let details = match transaction {
                    TransactionKind::None => "",
                    TransactionKind::Atomic => "AtomicTransaction",
                    TransactionKind::LongRunning => "LongRunningTransaction",
                };
                let scope = Action::container(name.clone(), ActionKind::Scope, children)
                    .with_details(details);
                let mut lowered = vec![scope];
                for catch in catches {
                    for mut handler in self.lower_node(catch) {
                        handler
                            .property_assignments
                            .insert("runAfter".to_string(), format!("{}:Failed,TimedOut", name));
                        lowered.push(handler);
                    }
                }
                lowered
            }
            NodeKind::CompensationScope => {
                let name = self.name_for(node);
                let children = self.lower_nodes(&node.children);
                vec![
                    Action::container(name, ActionKind::Scope, children)
                        .with_details("Compensation"),
                ]
            }
            NodeKind::Catch {
                exception_type,
                exception_var,
            } => {
                let name = self.name_for(node);
                let children = self.lower_nodes(&node.children);
                let details = if exception_type.is_empty() {
                    "General Exception"
                } else {
                    exception_type.as_str()
                };
                let mut action =
                    Action::container(name, ActionKind::CatchScope, children).with_details(details);
                if !exception_var.is_empty() {
                    action
                        .property_assignments
                        .insert("exceptionVariable".to_string(), exception_var.clone());
                }
                vec![action]
            }
            NodeKind::Call { target_name } | NodeKind::Start { target_name } => {
                if self.unit.is_self_reference(target_name) {
                    return vec![self.recursion_loop(node, target_name)];
                }
                let mut action = Action::new(self.name_for(node), ActionKind::CallWorkflow)
                    .with_details(target_name.as_str());
                action.target_address = Some(target_name.clone());
                if matches!(node.kind, NodeKind::Start { .. }) {
                    action
                        .property_assignments
                        .insert("waitForCompletion".to_string(), "false".to_string());
                }
                vec![action]
            }
            NodeKind::Terminate { error_message } => {
                let name = self.name_for(node);
                let details = if error_message.trim().is_empty() {
                    String::new()
                } else {
                    self.translate(&name, error_message)
                };
                vec![terminate(name, details, "Cancelled")]
            }
            NodeKind::Throw { exception_expr } => {
                let name = self.name_for(node);
                vec![terminate(name, literal(exception_expr.trim()), "Failed")]
            }
            NodeKind::Suspend { error_message } => {
                let name = self.name_for(node);
                vec![terminate(name, literal(error_message.trim()), "Suspended")]
            }
            NodeKind::Delay { expression } => {
                let name = self.name_for(node);
                let mut action = Action::new(name.clone(), ActionKind::Delay);
                match iso_duration(expression.trim()) {
                    Some(interval) => {
                        action
                            .property_assignments
                            .insert("interval".to_string(), interval.clone());
                        action.details = interval;
                    }
                    None => action.details = self.translate(&name, expression),
                }
                vec![action]
            }
            NodeKind::Compensate { target } => {
                vec![
                    Action::new(self.name_for(node), ActionKind::Compensate)
                        .with_details(target.as_str()),
                ]
            }
            NodeKind::CallPolicy { policy_name } => {
                vec![Action::new(self.name_for(node), ActionKind::CallRules)
                    .with_details(policy_name.as_str())]
            }
            NodeKind::Fallback { raw_kind } => {
                let name = self.name_for(node);
                self.findings.push(Finding::new(
                    Severity::Warning,
                    name.clone(),
                    format!("Unrecognized shape '{}' kept as a marker", raw_kind),
                ));
                tracing::warn!(
                    shape = %raw_kind,
                    action = %name,
                    "Unrecognized shape lowered to marker"
                );
                let mut action = Action::new(name, ActionKind::Marker)
                    .with_details(format!("Unrecognized shape '{}'", raw_kind));
                action.children = self.lower_nodes(&node.children);
                vec![action]
            }
        }
    }

    /// Loops become target until-loops, which stop once their guard holds, so
    /// the source guard is inverted first.
    fn lower_loop(&mut self, node: &ProcessNode, expression: &str) -> Action {
        let name = self.name_for(node);
        let guard = if !expression.trim().is_empty() {
            invert_condition(expression)
        } else {
            expression.to_string()
        };
        let details = self.translate(&name, &guard);
        let limit = extract_loop_threshold(expression)
            .map(|bound| self.options.clamp_loop_limit(bound))
            .unwrap_or(self.options.default_loop_limit);

        let mut action = Action::new(name, ActionKind::Until).with_details(details);
        action.loop_threshold = Some(limit);
        action.children = self.lower_nodes(&node.children);
        action
    }

    /// A listen whose branches open with activating receives dispatches on
    /// the triggering message type; branches without one form the default.
    /// Any other listen becomes a scope of branch containers.
    fn lower_listen(&mut self, node: &ProcessNode, branches: &[ProcessNode]) -> Action {
        let name = self.name_for(node);
        let opens_with_trigger = |branch: &ProcessNode| {
            branch
                .children
                .first()
                .is_some_and(|first| first.is_activating_receive())
        };

        if !branches.iter().any(opens_with_trigger) {
            let containers = self.lower_nodes(branches);
            return Action::container(name, ActionKind::Scope, containers).with_details("Listen");
        }

        let mut cases = Vec::new();
        let mut fallback = Vec::new();
        for branch in branches {
            match branch.children.split_first() {
                Some((first, rest)) if first.is_activating_receive() => {
                    let message = first
                        .as_receive()
                        .map(|r| message_type(self.flow, &r.message))
                        .unwrap_or_default();
                    let children = self.lower_nodes(rest);
                    let mut case = Action::container(
                        self.names.claim(&format!("{}_{}", name, message)),
                        ActionKind::Scope,
                        children,
                    );
                    case.case_value = Some(message);
                    cases.push(case);
                }
                _ => fallback.extend(self.lower_nodes(&branch.children)),
            }
        }
        cases.push(Action::container(
            self.names.claim(&format!("{}_default", name)),
            ActionKind::Scope,
            fallback,
        ));

        let mut action =
            Action::new(name, ActionKind::Switch).with_details(MESSAGE_TYPE_EXPRESSION);
        action.children = cases;
        action
    }

    fn lower_construct(
        &mut self,
        node: &ProcessNode,
        constructed_messages: &[String],
        inner: &[ProcessNode],
    ) -> Vec<Action> {
        let name = self.name_for(node);
        let constructed = constructed_messages.first().cloned();

        let transforms = inner
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Transform { .. }))
            .count();
        let assignments: Vec<&str> = inner
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::MessageAssign { expression } => Some(expression.as_str()),
                _ => None,
            })
            .collect();

        if let [single] = inner {
            let mut lowered = self.lower_node(single);
            if let Some(primary) = lowered.last_mut() {
                primary.name = name;
                if primary.output_message_name.is_none() {
                    primary.output_message_name = constructed;
                }
            }
            return lowered;
        }

        if transforms == 1
            && !assignments.is_empty()
            && transforms + assignments.len() == inner.len()
        {
            let Some(transform) = inner
                .iter()
                .find(|n| matches!(n.kind, NodeKind::Transform { .. }))
            else {
                return Vec::new();
            };
            let mut lowered = self.lower_node(transform);
            if let Some(primary) = lowered.last_mut() {
                primary.name = name;
                for expression in assignments {
                    self.merge_assignments(primary, expression);
                }
                if primary.output_message_name.is_none() {
                    primary.output_message_name = constructed;
                }
            }
            return lowered;
        }

        let mut action = Action::new(name, ActionKind::ConstructMessage)
            .with_details(constructed_messages.join(", "));
        action.output_message_name = constructed;
        action.children = self.lower_nodes(inner);
        vec![action]
    }

    /// Folds message assignment statements into an action's property map.
    fn merge_assignments(&mut self, action: &mut Action, expression: &str) {
        for statement in statements(expression) {
            match split_assignment(statement) {
                Some((target, _, value)) => {
                    let translated = self.translate(&action.name, value);
                    if action.output_message_name.is_none() {
                        action.output_message_name = ASSIGNED_ROOT
                            .captures(target)
                            .map(|c| c[1].to_string())
                            .filter(|root| self.flow.is_message(root));
                    }
                    action
                        .property_assignments
                        .insert(target.to_string(), translated);
                }
                None => {
                    self.degraded(&action.name, statement);
                    action
                        .property_assignments
                        .insert(
                            format!("statement_{}", action.property_assignments.len() + 1),
                            literal(statement),
                        );
                }
            }
        }
    }

    fn lower_variable_assign(&mut self, node: &ProcessNode, expression: &str) -> Vec<Action> {
        let base = self.base_name(node);
        let mut actions = Vec::new();
        for (index, statement) in statements(expression).into_iter().enumerate() {
            let name = if index == 0 {
                self.names.claim(&base)
            } else {
                self.names.claim(&format!("{}_{}", base, index + 1))
            };
            let target = split_assignment(statement)
                .filter(|(target, _, _)| scan::find_relational(target).is_none())
                .filter(|(target, _, _)| {
                    target
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_')
                });
            match target {
                Some((target, op, value)) => {
                    let value = if op.is_empty() {
                        value.to_string()
                    } else {
                        format!("{} {} ({})", target, op, value)
                    };
                    let details = self.translate(&name, &value);
                    let mut action =
                        Action::new(name, ActionKind::SetVariable).with_details(details);
                    action.variable_name = Some(target.to_string());
                    actions.push(action);
                }
                None => {
                    self.degraded(&name, statement);
                    actions.push(
                        Action::new(name, ActionKind::Marker).with_details(literal(statement)),
                    );
                }
            }
        }
        actions
    }

    /// A call into the unit being defined becomes a bounded retry loop.
    fn recursion_loop(&mut self, node: &ProcessNode, target: &str) -> Action {
        let name = self.name_for(node);
        let limit = self.options.recursion_retry_limit;
        self.findings.push(Finding::new(
            Severity::Info,
            name.clone(),
            format!(
                "Self-invocation of '{}' replaced by a loop capped at {} iterations",
                target, limit
            ),
        ));
        tracing::debug!(
            unit = %self.unit.qualified_name,
            action = %name,
            "Self-recursion lowered to loop"
        );

        let marker = Action::new(
            self.names.claim(&format!("{}_rerun", name)),
            ActionKind::Marker,
        )
        .with_details(format!("Re-run the body of {}", self.unit.qualified_name));
        let mut action = Action::new(name.clone(), ActionKind::Until)
            .with_details(format!("greaterOrEquals(iterationIndexes('{}'), {})", name, limit));
        action.loop_threshold = Some(limit);
        action.children = vec![marker];
        action
    }

    fn translate(&mut self, subject: &str, expression: &str) -> String {
        let translation = self.translator.translate_checked(expression);
        if translation.degraded {
            self.degraded(subject, expression);
        }
        translation.expression
    }

    fn degraded(&mut self, subject: &str, text: &str) {
        tracing::warn!(action = subject, "Expression kept as literal");
        self.findings.push(Finding::new(
            Severity::Warning,
            subject,
            format!("Expression kept as literal for manual review: {}", text.trim()),
        ));
    }

    fn base_name(&self, node: &ProcessNode) -> String {
        let base = if node.display_name.trim().is_empty() {
            node.kind.name()
        } else {
            node.display_name.as_str()
        };
        if self.branch_depth > 0 {
            format!("{}_{}", base, node.id)
        } else {
            base.to_string()
        }
    }

    fn name_for(&mut self, node: &ProcessNode) -> String {
        let base = self.base_name(node);
        self.names.claim(&base)
    }
}

fn terminate(name: String, details: String, status: &str) -> Action {
    let mut action = Action::new(name, ActionKind::Terminate).with_details(details);
    action
        .property_assignments
        .insert("runStatus".to_string(), status.to_string());
    action
}

/// Splits a statement block on top-level `;` and line breaks.
fn statements(expression: &str) -> Vec<&str> {
    scan::split_top_level(expression, ";")
        .into_iter()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.starts_with("//"))
        .collect()
}

/// `(target, compound operator, value)` of an assignment statement.
fn split_assignment(statement: &str) -> Option<(&str, &str, &str)> {
    let pos = scan::find_assignment(statement)?;
    let left = statement[..pos].trim_end();
    let value = statement[pos + 1..].trim();
    let (target, op) = match left.char_indices().last() {
        Some((at, c @ ('+' | '-' | '*' | '/'))) => {
            (left[..at].trim(), &left[at..at + c.len_utf8()])
        }
        _ => (left.trim(), ""),
    };
    if target.is_empty() || value.is_empty() {
        return None;
    }
    Some((target, op, value))
}

/// ISO-8601 duration for `new TimeSpan(..)` and `TimeSpan.FromX(n)` forms.
fn iso_duration(expr: &str) -> Option<String> {
    if let Some(caps) = TIMESPAN_FROM.captures(expr) {
        let amount: u64 = caps[3].parse().ok()?;
        return Some(match &caps[2] {
            "Days" => format!("P{}D", amount),
            "Hours" => format!("PT{}H", amount),
            "Minutes" => format!("PT{}M", amount),
            "Seconds" => format!("PT{}S", amount),
            _ if amount % 1000 == 0 => format!("PT{}S", amount / 1000),
            _ => format!("PT{}S", amount as f64 / 1000.0),
        });
    }

    let caps = TIMESPAN_CTOR.captures(expr)?;
    let parts: Vec<u64> = caps[2]
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<Vec<_>>>()?;
    let (days, hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (0, *h, *m, *s),
        [d, h, m, s] | [d, h, m, s, _] => (*d, *h, *m, *s),
        _ => return None,
    };
    let mut duration = String::from("P");
    if days > 0 {
        duration.push_str(&format!("{}D", days));
    }
    let mut time = String::new();
    for (value, unit) in [(hours, 'H'), (minutes, 'M'), (seconds, 'S')] {
        if value > 0 {
            time.push_str(&format!("{}{}", value, unit));
        }
    }
    if !time.is_empty() || days == 0 {
        duration.push('T');
        duration.push_str(if time.is_empty() { "0S" } else { &time });
    }
    Some(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timespan_forms() {
        assert_eq!(iso_duration("new System.TimeSpan(0, 0, 30)").as_deref(), Some("PT30S"));
        assert_eq!(iso_duration("new TimeSpan(1, 2, 0, 0)").as_deref(), Some("P1DT2H"));
        assert_eq!(iso_duration("TimeSpan.FromMinutes(5)").as_deref(), Some("PT5M"));
        assert_eq!(iso_duration("new TimeSpan(0, 0, 0)").as_deref(), Some("PT0S"));
        assert_eq!(iso_duration("delayValue"), None);
    }

    #[test]
    fn splits_compound_assignment() {
        assert_eq!(split_assignment("count += 1"), Some(("count", "+", "1")));
        assert_eq!(split_assignment("x = y == 2"), Some(("x", "", "y == 2")));
        assert_eq!(split_assignment("a == b"), None);
    }
}
