//! Workflows derived from binding metadata alone.
//!
//! Without an orchestration, every receive port becomes a workflow whose
//! actions deliver to the send ports subscribed to it. Send ports that route
//! on a shared property are grouped into a content-based routing workflow, and
//! anything left unsubscribed lands in one catch-all workflow.

use super::assign_sequences;
use super::connector::is_edi_envelope;
use super::dataflow::resolve_data_flow;
use super::endpoint::{Endpoint, outbound_actions};
use super::names::NameRegistry;
use super::trigger::REQUEST_TRIGGER_NAME;
use crate::bindings::{BindingSet, ReceiveLocation, SendPort};
use crate::expression::naming::sanitize_name;
use crate::workflow::{Action, ActionKind, Finding, Severity, Trigger, Workflow};
use indexmap::IndexMap;

/// Placeholder name of the message delivered by a synthesized trigger.
pub const INBOUND_MESSAGE: &str = "InboundMessage";

/// Name of the workflow collecting unsubscribed send ports.
pub const CATCH_ALL_WORKFLOW: &str = "Unbound_send_ports";

/// Send ports that dispatch on distinct values of one message property.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingGroup<'a> {
    pub property: String,
    /// Case value -> send ports matching it, in binding order.
    pub cases: IndexMap<String, Vec<&'a SendPort>>,
}

impl RoutingGroup<'_> {
    fn contains(&self, port: &SendPort) -> bool {
        self.cases
            .values()
            .flatten()
            .any(|p| p.name.eq_ignore_ascii_case(&port.name))
    }
}

/// Clusters send ports whose equality filters key on the same non-routing
/// property with at least two distinct values.
pub fn routing_groups(bindings: &BindingSet) -> Vec<RoutingGroup<'_>> {
    let mut by_property: IndexMap<String, IndexMap<String, Vec<&SendPort>>> = IndexMap::new();
    for port in &bindings.send_ports {
        for filter in port.routing_filters() {
            let cases = by_property.entry(filter.property.clone()).or_default();
            let members = cases.entry(filter.value.clone()).or_default();
            if !members.iter().any(|p| p.name == port.name) {
                members.push(port);
            }
        }
    }

    let mut groups: Vec<RoutingGroup> = Vec::new();
    for (property, cases) in by_property {
        if cases.len() < 2 {
            continue;
        }
        // A port already routed by an earlier property stays there.
        let cases: IndexMap<String, Vec<&SendPort>> = cases
            .into_iter()
            .map(|(value, ports)| {
                let ports = ports
                    .into_iter()
                    .filter(|p| !groups.iter().any(|g| g.contains(p)))
                    .collect::<Vec<_>>();
                (value, ports)
            })
            .filter(|(_, ports)| !ports.is_empty())
            .collect();
        if cases.len() >= 2 {
            groups.push(RoutingGroup { property, cases });
        }
    }
    groups
}

/// Builds workflows for a binding set that comes without an orchestration.
pub fn synthesize_workflows(bindings: &BindingSet) -> Vec<Workflow> {
    let groups = routing_groups(bindings);
    let receive_ports = bindings.receive_ports();
    let mut workflows = Vec::new();
    let mut covered_ports: Vec<&str> = Vec::new();

    for group in &groups {
        let location = routing_location(bindings, group);
        if let Some(location) = location {
            covered_ports.push(&location.receive_port);
        }
        workflows.push(routing_workflow(bindings, group, location));
    }

    for port in &receive_ports {
        if covered_ports.iter().any(|c| c.eq_ignore_ascii_case(port)) {
            tracing::debug!(port = %port, "Receive port covered by a routing workflow");
            continue;
        }
        let Some(location) = bindings.preferred_location(port) else {
            continue;
        };
        let subscribers: Vec<&SendPort> = bindings
            .send_ports
            .iter()
            .filter(|sp| !groups.iter().any(|g| g.contains(sp)))
            .filter(|sp| {
                sp.subscribed_receive_ports()
                    .iter()
                    .any(|r| r.eq_ignore_ascii_case(port))
            })
            .collect();
        workflows.push(port_workflow(port, location, &subscribers));
    }

    let unbound: Vec<&SendPort> = bindings
        .send_ports
        .iter()
        .filter(|sp| !groups.iter().any(|g| g.contains(sp)))
        .filter(|sp| {
            !sp.subscribed_receive_ports()
                .iter()
                .any(|r| receive_ports.iter().any(|p| p.eq_ignore_ascii_case(r)))
        })
        .collect();
    if !unbound.is_empty() {
        workflows.push(catch_all_workflow(&unbound));
    }

    tracing::info!(
        workflows = workflows.len(),
        routing_groups = groups.len(),
        "Synthesized workflows from bindings"
    );
    workflows
}

/// The receive location that feeds a routing group.
///
/// When the group's send ports all subscribe to exactly one known receive
/// port, its preferred location wins. Otherwise the first enabled location is
/// used, else the first listed.
fn routing_location<'a>(
    bindings: &'a BindingSet,
    group: &RoutingGroup,
) -> Option<&'a ReceiveLocation> {
    let mut subscribed: Vec<&str> = Vec::new();
    for port in group.cases.values().flatten() {
        for receive_port in port.subscribed_receive_ports() {
            if !subscribed.iter().any(|s| s.eq_ignore_ascii_case(receive_port)) {
                subscribed.push(receive_port);
            }
        }
    }
    if let [single] = subscribed.as_slice() {
        if let Some(location) = bindings.preferred_location(single) {
            return Some(location);
        }
    }
    bindings
        .receive_locations
        .iter()
        .find(|l| l.enabled)
        .or_else(|| bindings.receive_locations.first())
}

fn routing_workflow(
    bindings: &BindingSet,
    group: &RoutingGroup,
    location: Option<&ReceiveLocation>,
) -> Workflow {
    let mut names = NameRegistry::default();
    let property = group.property.rsplit('.').next().unwrap_or(&group.property);
    let name = format!("Route_by_{}", sanitize_name(property));
    let (trigger, mut actions) = location_trigger(location, &mut names);

    let mut containers = Vec::new();
    for (value, ports) in &group.cases {
        let mut children = Vec::new();
        for port in ports {
            children.extend(send_port_actions(port, &mut names));
        }
        let mut case = Action::container(
            names.claim(&format!("Case_{}", value)),
            ActionKind::Scope,
            children,
        );
        case.case_value = Some(value.clone());
        containers.push(case);
    }

    // Subscribers of the routed receive port without a filter on this property.
    let mut default_children = Vec::new();
    if let Some(location) = location {
        for port in &bindings.send_ports {
            let routed_elsewhere = port
                .routing_filters()
                .any(|f| f.property.eq_ignore_ascii_case(&group.property));
            let subscribes = port
                .subscribed_receive_ports()
                .iter()
                .any(|r| r.eq_ignore_ascii_case(&location.receive_port));
            if subscribes && !routed_elsewhere && !group.contains(port) {
                default_children.extend(send_port_actions(port, &mut names));
            }
        }
    }
    containers.push(Action::container(
        names.claim("Case_default"),
        ActionKind::Scope,
        default_children,
    ));

    let switch_name = names.claim(&format!("Switch_on_{}", property));
    let mut switch = Action::new(switch_name, ActionKind::Switch).with_details(format!(
        "triggerOutputs()?['properties']?['{}']",
        group.property
    ));
    switch.children = containers;
    actions.push(switch);

    let mut workflow = finish(&name, trigger, actions);
    if location.is_none() {
        workflow.findings.push(Finding::new(
            Severity::Warning,
            name,
            "No receive location available; routing workflow uses a generic inbound trigger",
        ));
    }
    workflow
}

fn port_workflow(port: &str, location: &ReceiveLocation, subscribers: &[&SendPort]) -> Workflow {
    let mut names = NameRegistry::default();
    let (trigger, mut actions) = location_trigger(Some(location), &mut names);
    for send_port in subscribers {
        actions.extend(send_port_actions(send_port, &mut names));
    }
    finish(port, trigger, actions)
}

fn catch_all_workflow(ports: &[&SendPort]) -> Workflow {
    let mut names = NameRegistry::default();
    let mut actions = Vec::new();
    for port in ports {
        actions.extend(send_port_actions(port, &mut names));
    }
    let mut trigger = Trigger::request(REQUEST_TRIGGER_NAME);
    trigger.message_name = Some(INBOUND_MESSAGE.to_string());
    finish(CATCH_ALL_WORKFLOW, trigger, actions)
}

/// Trigger for a receive location, plus an EDI decode step when its address
/// or pipeline carries an envelope.
fn location_trigger(
    location: Option<&ReceiveLocation>,
    names: &mut NameRegistry,
) -> (Trigger, Vec<Action>) {
    let Some(location) = location else {
        let mut trigger = Trigger::request(REQUEST_TRIGGER_NAME);
        trigger.message_name = Some(INBOUND_MESSAGE.to_string());
        return (trigger, Vec::new());
    };

    let endpoint = Endpoint::from(location);
    let mut trigger = Trigger::connector(
        &format!("When_{}_receives", sanitize_name(&location.name)),
        endpoint.connector_kind(),
        endpoint.address.clone(),
    );
    trigger.message_name = Some(INBOUND_MESSAGE.to_string());
    trigger.polling_interval = location.polling_interval.clone();
    trigger
        .properties
        .insert("receivePort".to_string(), location.receive_port.clone());
    if let Some(transport) = &endpoint.transport {
        trigger
            .properties
            .insert("transport".to_string(), transport.clone());
    }

    let mut preamble = Vec::new();
    if is_edi_envelope(endpoint.address.as_deref(), endpoint.pipeline.as_deref()) {
        let mut decode = Action::new(names.claim("Decode_EDI_envelope"), ActionKind::EdiDecode)
            .with_details(endpoint.pipeline.clone().unwrap_or_default());
        decode.input_message_name = Some(INBOUND_MESSAGE.to_string());
        decode.output_message_name = Some(INBOUND_MESSAGE.to_string());
        preamble.push(decode);
    }
    (trigger, preamble)
}

fn send_port_actions(port: &SendPort, names: &mut NameRegistry) -> Vec<Action> {
    let endpoint = Endpoint::from(port);
    outbound_actions(
        &format!("Send_to_{}", port.name),
        ActionKind::Send,
        INBOUND_MESSAGE,
        Some(&endpoint),
        names,
    )
}

fn finish(name: &str, trigger: Trigger, mut actions: Vec<Action>) -> Workflow {
    resolve_data_flow(&mut actions, Some(INBOUND_MESSAGE));
    assign_sequences(&mut actions);
    let mut workflow = Workflow::new(&sanitize_name(name), trigger);
    workflow.actions = actions;
    workflow
}
