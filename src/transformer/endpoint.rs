//! Physical endpoints behind logical ports, and the outbound action chain.

use super::connector::infer_connector;
use super::names::NameRegistry;
use crate::bindings::{BindingSet, ReceiveLocation, SendPort};
use crate::expression::naming::sanitize_name;
use crate::model::{BindingKind, ProcessFlow};
use crate::workflow::{Action, ActionKind, ConnectorKind};

/// Adapter settings resolved for one port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct Endpoint {
    pub transport: Option<String>,
    pub address: Option<String>,
    pub pipeline: Option<String>,
    pub polling_interval: Option<String>,
    pub subsystem_hint: Option<String>,
    pub transforms: Vec<String>,
}

impl Endpoint {
    pub(super) fn connector_kind(&self) -> ConnectorKind {
        infer_connector(
            self.transport.as_deref(),
            self.address.as_deref(),
            self.subsystem_hint.as_deref(),
        )
    }
}

impl From<&ReceiveLocation> for Endpoint {
    fn from(location: &ReceiveLocation) -> Self {
        Self {
            transport: non_empty(&location.transport_type),
            address: non_empty(&location.address),
            pipeline: location.pipeline.clone(),
            polling_interval: location.polling_interval.clone(),
            subsystem_hint: location.subsystem_hint.clone(),
            transforms: Vec::new(),
        }
    }
}

impl From<&SendPort> for Endpoint {
    fn from(port: &SendPort) -> Self {
        Self {
            transport: non_empty(&port.transport_type),
            address: non_empty(&port.address),
            pipeline: port.pipeline.clone(),
            polling_interval: None,
            subsystem_hint: port.subsystem_hint.clone(),
            transforms: port.transforms.clone(),
        }
    }
}

/// Endpoint of an inbound port: the bound receive location when binding
/// metadata names one, else a physical binding declared in the flow.
pub(super) fn receive_endpoint(
    flow: &ProcessFlow,
    port: &str,
    bindings: &BindingSet,
) -> Option<Endpoint> {
    let bound = bindings
        .bound_port(&flow.qualified_name, port)
        .or_else(|| bindings.bound_port(&flow.name, port));
    if let Some(location) = bound.and_then(|p| bindings.preferred_location(p)) {
        return Some(Endpoint::from(location));
    }
    declared_endpoint(flow, port)
}

/// Endpoint of an outbound port, including its outbound transform chain.
pub(super) fn send_endpoint(
    flow: &ProcessFlow,
    port: &str,
    bindings: &BindingSet,
) -> Option<Endpoint> {
    let bound = bindings
        .bound_port(&flow.qualified_name, port)
        .or_else(|| bindings.bound_port(&flow.name, port));
    if let Some(send_port) = bound.and_then(|p| bindings.send_port(p)) {
        return Some(Endpoint::from(send_port));
    }
    declared_endpoint(flow, port)
}

fn declared_endpoint(flow: &ProcessFlow, port: &str) -> Option<Endpoint> {
    let declared = flow.port(port)?;
    if declared.binding_kind != BindingKind::Physical {
        return None;
    }
    Some(Endpoint {
        transport: declared.transport.clone(),
        address: declared.address.clone(),
        pipeline: declared.pipeline.clone(),
        ..Endpoint::default()
    })
}

/// The transforms configured on an endpoint followed by the outbound action.
///
/// Each chained transform consumes the previous output; the final action
/// consumes the last one.
pub(super) fn outbound_actions(
    base_name: &str,
    kind: ActionKind,
    message: &str,
    endpoint: Option<&Endpoint>,
    names: &mut NameRegistry,
) -> Vec<Action> {
    let mut actions = Vec::new();
    let mut current = message.to_string();

    for map in endpoint.map(|e| e.transforms.as_slice()).unwrap_or_default() {
        let short = sanitize_name(map.rsplit('.').next().unwrap_or(map));
        let mut transform =
            Action::new(names.claim(&format!("Transform_{}", short)), ActionKind::Transform)
                .with_details(map.as_str());
        transform.input_message_name = Some(current.clone());
        current = format!("{}_{}", current, short);
        transform.output_message_name = Some(current.clone());
        actions.push(transform);
    }

    let mut outbound = Action::new(names.claim(base_name), kind);
    outbound.input_message_name = Some(current);
    if let Some(endpoint) = endpoint {
        outbound.connector_kind = Some(endpoint.connector_kind());
        outbound.target_address = endpoint.address.clone();
        outbound.details = endpoint.transport.clone().unwrap_or_default();
        if let Some(pipeline) = &endpoint.pipeline {
            outbound
                .property_assignments
                .insert("pipeline".to_string(), pipeline.clone());
        }
    }
    actions.push(outbound);
    actions
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
