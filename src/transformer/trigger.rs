use super::connector::is_edi_envelope;
use super::endpoint::{Endpoint, receive_endpoint};
use super::names::NameRegistry;
use crate::analyzer::{PatternAnalysis, TriggerPattern};
use crate::bindings::BindingSet;
use crate::expression::naming::sanitize_name;
use crate::model::{NodeKind, PortDirection, ProcessFlow, ReceiveShape};
use crate::workflow::{Action, ActionKind, Trigger};
use itertools::Itertools;

/// Name of the generic inbound trigger.
pub const REQUEST_TRIGGER_NAME: &str = "manual";

/// The chosen trigger plus actions that must run before the lowered body.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerSelection {
    pub trigger: Trigger,
    /// EDI decoding and similar work on the inbound message.
    pub preamble: Vec<Action>,
    /// Message delivered by the trigger, registered as its output.
    pub initial_message: Option<String>,
}

pub(super) fn select_trigger(
    flow: &ProcessFlow,
    analysis: &PatternAnalysis,
    bindings: &BindingSet,
    callable: bool,
    names: &mut NameRegistry,
) -> TriggerSelection {
    let primary = analysis.primary_receive.and_then(|id| {
        let mut found = None;
        flow.walk(&mut |node| {
            if node.id == id {
                found = node.as_receive().cloned();
            }
        });
        found
    });

    let Some(receive) = primary else {
        return TriggerSelection {
            trigger: Trigger::request(REQUEST_TRIGGER_NAME),
            preamble: Vec::new(),
            initial_message: None,
        };
    };

    if callable || analysis.pattern == TriggerPattern::Callable {
        let mut trigger = Trigger::request(REQUEST_TRIGGER_NAME);
        trigger.message_name = Some(receive.message.clone());
        return TriggerSelection {
            trigger,
            preamble: Vec::new(),
            initial_message: Some(receive.message),
        };
    }

    let endpoint = receive_endpoint(flow, &receive.port, bindings);
    let mut trigger = build_trigger(flow, &receive, endpoint.as_ref());
    trigger.session_aware = analysis.requires_session;
    if analysis.pattern == TriggerPattern::ListenFirstToComplete {
        trigger
            .properties
            .insert("messageTypes".to_string(), listen_message_types(flow, analysis));
    }

    let mut preamble = Vec::new();
    if let Some(endpoint) = &endpoint {
        if is_edi_envelope(endpoint.address.as_deref(), endpoint.pipeline.as_deref()) {
            let mut decode = Action::new(names.claim("Decode_EDI_envelope"), ActionKind::EdiDecode)
                .with_details(endpoint.pipeline.clone().unwrap_or_default());
            decode.input_message_name = Some(receive.message.clone());
            decode.output_message_name = Some(receive.message.clone());
            preamble.push(decode);
        }
    }

    tracing::debug!(
        flow = %flow.qualified_name,
        trigger = %trigger.name,
        kind = ?trigger.kind,
        "Selected trigger"
    );
    TriggerSelection {
        trigger,
        preamble,
        initial_message: Some(receive.message),
    }
}

fn build_trigger(
    flow: &ProcessFlow,
    receive: &ReceiveShape,
    endpoint: Option<&Endpoint>,
) -> Trigger {
    let name = format!("When_{}_receives", sanitize_name(&receive.port));
    let declared = flow.port(&receive.port);

    let mut trigger = match endpoint {
        Some(endpoint) => {
            let mut trigger =
                Trigger::connector(&name, endpoint.connector_kind(), endpoint.address.clone());
            trigger.polling_interval = endpoint.polling_interval.clone();
            if let Some(transport) = &endpoint.transport {
                trigger
                    .properties
                    .insert("transport".to_string(), transport.clone());
            }
            trigger
        }
        None => Trigger::request(REQUEST_TRIGGER_NAME),
    };
    trigger.message_name = Some(receive.message.clone());
    trigger
        .properties
        .insert("port".to_string(), receive.port.clone());

    if let Some(port) = declared {
        if port.direction == PortDirection::ReceiveSend {
            trigger
                .properties
                .insert("responseRequired".to_string(), "true".to_string());
        }
        if let Some(folder) = &port.file_folder {
            trigger
                .properties
                .insert("folder".to_string(), folder.clone());
        }
        if let Some(mask) = &port.file_mask {
            trigger.properties.insert("fileMask".to_string(), mask.clone());
        }
    }
    trigger
}

/// Comma-separated message types of every activating receive.
fn listen_message_types(flow: &ProcessFlow, analysis: &PatternAnalysis) -> String {
    let mut ids = analysis.primary_receive.into_iter().collect::<Vec<_>>();
    ids.extend(analysis.secondary_receives.iter().copied());
    let mut types = Vec::new();
    flow.walk(&mut |node| {
        if let NodeKind::Receive(receive) = &node.kind {
            if ids.contains(&node.id) {
                types.push(message_type(flow, &receive.message));
            }
        }
    });
    types.into_iter().unique().join(",")
}

/// Declared type of a message, or the message name when undeclared.
pub(super) fn message_type(flow: &ProcessFlow, message: &str) -> String {
    flow.messages
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(message) && !m.message_type.is_empty())
        .map(|m| m.message_type.clone())
        .unwrap_or_else(|| message.to_string())
}
