//! Producer/consumer wiring between lowered actions.

use crate::workflow::{Action, TRIGGER_SOURCE};
use ahash::AHashMap;

/// Points every consuming action at the action that produced its input.
///
/// Pass one records, in flattened pre-order, which action produces which
/// message; the trigger is registered up front as the producer of
/// `initial_message`. Pass two gives each consumer the nearest producer that
/// precedes it, falling back to the trigger sentinel.
pub fn resolve_data_flow(actions: &mut [Action], initial_message: Option<&str>) {
    let mut flattened = Vec::new();
    for action in actions.iter() {
        action.collect_into(&mut flattened);
    }

    // Message (lowercased) -> producers as (position, action name).
    let mut producers: AHashMap<String, Vec<(usize, String)>> = AHashMap::new();
    if let Some(message) = initial_message {
        producers
            .entry(message.to_ascii_lowercase())
            .or_default()
            .push((0, TRIGGER_SOURCE.to_string()));
    }
    for (position, action) in flattened.iter().enumerate() {
        if !action.kind.is_producer() {
            continue;
        }
        if let Some(message) = &action.output_message_name {
            producers
                .entry(message.to_ascii_lowercase())
                .or_default()
                .push((position + 1, action.name.clone()));
        }
    }

    let mut resolved: AHashMap<String, String> = AHashMap::new();
    for (position, action) in flattened.iter().enumerate() {
        if !action.kind.is_consumer() {
            continue;
        }
        let source = action
            .input_message_name
            .as_ref()
            .and_then(|message| producers.get(&message.to_ascii_lowercase()))
            .and_then(|candidates| {
                candidates
                    .iter()
                    .rev()
                    .find(|(at, name)| *at <= position && *name != action.name)
            })
            .map(|(_, name)| name.clone())
            .unwrap_or_else(|| TRIGGER_SOURCE.to_string());
        resolved.insert(action.name.clone(), source);
    }

    for action in actions.iter_mut() {
        apply(action, &resolved);
    }
    tracing::debug!(consumers = resolved.len(), "Resolved data flow");
}

fn apply(action: &mut Action, resolved: &AHashMap<String, String>) {
    if let Some(source) = resolved.get(&action.name) {
        action.input_source_action = Some(source.clone());
    }
    for child in action.nested_mut() {
        apply(child, resolved);
    }
}
