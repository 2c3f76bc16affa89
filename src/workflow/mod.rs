//! Action-graph model handed to the external code generator.

use crate::analyzer::PatternAnalysis;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

mod action;
mod connector;

pub use action::*;
pub use connector::*;

/// Input-source sentinel for actions that consume the triggering message.
pub const TRIGGER_SOURCE: &str = "trigger";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriggerKind {
    /// Generic inbound request; used for callable units and unbound flows.
    Request,
    /// A connector-specific polling or push trigger.
    Connector,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trigger {
    pub name: String,
    pub kind: TriggerKind,
    pub connector_kind: Option<ConnectorKind>,
    pub address: Option<String>,
    pub message_name: Option<String>,
    /// Session-aware messaging is needed to keep a convoy together.
    pub session_aware: bool,
    pub polling_interval: Option<String>,
    pub properties: IndexMap<String, String>,
}

impl Trigger {
    pub fn request(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: TriggerKind::Request,
            connector_kind: None,
            address: None,
            message_name: None,
            session_aware: false,
            polling_interval: None,
            properties: IndexMap::new(),
        }
    }

    pub fn connector(name: &str, connector_kind: ConnectorKind, address: Option<String>) -> Self {
        Self {
            kind: TriggerKind::Connector,
            connector_kind: Some(connector_kind),
            address,
            ..Self::request(name)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Blocking,
}

/// A locally visible note about degraded or rejected output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub subject: String,
    pub message: String,
}

impl Finding {
    pub fn new(severity: Severity, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

/// One target workflow: a single trigger and an ordered action list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workflow {
    pub name: String,
    pub trigger: Trigger,
    pub actions: Vec<Action>,
    pub variables: IndexSet<String>,
    pub analysis: Option<PatternAnalysis>,
    pub findings: Vec<Finding>,
}

impl Workflow {
    pub fn new(name: &str, trigger: Trigger) -> Self {
        Self {
            name: name.to_string(),
            trigger,
            actions: Vec::new(),
            variables: IndexSet::new(),
            analysis: None,
            findings: Vec::new(),
        }
    }

    /// All actions in pre-order, descending into children and branches.
    pub fn flatten(&self) -> Vec<&Action> {
        let mut out = Vec::new();
        for action in &self.actions {
            action.collect_into(&mut out);
        }
        out
    }

    pub fn find_action(&self, name: &str) -> Option<&Action> {
        self.flatten().into_iter().find(|a| a.name == name)
    }

    pub fn is_blocked(&self) -> bool {
        self.findings
            .iter()
            .any(|f| f.severity == Severity::Blocking)
    }
}
