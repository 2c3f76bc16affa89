//! Binding metadata supplied next to an orchestration.
//!
//! The transformer treats a [`BindingSet`] as read-only input: receive
//! locations feed trigger construction, send ports feed connector inference,
//! outbound transform chains and content-based routing.

use crate::error::BindingError;
use itertools::Itertools;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Context property carrying the name of the receive port a message came in on.
pub const RECEIVE_PORT_PROPERTY: &str = "BTS.ReceivePortName";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BindingSet {
    pub receive_locations: Vec<ReceiveLocation>,
    pub send_ports: Vec<SendPort>,
    pub port_bindings: Vec<PortBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReceiveLocation {
    pub name: String,
    pub receive_port: String,
    pub transport_type: String,
    pub address: String,
    pub enabled: bool,
    pub credentials: Option<String>,
    pub polling_interval: Option<String>,
    pub pipeline: Option<String>,
    pub subsystem_hint: Option<String>,
}

impl Default for ReceiveLocation {
    fn default() -> Self {
        Self {
            name: String::new(),
            receive_port: String::new(),
            transport_type: String::new(),
            address: String::new(),
            enabled: true,
            credentials: None,
            polling_interval: None,
            pipeline: None,
            subsystem_hint: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SendPort {
    pub name: String,
    pub transport_type: String,
    pub address: String,
    pub credentials: Option<String>,
    pub pipeline: Option<String>,
    /// Outbound maps applied in order before the message leaves.
    pub transforms: Vec<String>,
    pub filters: Vec<FilterCondition>,
    /// Mainframe subsystem (`CICS`, `IMS`, `HostFile`) that overrides inference.
    pub subsystem_hint: Option<String>,
}

impl SendPort {
    /// Receive ports this send port subscribes to through its filters.
    pub fn subscribed_receive_ports(&self) -> Vec<&str> {
        self.filters
            .iter()
            .filter(|f| f.is_receive_port_filter())
            .map(|f| f.value.as_str())
            .collect()
    }

    /// Equality filters on any property other than the receive port.
    pub fn routing_filters(&self) -> impl Iterator<Item = &FilterCondition> {
        self.filters
            .iter()
            .filter(|f| f.is_equality() && !f.is_receive_port_filter())
    }
}

/// One subscription predicate: `property operator value`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterCondition {
    pub property: String,
    pub operator: String,
    pub value: String,
}

impl FilterCondition {
    pub fn is_equality(&self) -> bool {
        matches!(
            self.operator.trim().to_ascii_lowercase().as_str(),
            "==" | "=" | "0" | "equals"
        )
    }

    pub fn is_receive_port_filter(&self) -> bool {
        self.is_equality() && self.property.eq_ignore_ascii_case(RECEIVE_PORT_PROPERTY)
    }
}

/// Binds a logical orchestration port to a physical receive or send port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortBinding {
    pub orchestration: String,
    pub port: String,
    pub bound_to: String,
}

impl BindingSet {
    pub fn from_json(json: &str) -> Result<Self, BindingError> {
        serde_json::from_str(json).map_err(|e| BindingError::JsonParseError(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BindingError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| BindingError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    pub fn is_empty(&self) -> bool {
        self.receive_locations.is_empty() && self.send_ports.is_empty()
    }

    /// Distinct receive port names in first-seen order.
    pub fn receive_ports(&self) -> Vec<&str> {
        self.receive_locations
            .iter()
            .map(|l| l.receive_port.as_str())
            .filter(|p| !p.is_empty())
            .unique()
            .collect()
    }

    pub fn locations_for(&self, receive_port: &str) -> Vec<&ReceiveLocation> {
        self.receive_locations
            .iter()
            .filter(|l| l.receive_port.eq_ignore_ascii_case(receive_port))
            .collect()
    }

    /// The location that represents a receive port: the first enabled one,
    /// else the first listed.
    pub fn preferred_location(&self, receive_port: &str) -> Option<&ReceiveLocation> {
        let locations = self.locations_for(receive_port);
        locations
            .iter()
            .find(|l| l.enabled)
            .or_else(|| locations.first())
            .copied()
    }

    pub fn send_port(&self, name: &str) -> Option<&SendPort> {
        self.send_ports
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Physical port bound to `port` of the named orchestration. The
    /// orchestration may be given by short or qualified name.
    pub fn bound_port(&self, orchestration: &str, port: &str) -> Option<&str> {
        self.port_bindings
            .iter()
            .find(|b| {
                b.port == port
                    && (b.orchestration == orchestration
                        || b.orchestration.ends_with(&format!(".{}", orchestration))
                        || orchestration.ends_with(&format!(".{}", b.orchestration)))
            })
            .map(|b| b.bound_to.as_str())
    }
}
