use super::node::{NodeId, ProcessNode};
use ahash::AHashMap;
use serde::Serialize;

/// Direction of a declared message parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageDirection {
    None,
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageDecl {
    pub name: String,
    pub message_type: String,
    pub direction: MessageDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationKind {
    OneWay,
    RequestResponse,
    SolicitResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationDecl {
    pub name: String,
    pub kind: OperationKind,
    pub message_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortTypeDecl {
    pub name: String,
    pub operations: Vec<OperationDecl>,
}

impl PortTypeDecl {
    pub fn is_request_response(&self) -> bool {
        self.operations
            .iter()
            .any(|op| op.kind != OperationKind::OneWay)
    }
}

/// Which way messages flow through a port, seen from the orchestration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortDirection {
    None,
    Receive,
    Send,
    ReceiveSend,
    SendReceive,
}

impl PortDirection {
    pub fn receives(&self) -> bool {
        matches!(
            self,
            PortDirection::Receive | PortDirection::ReceiveSend | PortDirection::SendReceive
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BindingKind {
    Unspecified,
    Logical,
    Physical,
    Direct,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortDecl {
    pub name: String,
    pub port_type: String,
    pub direction: PortDirection,
    pub binding_kind: BindingKind,
    /// Adapter / transport name of a physical binding.
    pub transport: Option<String>,
    pub address: Option<String>,
    pub pipeline: Option<String>,
    pub file_folder: Option<String>,
    pub file_mask: Option<String>,
}

/// The parsed orchestration: declarations plus the root-level node list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessFlow {
    pub name: String,
    pub qualified_name: String,
    pub namespace: String,
    pub messages: Vec<MessageDecl>,
    pub port_types: Vec<PortTypeDecl>,
    pub ports: Vec<PortDecl>,
    pub nodes: Vec<ProcessNode>,
}

impl ProcessFlow {
    /// Pre-order visit of every node in the flow.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a ProcessNode)) {
        for node in &self.nodes {
            node.walk(visit);
        }
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut ProcessNode> {
        self.nodes.iter_mut().find_map(|n| n.find_mut(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().map(|n| n.subtree_len()).sum()
    }

    /// Builds an id lookup table over the whole tree.
    pub fn index(&self) -> AHashMap<NodeId, &ProcessNode> {
        let mut index = AHashMap::new();
        self.walk(&mut |node| {
            index.insert(node.id, node);
        });
        index
    }

    /// Ancestors of `id`, nearest first, following the parent ids.
    pub fn ancestors<'a>(
        &'a self,
        index: &AHashMap<NodeId, &'a ProcessNode>,
        id: NodeId,
    ) -> Vec<&'a ProcessNode> {
        let mut chain = Vec::new();
        let mut current = index.get(&id).and_then(|n| n.parent);
        while let Some(parent_id) = current {
            match index.get(&parent_id) {
                Some(parent) => {
                    chain.push(*parent);
                    current = parent.parent;
                }
                None => break,
            }
        }
        chain
    }

    pub fn port(&self, name: &str) -> Option<&PortDecl> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn port_type(&self, name: &str) -> Option<&PortTypeDecl> {
        self.port_types.iter().find(|p| {
            p.name == name || name.rsplit('.').next().is_some_and(|short| short == p.name)
        })
    }

    pub fn is_message(&self, name: &str) -> bool {
        self.messages.iter().any(|m| m.name.eq_ignore_ascii_case(name))
    }
}
