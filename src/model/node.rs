use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Identifier assigned to every parsed node, unique within one flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Hands out `NodeId`s in creation order.
#[derive(Debug, Default)]
pub struct NodeIdGenerator {
    next: u32,
}

impl NodeIdGenerator {
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

/// Transaction semantics of a scope shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionKind {
    None,
    Atomic,
    LongRunning,
}

/// A correlation reference from a declaration to a receive or send statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementRef {
    pub ref_id: String,
    pub initializes: bool,
}

/// Fields specific to a receive shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReceiveShape {
    pub port: String,
    pub message: String,
    pub operation: String,
    pub is_activating: bool,
    /// Correlations this receive initializes, filled in after parsing.
    pub initializes: Vec<String>,
    /// Correlations this receive follows, filled in after parsing.
    pub follows: Vec<String>,
}

/// The closed set of node variants produced by the parser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NodeKind {
    Receive(ReceiveShape),
    Send {
        port: String,
        message: String,
        operation: String,
    },
    Decide {
        expression: String,
        true_branch: Vec<ProcessNode>,
        false_branch: Vec<ProcessNode>,
    },
    Switch {
        expression: String,
        cases: IndexMap<String, Vec<ProcessNode>>,
        default: Vec<ProcessNode>,
    },
    Loop {
        expression: String,
        collection_expr: String,
        item_var: String,
    },
    While {
        expression: String,
    },
    Until {
        expression: String,
    },
    Parallel,
    Listen {
        branches: Vec<ProcessNode>,
    },
    Branch,
    Construct {
        constructed_messages: Vec<String>,
        inner: Vec<ProcessNode>,
    },
    Transform {
        class_ref: String,
        input_messages: Vec<String>,
        output_messages: Vec<String>,
    },
    VariableDecl {
        var_type: String,
    },
    MessageAssign {
        expression: String,
    },
    VariableAssign {
        expression: String,
    },
    CorrelationDecl {
        type_ref: String,
        statement_refs: Vec<StatementRef>,
    },
    Scope {
        transaction: TransactionKind,
    },
    CompensationScope,
    Catch {
        exception_type: String,
        exception_var: String,
    },
    Call {
        target_name: String,
    },
    Start {
        target_name: String,
    },
    Terminate {
        error_message: String,
    },
    Throw {
        exception_expr: String,
    },
    Suspend {
        error_message: String,
    },
    Delay {
        expression: String,
    },
    Compensate {
        target: String,
    },
    Group,
    Task,
    CallPolicy {
        policy_name: String,
    },
    Fallback {
        raw_kind: String,
    },
}

impl NodeKind {
    /// A stable, human-readable tag for the variant.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Receive(_) => "Receive",
            NodeKind::Send { .. } => "Send",
            NodeKind::Decide { .. } => "Decide",
            NodeKind::Switch { .. } => "Switch",
            NodeKind::Loop { .. } => "Loop",
            NodeKind::While { .. } => "While",
            NodeKind::Until { .. } => "Until",
            NodeKind::Parallel => "Parallel",
            NodeKind::Listen { .. } => "Listen",
            NodeKind::Branch => "Branch",
            NodeKind::Construct { .. } => "Construct",
            NodeKind::Transform { .. } => "Transform",
            NodeKind::VariableDecl { .. } => "VariableDecl",
            NodeKind::MessageAssign { .. } => "MessageAssign",
            NodeKind::VariableAssign { .. } => "VariableAssign",
            NodeKind::CorrelationDecl { .. } => "CorrelationDecl",
            NodeKind::Scope {
                transaction: TransactionKind::None,
            } => "Scope",
            NodeKind::Scope {
                transaction: TransactionKind::Atomic,
            } => "AtomicTxn",
            NodeKind::Scope {
                transaction: TransactionKind::LongRunning,
            } => "LongRunningTxn",
            NodeKind::CompensationScope => "CompensationScope",
            NodeKind::Catch { .. } => "Catch",
            NodeKind::Call { .. } => "Call",
            NodeKind::Start { .. } => "Start",
            NodeKind::Terminate { .. } => "Terminate",
            NodeKind::Throw { .. } => "Throw",
            NodeKind::Suspend { .. } => "Suspend",
            NodeKind::Delay { .. } => "Delay",
            NodeKind::Compensate { .. } => "Compensate",
            NodeKind::Group => "Group",
            NodeKind::Task => "Task",
            NodeKind::CallPolicy { .. } => "CallPolicy",
            NodeKind::Fallback { .. } => "Fallback",
        }
    }

    /// The expression text carried by expression-bearing variants.
    pub fn expression(&self) -> Option<&str> {
        match self {
            NodeKind::Decide { expression, .. }
            | NodeKind::Switch { expression, .. }
            | NodeKind::Loop { expression, .. }
            | NodeKind::While { expression }
            | NodeKind::Until { expression }
            | NodeKind::MessageAssign { expression }
            | NodeKind::VariableAssign { expression }
            | NodeKind::Delay { expression } => Some(expression),
            _ => None,
        }
    }
}

/// One element of the process-flow tree.
///
/// Every node is owned by exactly one collection: its parent's `children`, or
/// one of the named slots inside `kind`. `parent` is a plain id used only for
/// ancestor lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessNode {
    pub id: NodeId,
    pub source_id: String,
    pub display_name: String,
    pub sequence: u32,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub children: Vec<ProcessNode>,
}

impl ProcessNode {
    pub fn new(id: NodeId, source_id: &str, display_name: &str, kind: NodeKind) -> Self {
        Self {
            id,
            source_id: source_id.to_string(),
            display_name: display_name.to_string(),
            sequence: 0,
            parent: None,
            kind,
            children: Vec::new(),
        }
    }

    /// All nodes owned by this node, across every slot, in slot order.
    pub fn structural_children(&self) -> Vec<&ProcessNode> {
        let slots: Vec<&ProcessNode> = match &self.kind {
            NodeKind::Decide {
                true_branch,
                false_branch,
                ..
            } => true_branch.iter().chain(false_branch.iter()).collect(),
            NodeKind::Switch { cases, default, .. } => cases
                .values()
                .flat_map(|nodes| nodes.iter())
                .chain(default.iter())
                .collect(),
            NodeKind::Listen { branches } => branches.iter().collect(),
            NodeKind::Construct { inner, .. } => inner.iter().collect(),
            _ => Vec::new(),
        };
        slots.into_iter().chain(self.children.iter()).collect()
    }

    /// Mutable counterpart of [`ProcessNode::structural_children`].
    pub fn structural_children_mut(&mut self) -> Vec<&mut ProcessNode> {
        let ProcessNode { kind, children, .. } = self;
        let slots: Vec<&mut ProcessNode> = match kind {
            NodeKind::Decide {
                true_branch,
                false_branch,
                ..
            } => true_branch.iter_mut().chain(false_branch.iter_mut()).collect(),
            NodeKind::Switch { cases, default, .. } => cases
                .values_mut()
                .flat_map(|nodes| nodes.iter_mut())
                .chain(default.iter_mut())
                .collect(),
            NodeKind::Listen { branches } => branches.iter_mut().collect(),
            NodeKind::Construct { inner, .. } => inner.iter_mut().collect(),
            _ => Vec::new(),
        };
        slots.into_iter().chain(children.iter_mut()).collect()
    }

    /// Pre-order visit of this node and all its descendants.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a ProcessNode)) {
        visit(self);
        for child in self.structural_children() {
            child.walk(visit);
        }
    }

    /// Finds a descendant (or self) by id.
    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut ProcessNode> {
        if self.id == id {
            return Some(self);
        }
        self.structural_children_mut()
            .into_iter()
            .find_map(|child| child.find_mut(id))
    }

    /// Number of nodes in this subtree, including self.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .structural_children()
            .iter()
            .map(|c| c.subtree_len())
            .sum::<usize>()
    }

    pub fn as_receive(&self) -> Option<&ReceiveShape> {
        match &self.kind {
            NodeKind::Receive(shape) => Some(shape),
            _ => None,
        }
    }

    pub fn is_activating_receive(&self) -> bool {
        self.as_receive().is_some_and(|r| r.is_activating)
    }
}
