use super::element::Element;
use crate::model::{
    NodeId, NodeIdGenerator, NodeKind, ProcessNode, ReceiveShape, StatementRef, TransactionKind,
};
use ahash::AHashMap;
use indexmap::IndexMap;

/// Master macro mapping designer element type names onto shape tags.
///
/// Several element spellings can map to the same tag; anything not listed is a
/// fallback shape.
macro_rules! define_shape_tags {
    ( $( ($tag:ident, [ $( $type_name:literal ),+ $(,)? ]) ),* $(,)? ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub(super) enum ShapeTag {
            $( $tag, )*
        }

        pub(super) fn shape_tag(type_name: &str) -> Option<ShapeTag> {
            match type_name {
                $( $( $type_name )|+ => Some(ShapeTag::$tag), )*
                _ => None,
            }
        }
    };
}

define_shape_tags! {
    (Receive, ["Receive"]),
    (Send, ["Send"]),
    (Decide, ["Decision", "Decide"]),
    (Switch, ["Switch"]),
    (Loop, ["Loop", "ForEach"]),
    (While, ["While"]),
    (Until, ["Until"]),
    (Parallel, ["Parallel"]),
    (Listen, ["Listen"]),
    (Branch, ["ParallelBranch", "ListenBranch"]),
    (Construct, ["Construct"]),
    (Transform, ["Transform"]),
    (VariableDecl, ["VariableDeclaration"]),
    (MessageAssign, ["MessageAssignment"]),
    (VariableAssign, ["VariableAssignment"]),
    (CorrelationDecl, ["CorrelationDeclaration"]),
    (Scope, ["Scope"]),
    (AtomicTxn, ["AtomicTransaction"]),
    (LongRunningTxn, ["LongRunningTransaction"]),
    (CompensationScope, ["Compensation"]),
    (Catch, ["Catch"]),
    (Call, ["Exec", "Call"]),
    (Start, ["Start"]),
    (Terminate, ["Terminate"]),
    (Throw, ["Throw"]),
    (Suspend, ["Suspend"]),
    (Delay, ["Delay"]),
    (Compensate, ["Compensate"]),
    (Group, ["Group"]),
    (Task, ["Task"]),
    (CallPolicy, ["CallRules"]),
}

/// Element types that describe a shape rather than being statements themselves.
const METADATA_ELEMENTS: &[&str] = &[
    "MessageRef",
    "MessagePartRef",
    "StatementRef",
    "DecisionBranch",
    "SwitchCase",
    "LogicalBindingAttribute",
    "PhysicalBindingAttribute",
    "DirectBindingAttribute",
    "DynamicBindingAttribute",
    "OperationDeclaration",
    "CorrelationRef",
    "Parameter",
    "ServiceLinkDeclaration",
];

/// Recursive-descent builder for the process-flow tree.
pub(super) struct ShapeBuilder {
    ids: NodeIdGenerator,
    /// Source OID -> node id, consulted only once the tree is complete.
    pub(super) id_table: AHashMap<String, NodeId>,
}

impl ShapeBuilder {
    pub(super) fn new() -> Self {
        Self {
            ids: NodeIdGenerator::default(),
            id_table: AHashMap::new(),
        }
    }

    /// Builds the statement elements of one owning collection.
    pub(super) fn build_statements<'a, 'input: 'a>(
        &mut self,
        elements: impl Iterator<Item = Element<'a, 'input>>,
        parent: Option<NodeId>,
    ) -> Vec<ProcessNode> {
        elements
            .filter(|e| is_statement(e))
            .enumerate()
            .map(|(sequence, element)| self.build_node(element, parent, sequence as u32))
            .collect()
    }

    fn build_node(
        &mut self,
        element: Element,
        parent: Option<NodeId>,
        sequence: u32,
    ) -> ProcessNode {
        let id = self.ids.next_id();
        if !element.oid().is_empty() {
            self.id_table.insert(element.oid().to_string(), id);
        }

        let mut children = Vec::new();
        let kind = match shape_tag(element.type_name()) {
            Some(ShapeTag::Receive) => NodeKind::Receive(ReceiveShape {
                port: element.text("PortName"),
                message: element.text("MessageName"),
                operation: element.text("OperationName"),
                is_activating: element.flag("Activate"),
                initializes: Vec::new(),
                follows: Vec::new(),
            }),
            Some(ShapeTag::Send) => NodeKind::Send {
                port: element.text("PortName"),
                message: element.text("MessageName"),
                operation: element.text("OperationName"),
            },
            Some(ShapeTag::Decide) => {
                let branches: Vec<Element> = element.elements_of_type("DecisionBranch").collect();
                self.build_decision(&branches, id)
            }
            Some(ShapeTag::Switch) => self.build_switch(element, id),
            Some(ShapeTag::Loop) => {
                children = self.build_statements(element.elements(), Some(id));
                NodeKind::Loop {
                    expression: element.text("Expression"),
                    collection_expr: element.text("Collection"),
                    item_var: element.text("ItemVariable"),
                }
            }
            Some(ShapeTag::While) => {
                children = self.build_statements(element.elements(), Some(id));
                NodeKind::While {
                    expression: element.text("Expression"),
                }
            }
            Some(ShapeTag::Until) => {
                children = self.build_statements(element.elements(), Some(id));
                NodeKind::Until {
                    expression: element.text("Expression"),
                }
            }
            Some(ShapeTag::Parallel) => {
                children = self.build_statements(element.elements(), Some(id));
                NodeKind::Parallel
            }
            Some(ShapeTag::Listen) => NodeKind::Listen {
                branches: self.build_statements(element.elements(), Some(id)),
            },
            Some(ShapeTag::Construct) => NodeKind::Construct {
                constructed_messages: element
                    .elements_of_type("MessageRef")
                    .map(|m| m.text("Ref"))
                    .filter(|r| !r.is_empty())
                    .collect(),
                inner: self.build_statements(element.elements(), Some(id)),
            },
            Some(ShapeTag::Transform) => {
                let (inputs, outputs): (Vec<Element>, Vec<Element>) = element
                    .elements_of_type("MessagePartRef")
                    .partition(|part| part.parent_link().contains("Input"));
                NodeKind::Transform {
                    class_ref: element.text("ClassName"),
                    input_messages: inputs.iter().map(|p| p.text("MessageRef")).collect(),
                    output_messages: outputs.iter().map(|p| p.text("MessageRef")).collect(),
                }
            }
            Some(ShapeTag::VariableDecl) => NodeKind::VariableDecl {
                var_type: element.text("Type"),
            },
            Some(ShapeTag::MessageAssign) => NodeKind::MessageAssign {
                expression: element.text("Expression"),
            },
            Some(ShapeTag::VariableAssign) => NodeKind::VariableAssign {
                expression: element.text("Expression"),
            },
            Some(ShapeTag::CorrelationDecl) => NodeKind::CorrelationDecl {
                type_ref: element.text("Type"),
                statement_refs: element
                    .elements_of_type("StatementRef")
                    .map(|r| StatementRef {
                        ref_id: r.text("Ref"),
                        initializes: r.flag("Initializes"),
                    })
                    .collect(),
            },
            Some(ShapeTag::Scope) => {
                children = self.build_statements(element.elements(), Some(id));
                NodeKind::Scope {
                    transaction: scope_transaction(element),
                }
            }
            Some(ShapeTag::AtomicTxn) => {
                children = self.build_statements(element.elements(), Some(id));
                NodeKind::Scope {
                    transaction: TransactionKind::Atomic,
                }
            }
            Some(ShapeTag::LongRunningTxn) => {
                children = self.build_statements(element.elements(), Some(id));
                NodeKind::Scope {
                    transaction: TransactionKind::LongRunning,
                }
            }
            Some(ShapeTag::CompensationScope) => {
                children = self.build_statements(element.elements(), Some(id));
                NodeKind::CompensationScope
            }
            Some(ShapeTag::Catch) => {
                children = self.build_statements(element.elements(), Some(id));
                NodeKind::Catch {
                    exception_type: element.text("ExceptionType"),
                    exception_var: element.text("ExceptionName"),
                }
            }
            Some(ShapeTag::Call) => NodeKind::Call {
                target_name: element.text("Invokee"),
            },
            Some(ShapeTag::Start) => NodeKind::Start {
                target_name: element.text("Invokee"),
            },
            Some(ShapeTag::Terminate) => NodeKind::Terminate {
                error_message: element.text("ErrorMessage"),
            },
            Some(ShapeTag::Throw) => NodeKind::Throw {
                exception_expr: element.text("Exception"),
            },
            Some(ShapeTag::Suspend) => NodeKind::Suspend {
                error_message: element.text("ErrorMessage"),
            },
            Some(ShapeTag::Delay) => NodeKind::Delay {
                expression: first_non_empty(&[element.text("Timeout"), element.text("Expression")]),
            },
            Some(ShapeTag::Compensate) => NodeKind::Compensate {
                target: element.text("Invokee"),
            },
            Some(ShapeTag::Branch) => {
                children = self.build_statements(element.elements(), Some(id));
                NodeKind::Branch
            }
            Some(ShapeTag::Group) => {
                children = self.build_statements(element.elements(), Some(id));
                NodeKind::Group
            }
            Some(ShapeTag::Task) => {
                children = self.build_statements(element.elements(), Some(id));
                NodeKind::Task
            }
            Some(ShapeTag::CallPolicy) => NodeKind::CallPolicy {
                policy_name: element.text("PolicyName"),
            },
            None => {
                tracing::debug!(
                    kind = element.type_name(),
                    oid = element.oid(),
                    "Unrecognized shape kept as fallback node"
                );
                children = self.build_statements(element.elements(), Some(id));
                NodeKind::Fallback {
                    raw_kind: element.type_name().to_string(),
                }
            }
        };

        ProcessNode {
            id,
            source_id: element.oid().to_string(),
            display_name: element.name(),
            sequence,
            parent,
            kind,
            children,
        }
    }

    /// Lowers a list of decision branches into nested if/else slots.
    ///
    /// The first branch fills the true slot. A single trailing branch without
    /// an expression is the else slot; anything longer becomes a freshly
    /// identified nested `Decide` in the false slot.
    fn build_decision(&mut self, branches: &[Element], id: NodeId) -> NodeKind {
        let Some((first, rest)) = branches.split_first() else {
            return NodeKind::Decide {
                expression: String::new(),
                true_branch: Vec::new(),
                false_branch: Vec::new(),
            };
        };

        let true_branch = self.build_statements(first.elements(), Some(id));
        let false_branch = match rest {
            [] => Vec::new(),
            [last] if last.text("Expression").is_empty() => {
                self.build_statements(last.elements(), Some(id))
            }
            _ => {
                let nested_id = self.ids.next_id();
                let head = rest[0];
                if !head.oid().is_empty() {
                    self.id_table.insert(head.oid().to_string(), nested_id);
                }
                vec![ProcessNode {
                    id: nested_id,
                    source_id: head.oid().to_string(),
                    display_name: head.name(),
                    sequence: 0,
                    parent: Some(id),
                    kind: self.build_decision(rest, nested_id),
                    children: Vec::new(),
                }]
            }
        };

        NodeKind::Decide {
            expression: first.text("Expression"),
            true_branch,
            false_branch,
        }
    }

    fn build_switch(&mut self, element: Element, id: NodeId) -> NodeKind {
        let mut cases = IndexMap::new();
        let mut default = Vec::new();
        for case in element.elements_of_type("SwitchCase") {
            let value = case.text("Value");
            let nodes = self.build_statements(case.elements(), Some(id));
            if value.is_empty() || case.flag("IsDefault") {
                default.extend(nodes);
            } else {
                cases.entry(value).or_insert_with(Vec::new).extend(nodes);
            }
        }
        NodeKind::Switch {
            expression: element.text("Expression"),
            cases,
            default,
        }
    }
}

fn is_statement(element: &Element) -> bool {
    let type_name = element.type_name();
    let transaction_link = element.parent_link().ends_with("_Transaction");
    !type_name.is_empty() && !transaction_link && !METADATA_ELEMENTS.contains(&type_name)
}

fn scope_transaction(element: Element) -> TransactionKind {
    let declared = element.text("TransactionType");
    let linked = element
        .elements()
        .find(|e| e.parent_link().ends_with("_Transaction"))
        .map(|e| e.type_name().to_string());
    match (declared.as_str(), linked.as_deref()) {
        ("Atomic", _) | (_, Some("AtomicTransaction")) => TransactionKind::Atomic,
        ("LongRunning", _) | (_, Some("LongRunningTransaction")) => TransactionKind::LongRunning,
        _ => TransactionKind::None,
    }
}

fn first_non_empty(values: &[String]) -> String {
    values
        .iter()
        .find(|v| !v.is_empty())
        .cloned()
        .unwrap_or_default()
}
