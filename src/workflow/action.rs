use super::ConnectorKind;
use indexmap::IndexMap;
use serde::Serialize;

/// Target action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ActionKind {
    InitializeVariable,
    SetVariable,
    ConstructMessage,
    Transform,
    Send,
    Response,
    ReceiveMessage,
    Condition,
    Switch,
    Foreach,
    Until,
    Scope,
    Parallel,
    CatchScope,
    Terminate,
    Delay,
    CallWorkflow,
    CallRules,
    Compensate,
    EdiDecode,
    Marker,
}

impl ActionKind {
    /// Actions whose output message can feed a later consumer.
    pub fn is_producer(&self) -> bool {
        matches!(
            self,
            ActionKind::Transform
                | ActionKind::ConstructMessage
                | ActionKind::ReceiveMessage
                | ActionKind::EdiDecode
        )
    }

    /// Actions whose input message is wired to a producer.
    pub fn is_consumer(&self) -> bool {
        matches!(
            self,
            ActionKind::Transform | ActionKind::Send | ActionKind::Response | ActionKind::EdiDecode
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VariableType {
    Boolean,
    Integer,
    Float,
    String,
    Array,
    Object,
}

impl VariableType {
    /// Initial value in target expression syntax.
    pub fn default_value(&self) -> &'static str {
        match self {
            VariableType::Boolean => "false",
            VariableType::Integer => "0",
            VariableType::Float => "0.0",
            VariableType::String => "''",
            VariableType::Array => "[]",
            VariableType::Object => "{}",
        }
    }
}

/// One element of the target action graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub name: String,
    pub kind: ActionKind,
    pub sequence: u32,
    /// Expression or descriptive text, depending on the kind.
    pub details: String,
    pub children: Vec<Action>,
    pub true_branch: Option<Vec<Action>>,
    pub false_branch: Option<Vec<Action>>,
    /// Switch case value for sub-containers of a dispatch action.
    pub case_value: Option<String>,
    pub connector_kind: Option<ConnectorKind>,
    pub target_address: Option<String>,
    pub input_message_name: Option<String>,
    pub input_source_action: Option<String>,
    pub output_message_name: Option<String>,
    pub property_assignments: IndexMap<String, String>,
    /// Variable targeted by initialize/set actions.
    pub variable_name: Option<String>,
    pub variable_type: Option<VariableType>,
    pub is_branch_container: bool,
    pub loop_threshold: Option<u32>,
}

impl Action {
    pub fn new(name: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            sequence: 0,
            details: String::new(),
            children: Vec::new(),
            true_branch: None,
            false_branch: None,
            case_value: None,
            connector_kind: None,
            target_address: None,
            input_message_name: None,
            input_source_action: None,
            output_message_name: None,
            property_assignments: IndexMap::new(),
            variable_name: None,
            variable_type: None,
            is_branch_container: false,
            loop_threshold: None,
        }
    }

    /// A scope-like action that only groups its children.
    pub fn container(name: impl Into<String>, kind: ActionKind, children: Vec<Action>) -> Self {
        Self {
            children,
            is_branch_container: true,
            ..Self::new(name, kind)
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    /// Pre-order collection of self and every nested action.
    pub fn collect_into<'a>(&'a self, out: &mut Vec<&'a Action>) {
        out.push(self);
        for child in self.nested() {
            child.collect_into(out);
        }
    }

    /// Nested actions in order: true branch, false branch, children.
    pub fn nested(&self) -> impl Iterator<Item = &Action> {
        self.true_branch
            .iter()
            .flatten()
            .chain(self.false_branch.iter().flatten())
            .chain(self.children.iter())
    }

    pub fn nested_mut(&mut self) -> impl Iterator<Item = &mut Action> {
        self.true_branch
            .iter_mut()
            .flatten()
            .chain(self.false_branch.iter_mut().flatten())
            .chain(self.children.iter_mut())
    }
}
