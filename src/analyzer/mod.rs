//! Trigger pattern analysis.
//!
//! The target format allows exactly one entry trigger per workflow, so the
//! analyzer classifies how a parsed flow is activated before lowering starts.

use crate::model::{NodeId, NodeKind, ProcessFlow, ProcessNode};
use serde::Serialize;

/// How a flow is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriggerPattern {
    /// No activating receive; the flow is invoked by another unit.
    Callable,
    SingleTrigger,
    /// One receive starts a correlation that later receives follow.
    Convoy,
    /// Several activating receives under one listen; the first to arrive wins.
    ListenFirstToComplete,
    /// Several activating receives in parallel branches, all mandatory.
    ParallelAllMustComplete,
    /// Several activating receives with no common listen or parallel.
    Invalid,
}

/// Result of classifying a flow's activation shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternAnalysis {
    pub pattern: TriggerPattern,
    pub primary_receive: Option<NodeId>,
    pub secondary_receives: Vec<NodeId>,
    pub requires_session: bool,
    pub requires_timeout_handling: bool,
    pub is_valid: bool,
    pub blocking_reason: Option<String>,
}

impl PatternAnalysis {
    fn valid(pattern: TriggerPattern, primary: Option<NodeId>, secondary: Vec<NodeId>) -> Self {
        Self {
            pattern,
            primary_receive: primary,
            secondary_receives: secondary,
            requires_session: false,
            requires_timeout_handling: false,
            is_valid: true,
            blocking_reason: None,
        }
    }

    fn blocked(pattern: TriggerPattern, receives: &[NodeId], reason: String) -> Self {
        Self {
            pattern,
            primary_receive: receives.first().copied(),
            secondary_receives: receives.iter().skip(1).copied().collect(),
            requires_session: false,
            requires_timeout_handling: false,
            is_valid: false,
            blocking_reason: Some(reason),
        }
    }
}

/// Classifies the activation pattern of a parsed flow.
pub fn analyze(flow: &ProcessFlow) -> PatternAnalysis {
    let mut activating: Vec<&ProcessNode> = Vec::new();
    let mut followers: Vec<&ProcessNode> = Vec::new();
    flow.walk(&mut |node| match node.as_receive() {
        Some(receive) if receive.is_activating => activating.push(node),
        Some(_) => followers.push(node),
        None => {}
    });

    let analysis = match activating.as_slice() {
        [] => PatternAnalysis::valid(TriggerPattern::Callable, None, Vec::new()),
        [single] => classify_single(single, &followers),
        many => classify_multiple(flow, many),
    };

    tracing::debug!(
        flow = %flow.qualified_name,
        pattern = ?analysis.pattern,
        valid = analysis.is_valid,
        "Classified trigger pattern"
    );
    analysis
}

fn classify_single(primary: &ProcessNode, followers: &[&ProcessNode]) -> PatternAnalysis {
    let initialized = primary
        .as_receive()
        .map(|r| r.initializes.as_slice())
        .unwrap_or_default();

    let convoy_members: Vec<NodeId> = followers
        .iter()
        .filter(|f| {
            f.as_receive()
                .is_some_and(|r| r.follows.iter().any(|c| initialized.contains(c)))
        })
        .map(|f| f.id)
        .collect();

    if convoy_members.is_empty() {
        PatternAnalysis::valid(TriggerPattern::SingleTrigger, Some(primary.id), Vec::new())
    } else {
        let mut analysis =
            PatternAnalysis::valid(TriggerPattern::Convoy, Some(primary.id), convoy_members);
        analysis.requires_session = true;
        analysis
    }
}

fn classify_multiple(flow: &ProcessFlow, receives: &[&ProcessNode]) -> PatternAnalysis {
    let index = flow.index();
    let ids: Vec<NodeId> = receives.iter().map(|r| r.id).collect();

    let nearest = |id: NodeId, want: fn(&NodeKind) -> bool| {
        flow.ancestors(&index, id)
            .into_iter()
            .find(|a| want(&a.kind))
            .map(|a| a.id)
    };
    let listen_ancestors: Vec<Option<NodeId>> = ids
        .iter()
        .map(|id| nearest(*id, |k| matches!(k, NodeKind::Listen { .. })))
        .collect();

    let shared_listen = match listen_ancestors.first() {
        Some(Some(first)) => listen_ancestors.iter().all(|a| *a == Some(*first)),
        _ => false,
    };
    if shared_listen {
        let mut analysis = PatternAnalysis::valid(
            TriggerPattern::ListenFirstToComplete,
            Some(ids[0]),
            ids[1..].to_vec(),
        );
        analysis.requires_timeout_handling = true;
        return analysis;
    }

    let all_parallel = ids
        .iter()
        .all(|id| nearest(*id, |k| matches!(k, NodeKind::Parallel)).is_some());
    if all_parallel {
        return PatternAnalysis::blocked(
            TriggerPattern::ParallelAllMustComplete,
            &ids,
            format!(
                "{} activating receives run in parallel branches; \
                 a workflow can host only one mandatory entry trigger",
                ids.len()
            ),
        );
    }

    PatternAnalysis::blocked(
        TriggerPattern::Invalid,
        &ids,
        format!(
            "{} activating receives are not grouped under a single listen; \
             activation order is undefined",
            ids.len()
        ),
    )
}
