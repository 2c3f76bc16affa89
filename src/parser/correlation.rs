use crate::model::{NodeId, NodeKind, ProcessFlow};
use ahash::AHashMap;

/// Links correlation declarations to the receives that initialize or follow them.
///
/// Runs after the full tree is built, since a statement reference may point
/// forward in document order.
pub(super) fn resolve_correlations(flow: &mut ProcessFlow, id_table: &AHashMap<String, NodeId>) {
    let mut links: Vec<(NodeId, String, bool)> = Vec::new();
    flow.walk(&mut |node| {
        if let NodeKind::CorrelationDecl { statement_refs, .. } = &node.kind {
            for statement in statement_refs {
                match id_table.get(&statement.ref_id) {
                    Some(target) => {
                        links.push((*target, node.display_name.clone(), statement.initializes))
                    }
                    None => tracing::warn!(
                        correlation = %node.display_name,
                        reference = %statement.ref_id,
                        "Correlation references an unknown statement"
                    ),
                }
            }
        }
    });

    for (target, correlation, initializes) in links {
        let Some(node) = flow.find_mut(target) else {
            continue;
        };
        if let NodeKind::Receive(receive) = &mut node.kind {
            let list = if initializes {
                &mut receive.initializes
            } else {
                &mut receive.follows
            };
            if !list.contains(&correlation) {
                list.push(correlation);
            }
        }
    }
}
