//! Variable hoisting.
//!
//! The target format declares every variable at the top level of a workflow,
//! so declarations are collected from anywhere in the tree, deduplicated
//! case-insensitively, and completed with initializers for names that are
//! assigned or tested but never declared.

use super::names::NameRegistry;
use crate::expression::naming::{
    declared_variable_type, infer_variable_type, is_exception_identifier,
};
use crate::expression::{VariableSet, assignment_target, standalone_identifiers};
use crate::model::{NodeKind, ProcessFlow};
use crate::workflow::{Action, ActionKind, VariableType};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VariableOrigin {
    Declared,
    /// Referenced in an expression without a declaration.
    Synthesized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoistedVariable {
    pub name: String,
    pub var_type: VariableType,
    pub origin: VariableOrigin,
}

/// Collects every variable the flow needs, declared ones first, in tree order.
pub fn hoist_variables(flow: &ProcessFlow) -> Vec<HoistedVariable> {
    let mut seen = VariableSet::new();
    let mut hoisted = Vec::new();

    flow.walk(&mut |node| {
        if let NodeKind::VariableDecl { var_type } = &node.kind {
            let name = node.display_name.trim();
            if name.is_empty() || is_exception_identifier(name) || !seen.insert(name) {
                return;
            }
            hoisted.push(HoistedVariable {
                name: name.to_string(),
                var_type: declared_variable_type(var_type)
                    .unwrap_or_else(|| infer_variable_type(name)),
                origin: VariableOrigin::Declared,
            });
        }
    });

    let mut referenced: Vec<String> = Vec::new();
    flow.walk(&mut |node| {
        match &node.kind {
            NodeKind::VariableAssign { expression } => {
                referenced.extend(
                    expression
                        .split([';', '\n'])
                        .filter_map(assignment_target)
                        .map(str::to_string),
                );
            }
            NodeKind::Loop { item_var, .. } if !item_var.trim().is_empty() => {
                referenced.push(item_var.trim().to_string());
            }
            _ => {}
        }
        if let Some(expression) = node.kind.expression() {
            referenced.extend(referenced_identifiers(expression));
        }
    });

    for name in referenced {
        if is_exception_identifier(&name) || flow.is_message(&name) || !seen.insert(&name) {
            continue;
        }
        hoisted.push(HoistedVariable {
            var_type: infer_variable_type(&name),
            name,
            origin: VariableOrigin::Synthesized,
        });
    }

    tracing::debug!(
        flow = %flow.qualified_name,
        variables = hoisted.len(),
        "Hoisted variables"
    );
    hoisted
}

/// Bare names read or written anywhere in an expression, statement by
/// statement with line comments removed.
fn referenced_identifiers(expression: &str) -> Vec<String> {
    expression
        .split([';', '\n'])
        .map(|statement| statement.split("//").next().unwrap_or_default())
        .flat_map(standalone_identifiers)
        .collect()
}

/// One initialize action per hoisted variable.
pub(super) fn initializer_actions(
    variables: &[HoistedVariable],
    names: &mut NameRegistry,
) -> Vec<Action> {
    variables
        .iter()
        .map(|variable| {
            let name = names.claim(&format!("Initialize_{}", variable.name));
            let mut action = Action::new(name, ActionKind::InitializeVariable)
                .with_details(variable.var_type.default_value());
            action.variable_name = Some(variable.name.clone());
            action.variable_type = Some(variable.var_type);
            action
        })
        .collect()
}
