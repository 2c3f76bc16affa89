//! Loop guard inversion.
//!
//! Source loops repeat while their guard holds; the target loop repeats until
//! its guard holds, so While guards are negated before translation.

use crate::expression::scan::{find_relational, split_top_level, strip_outer_parens};
use regex::Regex;
use std::sync::LazyLock;

static SIMPLE_OPERAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.]+(\(\))?$").expect("valid regex"));
static UPPER_BOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*(\(\))?\s*(<=|<)\s*(\d+)$").expect("valid regex")
});
static LOWER_BOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s*(>=|>)\s*[A-Za-z_][A-Za-z0-9_.]*(\(\))?$").expect("valid regex")
});

/// Logical negation of a source guard, applying De Morgan's law across the
/// top-level `&&`/`||` and flipping relational operators at the leaves.
///
/// ```
/// use tenkan::transformer::invert_condition;
///
/// assert_eq!(invert_condition("x < 5"), "x >= 5");
/// assert_eq!(invert_condition("a == 1 && b != 2"), "a != 1 || b == 2");
/// ```
pub fn invert_condition(expr: &str) -> String {
    let expr = strip_outer_parens(expr);

    let disjuncts = split_top_level(expr, "||");
    if disjuncts.len() >= 2 {
        return join(&disjuncts, "&&", "||");
    }
    let conjuncts = split_top_level(expr, "&&");
    if conjuncts.len() >= 2 {
        return join(&conjuncts, "||", "&&");
    }
    invert_atom(expr)
}

/// Inverts each part and joins with `joiner`, parenthesizing parts whose
/// result carries a top-level `conflicting` operator.
fn join(parts: &[&str], joiner: &str, conflicting: &str) -> String {
    parts
        .iter()
        .map(|part| {
            let inverted = invert_condition(part);
            if split_top_level(&inverted, conflicting).len() >= 2 {
                format!("({})", inverted)
            } else {
                inverted
            }
        })
        .collect::<Vec<_>>()
        .join(&format!(" {} ", joiner))
}

fn invert_atom(expr: &str) -> String {
    if let Some((pos, op)) = find_relational(expr) {
        let left = expr[..pos].trim();
        let right = expr[pos + op.len()..].trim();
        let flipped = match op {
            "<" => ">=",
            ">=" => "<",
            ">" => "<=",
            "<=" => ">",
            "==" => "!=",
            _ => "==",
        };
        return format!("{} {} {}", left, flipped, right);
    }

    if let Some(rest) = expr.strip_prefix('!') {
        let rest = rest.trim();
        if !rest.is_empty() {
            return strip_outer_parens(rest).to_string();
        }
    }

    if SIMPLE_OPERAND.is_match(expr) {
        format!("!{}", expr)
    } else {
        format!("!({})", expr)
    }
}

/// Iteration bound implied by a guard such as `i < 10` or `count <= 4`.
///
/// Only conjuncts at the top level are examined; the first bound wins.
pub fn extract_loop_threshold(expr: &str) -> Option<u32> {
    split_top_level(strip_outer_parens(expr), "&&")
        .into_iter()
        .map(strip_outer_parens)
        .find_map(|atom| {
            if let Some(caps) = UPPER_BOUND.captures(atom) {
                let bound: u32 = caps[3].parse().ok()?;
                return Some(if &caps[2] == "<=" {
                    bound.saturating_add(1)
                } else {
                    bound
                });
            }
            let caps = LOWER_BOUND.captures(atom)?;
            let bound: u32 = caps[1].parse().ok()?;
            Some(if &caps[2] == ">=" {
                bound.saturating_add(1)
            } else {
                bound
            })
        })
}
