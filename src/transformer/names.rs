use crate::expression::naming::sanitize_name;
use ahash::AHashSet;

/// Hands out action names that are unique within one workflow.
#[derive(Debug, Default)]
pub(super) struct NameRegistry {
    used: AHashSet<String>,
}

impl NameRegistry {
    /// Sanitizes `base` and appends `_2`, `_3`, ... until it is unused.
    pub(super) fn claim(&mut self, base: &str) -> String {
        let base = sanitize_name(base);
        let mut candidate = base.clone();
        let mut counter = 2;
        while !self.used.insert(candidate.to_ascii_lowercase()) {
            candidate = format!("{}_{}", base, counter);
            counter += 1;
        }
        candidate
    }
}
