use crate::events::AlertKey;
use std::collections::HashSet;

/// Set of alert keys that have already been delivered.
///
/// Lives as long as the process and is never evicted; a restart starts empty.
/// Keys carry the triggering observation's timestamp, so within one process
/// the same condition is never reported twice.
#[derive(Debug, Default, Clone)]
pub struct AlertDedupCache {
    fired: HashSet<AlertKey>,
}

impl AlertDedupCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn seen(&self, key: &AlertKey) -> bool {
        self.fired.contains(key)
    }

    pub fn mark(&mut self, key: AlertKey) {
        self.fired.insert(key);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fired.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}
