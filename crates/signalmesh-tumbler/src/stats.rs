use std::collections::BTreeMap;

use serde::Serialize;

/// Admission counters since creation or the last reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TumblerStats {
    /// Signals admitted.
    pub allowed: u64,
    /// Signals refused.
    pub rejected: u64,
    /// Refusals per signal code.
    pub rejected_by_signal: BTreeMap<u16, u64>,
}

impl TumblerStats {
    /// Total admission checks.
    pub fn checked(&self) -> u64 {
        self.allowed.saturating_add(self.rejected)
    }

    pub(crate) fn record(&mut self, code: u16, allowed: bool) {
        if allowed {
            self.allowed = self.allowed.saturating_add(1);
        } else {
            self.rejected = self.rejected.saturating_add(1);
            let count = self.rejected_by_signal.entry(code).or_default();
            *count = count.saturating_add(1);
        }
    }
}
