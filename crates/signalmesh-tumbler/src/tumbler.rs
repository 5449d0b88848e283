use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use signalmesh_wire::signal_name;
use tracing::debug;

use crate::stats::TumblerStats;

/// Named whitelist of admitted signal codes.
///
/// The whitelist is the one structure a node mutates during steady-state
/// operation, so all state sits behind a mutex and every method takes `&self`.
#[derive(Debug)]
pub struct Tumbler {
    name: String,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    whitelist: BTreeSet<u16>,
    stats: TumblerStats,
}

impl Tumbler {
    /// Create a tumbler with an initial whitelist.
    pub fn new(name: impl Into<String>, allowed: impl IntoIterator<Item = u16>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(State {
                whitelist: allowed.into_iter().collect(),
                stats: TumblerStats::default(),
            }),
        }
    }

    /// Create a tumbler that admits nothing until codes are allowed.
    pub fn closed(name: impl Into<String>) -> Self {
        Self::new(name, std::iter::empty())
    }

    /// Tumbler name, used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check a signal and record the outcome.
    pub fn is_allowed(&self, code: u16) -> bool {
        let mut state = self.lock();
        let allowed = state.whitelist.contains(&code);
        state.stats.record(code, allowed);

        if !allowed {
            debug!(
                tumbler = %self.name,
                signal = code,
                signal_name = signal_name(code),
                rejected = state.stats.rejected,
                "signal rejected"
            );
        }
        allowed
    }

    /// Check a signal without touching the counters.
    pub fn contains(&self, code: u16) -> bool {
        self.lock().whitelist.contains(&code)
    }

    /// Admit a signal. Returns `true` if it was not already admitted.
    pub fn allow(&self, code: u16) -> bool {
        let inserted = self.lock().whitelist.insert(code);
        if inserted {
            debug!(tumbler = %self.name, signal = code, "signal allowed");
        }
        inserted
    }

    /// Stop admitting a signal. Returns `true` if it was admitted before.
    pub fn deny(&self, code: u16) -> bool {
        let removed = self.lock().whitelist.remove(&code);
        if removed {
            debug!(tumbler = %self.name, signal = code, "signal denied");
        }
        removed
    }

    /// Swap the whole whitelist. Counters are kept.
    pub fn replace(&self, allowed: impl IntoIterator<Item = u16>) {
        let whitelist: BTreeSet<u16> = allowed.into_iter().collect();
        debug!(tumbler = %self.name, size = whitelist.len(), "whitelist replaced");
        self.lock().whitelist = whitelist;
    }

    /// A copy of the current whitelist. Mutating it does not affect the filter.
    pub fn whitelist(&self) -> BTreeSet<u16> {
        self.lock().whitelist.clone()
    }

    /// A snapshot of the admission counters.
    pub fn stats(&self) -> TumblerStats {
        self.lock().stats.clone()
    }

    /// Zero the admission counters.
    pub fn reset_stats(&self) {
        self.lock().stats = TumblerStats::default();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Every critical section leaves the state consistent, so a poisoned
        // lock is still safe to use.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use signalmesh_wire::{BUILD_STARTED, INSPECTION_REQUESTED, LESSON_EXTRACTED};

    use super::*;

    #[test]
    fn allow_and_deny_toggle_admission() {
        let tumbler = Tumbler::closed("inspector");
        assert!(!tumbler.is_allowed(BUILD_STARTED));

        assert!(tumbler.allow(BUILD_STARTED));
        assert!(tumbler.is_allowed(BUILD_STARTED));

        assert!(tumbler.deny(BUILD_STARTED));
        assert!(!tumbler.is_allowed(BUILD_STARTED));
    }

    #[test]
    fn allow_and_deny_are_idempotent() {
        let tumbler = Tumbler::new("inspector", [BUILD_STARTED]);
        assert!(!tumbler.allow(BUILD_STARTED));
        assert_eq!(tumbler.whitelist().len(), 1);

        assert!(tumbler.deny(BUILD_STARTED));
        assert!(!tumbler.deny(BUILD_STARTED));
        assert!(tumbler.whitelist().is_empty());
    }

    #[test]
    fn whitelist_copy_is_detached() {
        let tumbler = Tumbler::new("inspector", [BUILD_STARTED]);

        let mut copy = tumbler.whitelist();
        copy.insert(LESSON_EXTRACTED);
        copy.remove(&BUILD_STARTED);

        assert!(tumbler.is_allowed(BUILD_STARTED));
        assert!(!tumbler.is_allowed(LESSON_EXTRACTED));
    }

    #[test]
    fn stats_count_rejections_per_signal() {
        let tumbler = Tumbler::new("inspector", [BUILD_STARTED]);
        tumbler.is_allowed(BUILD_STARTED);
        tumbler.is_allowed(INSPECTION_REQUESTED);
        tumbler.is_allowed(INSPECTION_REQUESTED);
        tumbler.is_allowed(LESSON_EXTRACTED);

        let stats = tumbler.stats();
        assert_eq!(stats.allowed, 1);
        assert_eq!(stats.rejected, 3);
        assert_eq!(stats.checked(), 4);
        assert_eq!(stats.rejected_by_signal.get(&INSPECTION_REQUESTED), Some(&2));
        assert_eq!(stats.rejected_by_signal.get(&LESSON_EXTRACTED), Some(&1));

        tumbler.reset_stats();
        assert_eq!(tumbler.stats(), TumblerStats::default());
    }

    #[test]
    fn contains_does_not_count() {
        let tumbler = Tumbler::new("inspector", [BUILD_STARTED]);
        assert!(tumbler.contains(BUILD_STARTED));
        assert!(!tumbler.contains(LESSON_EXTRACTED));
        assert_eq!(tumbler.stats().checked(), 0);
    }

    #[test]
    fn replace_swaps_whitelist_and_keeps_stats() {
        let tumbler = Tumbler::new("inspector", [BUILD_STARTED]);
        tumbler.is_allowed(LESSON_EXTRACTED);

        tumbler.replace([LESSON_EXTRACTED, INSPECTION_REQUESTED]);
        assert!(!tumbler.contains(BUILD_STARTED));
        assert!(tumbler.contains(LESSON_EXTRACTED));
        assert_eq!(tumbler.stats().rejected, 1);
        assert_eq!(tumbler.name(), "inspector");
    }

    #[test]
    fn concurrent_mutation_and_checks() {
        let tumbler = Arc::new(Tumbler::closed("shared"));
        let handles: Vec<_> = (0..4u16)
            .map(|worker| {
                let tumbler = Arc::clone(&tumbler);
                thread::spawn(move || {
                    for code in (worker * 100)..(worker * 100 + 50) {
                        tumbler.allow(code);
                        assert!(tumbler.is_allowed(code));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tumbler.whitelist().len(), 200);
        assert_eq!(tumbler.stats().allowed, 200);
    }

    #[test]
    fn stats_serialize_to_json() {
        let tumbler = Tumbler::new("inspector", [BUILD_STARTED]);
        tumbler.is_allowed(LESSON_EXTRACTED);

        let value = serde_json::to_value(tumbler.stats()).unwrap();
        assert_eq!(value["rejected"], 1);
        assert_eq!(value["rejected_by_signal"]["224"], 1);
    }
}
