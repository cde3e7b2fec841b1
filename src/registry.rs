//! Identity registry: O(1) membership of already-canonical values.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::value::Value;

enum Entry {
    Weak(Weak<Value>),
    Strong(Rc<Value>),
}

impl Entry {
    fn is_live(&self) -> bool {
        match self {
            Entry::Weak(weak) => weak.strong_count() > 0,
            Entry::Strong(_) => true,
        }
    }
}

/// Entry slack tolerated before the first sweep.
const SWEEP_FLOOR: usize = 8;

/// Membership set for canonical representatives, keyed by allocation address.
///
/// Under weak retention an entry whose representative has been dropped may
/// alias a newer allocation at the same address, so `has` validates liveness
/// and prunes stale entries before trusting a hit. `add` amortizedly sweeps
/// dead entries once the map has doubled past its live size, keeping the
/// registry proportional to the live working set.
pub(crate) struct IdentityRegistry {
    entries: HashMap<usize, Entry>,
    weak: bool,
    /// Entry count that triggers the next sweep.
    sweep_at: usize,
}

impl IdentityRegistry {
    pub(crate) fn new(weak: bool) -> Self {
        Self {
            entries: HashMap::new(),
            weak,
            sweep_at: SWEEP_FLOOR,
        }
    }

    /// Whether `value` is a known canonical representative.
    pub(crate) fn has(&mut self, value: &Rc<Value>) -> bool {
        let addr = Rc::as_ptr(value) as usize;
        let live = match self.entries.get(&addr) {
            Some(entry) => entry.is_live(),
            None => return false,
        };
        if !live {
            // The recorded representative died and `value` reuses its
            // address: the entry is stale.
            self.entries.remove(&addr);
        }
        live
    }

    /// Records `value` as canonical.
    pub(crate) fn add(&mut self, value: &Rc<Value>) {
        if self.weak && self.entries.len() >= self.sweep_at {
            self.entries.retain(|_, entry| entry.is_live());
            self.sweep_at = (self.entries.len() * 2).max(SWEEP_FLOOR);
        }
        let entry = if self.weak {
            Entry::Weak(Rc::downgrade(value))
        } else {
            Entry::Strong(value.clone())
        };
        self.entries.insert(Rc::as_ptr(value) as usize, entry);
    }

    /// Number of entries whose representative is still alive.
    pub(crate) fn live_len(&self) -> usize {
        self.entries.values().filter(|entry| entry.is_live()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Rc<Value> {
        Rc::new(Value::Array(vec![Rc::new(Value::Number(1.0))]))
    }

    #[test]
    fn membership_follows_add() {
        let mut registry = IdentityRegistry::new(true);
        let value = sample();
        assert!(!registry.has(&value));
        registry.add(&value);
        assert!(registry.has(&value));
        // A reference-distinct twin is not a member.
        assert!(!registry.has(&sample()));
    }

    #[test]
    fn weak_entries_die_with_their_value() {
        let mut registry = IdentityRegistry::new(true);
        {
            let value = sample();
            registry.add(&value);
            assert_eq!(registry.live_len(), 1);
        }
        assert_eq!(registry.live_len(), 0);
    }

    #[test]
    fn dead_entries_are_swept_amortizedly() {
        let mut registry = IdentityRegistry::new(true);
        for _ in 0..64 {
            registry.add(&sample());
        }
        // Every representative above died immediately; sweeps keep the map
        // near its live size instead of retaining one stub per admission.
        assert!(registry.entries.len() <= SWEEP_FLOOR + 1);
        assert_eq!(registry.live_len(), 0);
    }

    #[test]
    fn sweeping_spares_live_entries() {
        let mut registry = IdentityRegistry::new(true);
        let keeper = sample();
        registry.add(&keeper);
        for _ in 0..64 {
            registry.add(&sample());
        }
        assert!(registry.has(&keeper));
        assert_eq!(registry.live_len(), 1);
    }

    #[test]
    fn strong_entries_outlive_their_value() {
        let mut registry = IdentityRegistry::new(false);
        {
            let value = sample();
            registry.add(&value);
        }
        assert_eq!(registry.live_len(), 1);
    }
}
