mod operations;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;

use rulevault_model::{AlertRule, Namespace};

use crate::observe::{NoopObserver, StoreObserver, StoreOp};

/// In-memory, mutex-serialized implementation of
/// [`RuleStore`](crate::RuleStore).
///
/// All state lives behind one coarse `Mutex` per store instance: every
/// operation locks, works on the state, and releases without awaiting, so
/// concurrent scheduler readers and editor writers observe either the
/// pre- or post-state of any mutation, never an interleaving. Mutations
/// apply to a scratch clone and commit by swapping it in under the lock,
/// which makes every bulk operation all-or-nothing.
///
/// Multiple independent instances can coexist (test isolation, per-shard
/// tenancy); there is no ambient global state.
pub struct MemRuleStore {
    state: Mutex<StoreState>,
    observer: Arc<dyn StoreObserver>,
}

/// Complete store state: one identity counter plus per-org collections.
#[derive(Debug, Clone)]
pub(crate) struct StoreState {
    /// Source of internal record identities (rules and namespaces share it).
    pub(crate) next_id: i64,
    pub(crate) orgs: HashMap<i64, OrgState>,
}

/// Rules and namespaces belonging to one organization.
///
/// Both collections are insertion-ordered (`IndexMap`): list and group
/// reads return rules in store order, matching the order they were created.
#[derive(Debug, Clone, Default)]
pub(crate) struct OrgState {
    /// Rule UID -> stored rule.
    pub(crate) rules: IndexMap<String, StoredRule>,
    /// Namespace UID -> folder record.
    pub(crate) namespaces: IndexMap<String, Namespace>,
    /// Highest version ever assigned per rule UID, surviving deletion.
    ///
    /// Version lineage persists across delete + reinsert of the same UID:
    /// a reinserted rule resumes one past its retired high-water mark, so a
    /// scheduler cache keyed by `(uid, version)` can never see a stale hit.
    pub(crate) version_high_water: HashMap<String, i64>,
}

/// A rule plus its store-generated internal identity.
#[derive(Debug, Clone)]
pub(crate) struct StoredRule {
    pub(crate) id: i64,
    pub(crate) rule: AlertRule,
}

impl MemRuleStore {
    /// Create an empty store with the no-op observer.
    pub fn new() -> Self {
        Self::with_observer(Arc::new(NoopObserver))
    }

    /// Create an empty store notifying the given observer after each
    /// operation.
    pub fn with_observer(observer: Arc<dyn StoreObserver>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                next_id: 1,
                orgs: HashMap::new(),
            }),
            observer,
        }
    }

    /// Seed or overwrite rules verbatim, bypassing version management.
    ///
    /// Test fixture support: fields are stored exactly as given (including
    /// `version` and `updated`), keyed by `(org_id, uid)` upsert. Unknown
    /// namespaces are auto-provisioned just like on insert. Not part of the
    /// [`RuleStore`](crate::RuleStore) surface and not reported to the
    /// observer.
    pub fn put_rules(&self, rules: impl IntoIterator<Item = AlertRule>) {
        let mut state = self.lock();
        for rule in rules {
            operations::put_rule(&mut state, rule);
        }
    }

    /// Total number of rules across all orgs. Test support.
    pub fn rule_count(&self) -> usize {
        self.lock().orgs.values().map(|org| org.rules.len()).sum()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().expect("rule store lock poisoned")
    }

    pub(crate) fn notify(&self, op: &StoreOp) {
        self.observer.observe(op);
    }
}

impl Default for MemRuleStore {
    fn default() -> Self {
        Self::new()
    }
}
