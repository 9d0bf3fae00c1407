//! Operation observation: descriptors, observer hook, and a recording
//! implementation for tests.
//!
//! The store notifies its observer after each operation takes effect.
//! Production deployments keep the default [`NoopObserver`]; test code
//! installs a [`RecordingObserver`] and asserts on the captured sequence.

use std::sync::{Arc, RwLock};

use rulevault_model::ListRulesFilter;

/// Descriptor of one store operation, captured after it takes effect.
///
/// Mutating descriptors carry the UIDs they touched; read descriptors carry
/// their query parameters. Content payloads are deliberately omitted — the
/// audit trail answers "what happened, to what", not "with which bytes".
#[derive(Debug, Clone)]
pub enum StoreOp {
    GetRuleByUid {
        org_id: i64,
        uid: String,
    },
    GetRuleGroupByRuleUid {
        org_id: i64,
        uid: String,
    },
    ListRules {
        org_id: i64,
        filter: ListRulesFilter,
    },
    InsertRules {
        org_id: i64,
        uids: Vec<String>,
    },
    UpdateRules {
        org_id: i64,
        uids: Vec<String>,
    },
    DeleteRulesByUid {
        org_id: i64,
        uids: Vec<String>,
    },
    GetRuleGroupInterval {
        org_id: i64,
        namespace_uid: String,
        rule_group: String,
    },
    UpdateRuleGroupInterval {
        org_id: i64,
        namespace_uid: String,
        rule_group: String,
        interval_seconds: i64,
    },
    BumpNamespaceVersions {
        org_id: i64,
        namespace_uid: String,
    },
    VisibleNamespaces {
        org_id: i64,
    },
    NamespaceByTitle {
        org_id: i64,
        title: String,
    },
    NamespaceByUid {
        org_id: i64,
        uid: String,
    },
    Transaction,
}

impl StoreOp {
    /// Stable operation name, useful for filtering recorded sequences.
    pub fn name(&self) -> &'static str {
        match self {
            StoreOp::GetRuleByUid { .. } => "get_rule_by_uid",
            StoreOp::GetRuleGroupByRuleUid { .. } => "get_rule_group_by_rule_uid",
            StoreOp::ListRules { .. } => "list_rules",
            StoreOp::InsertRules { .. } => "insert_rules",
            StoreOp::UpdateRules { .. } => "update_rules",
            StoreOp::DeleteRulesByUid { .. } => "delete_rules_by_uid",
            StoreOp::GetRuleGroupInterval { .. } => "get_rule_group_interval",
            StoreOp::UpdateRuleGroupInterval { .. } => "update_rule_group_interval",
            StoreOp::BumpNamespaceVersions { .. } => "bump_namespace_versions",
            StoreOp::VisibleNamespaces { .. } => "visible_namespaces",
            StoreOp::NamespaceByTitle { .. } => "namespace_by_title",
            StoreOp::NamespaceByUid { .. } => "namespace_by_uid",
            StoreOp::Transaction => "transaction",
        }
    }
}

/// Observer notified after each store operation.
///
/// Called outside the store's critical section, so implementations may do
/// their own locking but must not call back into the store.
pub trait StoreObserver: Send + Sync {
    fn observe(&self, op: &StoreOp);
}

/// Production default: drops every notification.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl StoreObserver for NoopObserver {
    fn observe(&self, _op: &StoreOp) {}
}

/// Captures every observed operation for later assertion.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    ops: RwLock<Vec<StoreOp>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of everything recorded so far, in observation order.
    pub fn recorded(&self) -> Vec<StoreOp> {
        self.ops.read().expect("observer lock poisoned").clone()
    }

    /// Recorded operations matching the given predicate.
    pub fn recorded_matching(&self, predicate: impl Fn(&StoreOp) -> bool) -> Vec<StoreOp> {
        self.ops
            .read()
            .expect("observer lock poisoned")
            .iter()
            .filter(|op| predicate(op))
            .cloned()
            .collect()
    }

    /// Drop everything recorded so far.
    pub fn reset(&self) {
        self.ops.write().expect("observer lock poisoned").clear();
    }
}

impl StoreObserver for RecordingObserver {
    fn observe(&self, op: &StoreOp) {
        self.ops.write().expect("observer lock poisoned").push(op.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_captures_in_order() {
        let rec = RecordingObserver::new();
        rec.observe(&StoreOp::GetRuleByUid {
            org_id: 1,
            uid: "a".to_string(),
        });
        rec.observe(&StoreOp::DeleteRulesByUid {
            org_id: 1,
            uids: vec!["a".to_string()],
        });

        let ops = rec.recorded();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].name(), "get_rule_by_uid");
        assert_eq!(ops[1].name(), "delete_rules_by_uid");
    }

    #[test]
    fn recorded_matching_filters() {
        let rec = RecordingObserver::new();
        rec.observe(&StoreOp::Transaction);
        rec.observe(&StoreOp::VisibleNamespaces { org_id: 7 });
        rec.observe(&StoreOp::Transaction);

        let txs = rec.recorded_matching(|op| matches!(op, StoreOp::Transaction));
        assert_eq!(txs.len(), 2);
    }

    #[test]
    fn reset_clears() {
        let rec = RecordingObserver::new();
        rec.observe(&StoreOp::Transaction);
        rec.reset();
        assert!(rec.recorded().is_empty());
    }
}
