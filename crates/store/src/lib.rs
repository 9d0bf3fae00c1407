//! Multi-tenant alert-rule store.
//!
//! This crate provides:
//! - The [`RuleStore`] trait: the surface a rule-evaluation scheduler polls
//!   and an editing API mutates, all operations scoped to one organization
//! - [`MemRuleStore`]: the in-memory, mutex-serialized implementation
//! - Group-interval consistency enforcement and namespace-wide version
//!   fencing for scheduler cache invalidation
//! - A [`FaultInjector`] decorator and [`StoreObserver`] hook for testing
//!   store consumers without touching the engine

pub mod error;
pub mod fault;
pub mod memory;
pub mod observe;

pub use error::{Result, StoreError};
pub use fault::{FaultHook, FaultInjector};
pub use memory::MemRuleStore;
pub use observe::{NoopObserver, RecordingObserver, StoreObserver, StoreOp};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use rulevault_model::{
    ActorVisibility, AlertRule, AlertRuleKeyWithVersion, ListRulesFilter, Namespace, UpdateRule,
};

/// Transactional view of the store, handed to [`RuleStore::in_transaction`]
/// closures.
///
/// Every call on this handle joins the enclosing atomic unit: nothing becomes
/// visible to concurrent readers until the closure returns `Ok` and the unit
/// commits, and an `Err` return discards all of it.
pub trait RuleStoreTx {
    /// Soft-miss single-rule lookup; see [`RuleStore::get_rule_by_uid`].
    fn get_rule_by_uid(&self, org_id: i64, uid: &str) -> Result<Option<AlertRule>>;

    /// All rules sharing the seed rule's group key, in store order.
    fn get_rule_group_by_rule_uid(&self, org_id: i64, uid: &str) -> Result<Vec<AlertRule>>;

    /// Conjunctive filtered listing; see [`RuleStore::list_rules`].
    fn list_rules(&self, org_id: i64, filter: &ListRulesFilter) -> Result<Vec<AlertRule>>;

    /// Insert a batch of rules; see [`RuleStore::insert_rules`].
    fn insert_rules(&mut self, org_id: i64, rules: Vec<AlertRule>) -> Result<HashMap<String, i64>>;

    /// Apply a batch of update commands; see [`RuleStore::update_rules`].
    fn update_rules(&mut self, org_id: i64, updates: Vec<UpdateRule>) -> Result<()>;

    /// Idempotent delete by UID set.
    fn delete_rules_by_uid(&mut self, org_id: i64, uids: &[String]) -> Result<()>;

    /// The shared interval of the group, read from any member.
    fn get_rule_group_interval(
        &self,
        org_id: i64,
        namespace_uid: &str,
        rule_group: &str,
    ) -> Result<i64>;

    /// Atomically rewrite the shared interval of every group member.
    fn update_rule_group_interval(
        &mut self,
        org_id: i64,
        namespace_uid: &str,
        rule_group: &str,
        interval_seconds: i64,
    ) -> Result<()>;

    /// Increment the version of every rule in the namespace.
    fn bump_namespace_versions(
        &mut self,
        org_id: i64,
        namespace_uid: &str,
    ) -> Result<Vec<AlertRuleKeyWithVersion>>;
}

/// A unit of work executed against the transactional store view.
pub type TxFn = Box<dyn FnOnce(&mut dyn RuleStoreTx) -> Result<()> + Send>;

/// Authoritative store of alert rules, grouped for scheduling and scoped per
/// organization.
///
/// Implementations must be safe to share across tasks (`Send + Sync`): the
/// store is polled continuously by long-lived scheduler readers while
/// short-lived editor writers mutate it. All operations observe either the
/// pre- or post-state of any concurrent mutation, never an interleaving.
/// Cancellation is the caller's concern — dropping the returned future
/// aborts before any effect becomes visible.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Fetch one rule by UID.
    ///
    /// A missing rule is a soft miss: `Ok(None)`, not an error. Schedulers
    /// read `None` as "rule not currently scheduled".
    async fn get_rule_by_uid(&self, org_id: i64, uid: &str) -> Result<Option<AlertRule>>;

    /// Resolve the rule, then return every rule sharing its group key, in
    /// store order. Empty when the seed rule is absent.
    async fn get_rule_group_by_rule_uid(&self, org_id: i64, uid: &str) -> Result<Vec<AlertRule>>;

    /// List the org's rules matching every populated filter term.
    async fn list_rules(&self, org_id: i64, filter: &ListRulesFilter) -> Result<Vec<AlertRule>>;

    /// Atomically create a batch of rules; either all are created or none.
    ///
    /// Returns the store-generated internal identities keyed by rule UID.
    /// Rules with an empty UID are assigned a generated one. Referencing an
    /// unknown namespace auto-provisions a folder record for it.
    async fn insert_rules(
        &self,
        org_id: i64,
        rules: Vec<AlertRule>,
    ) -> Result<HashMap<String, i64>>;

    /// Atomically apply a batch of update commands, each addressing one rule
    /// by UID. Bumps each touched rule's version and `updated` timestamp.
    async fn update_rules(&self, org_id: i64, updates: Vec<UpdateRule>) -> Result<()>;

    /// Delete all matching rules. UIDs not present are silently ignored.
    async fn delete_rules_by_uid(&self, org_id: i64, uids: &[String]) -> Result<()>;

    /// The shared evaluation interval of the group, read from any member.
    ///
    /// Fails with [`StoreError::GroupNotFound`] when the group has no
    /// members.
    async fn get_rule_group_interval(
        &self,
        org_id: i64,
        namespace_uid: &str,
        rule_group: &str,
    ) -> Result<i64>;

    /// Atomically rewrite `interval_seconds` on every member of the group.
    ///
    /// A group with zero members is a no-op, not an error — tolerates races
    /// where the group was concurrently emptied.
    async fn update_rule_group_interval(
        &self,
        org_id: i64,
        namespace_uid: &str,
        rule_group: &str,
        interval_seconds: i64,
    ) -> Result<()>;

    /// Increment the version of every rule in the namespace by exactly one
    /// and refresh its `updated` timestamp, in one atomic sweep.
    ///
    /// This is the change fence: an out-of-band event (folder move,
    /// permission change) invalidates every cached compilation keyed by
    /// `(uid, version)` without rewriting rule bodies.
    async fn bump_namespace_versions(
        &self,
        org_id: i64,
        namespace_uid: &str,
    ) -> Result<Vec<AlertRuleKeyWithVersion>>;

    /// Execute `f` as one atomic unit.
    ///
    /// Partial failure inside `f` leaves no partial mutation visible to
    /// concurrent readers. Calls issued through the [`RuleStoreTx`] handle
    /// participate in the same unit rather than opening independent ones.
    async fn in_transaction(&self, f: TxFn) -> Result<()>;

    /// All namespaces of the org visible to the actor, keyed by UID.
    ///
    /// An org with no rules or namespaces yields an empty map, not an error.
    async fn visible_namespaces(
        &self,
        org_id: i64,
        visibility: &ActorVisibility,
    ) -> Result<HashMap<String, Namespace>>;

    /// Find a visible namespace by title; [`StoreError::NamespaceNotFound`]
    /// when no visible namespace carries it.
    async fn namespace_by_title(
        &self,
        title: &str,
        org_id: i64,
        visibility: &ActorVisibility,
    ) -> Result<Namespace>;

    /// Find a visible namespace by UID; [`StoreError::NamespaceNotFound`]
    /// when absent or invisible.
    async fn namespace_by_uid(
        &self,
        uid: &str,
        org_id: i64,
        visibility: &ActorVisibility,
    ) -> Result<Namespace>;
}

/// Blanket implementation so `Arc<dyn RuleStore>` can be used directly.
#[async_trait]
impl<T: RuleStore + ?Sized> RuleStore for Arc<T> {
    async fn get_rule_by_uid(&self, org_id: i64, uid: &str) -> Result<Option<AlertRule>> {
        (**self).get_rule_by_uid(org_id, uid).await
    }

    async fn get_rule_group_by_rule_uid(&self, org_id: i64, uid: &str) -> Result<Vec<AlertRule>> {
        (**self).get_rule_group_by_rule_uid(org_id, uid).await
    }

    async fn list_rules(&self, org_id: i64, filter: &ListRulesFilter) -> Result<Vec<AlertRule>> {
        (**self).list_rules(org_id, filter).await
    }

    async fn insert_rules(
        &self,
        org_id: i64,
        rules: Vec<AlertRule>,
    ) -> Result<HashMap<String, i64>> {
        (**self).insert_rules(org_id, rules).await
    }

    async fn update_rules(&self, org_id: i64, updates: Vec<UpdateRule>) -> Result<()> {
        (**self).update_rules(org_id, updates).await
    }

    async fn delete_rules_by_uid(&self, org_id: i64, uids: &[String]) -> Result<()> {
        (**self).delete_rules_by_uid(org_id, uids).await
    }

    async fn get_rule_group_interval(
        &self,
        org_id: i64,
        namespace_uid: &str,
        rule_group: &str,
    ) -> Result<i64> {
        (**self)
            .get_rule_group_interval(org_id, namespace_uid, rule_group)
            .await
    }

    async fn update_rule_group_interval(
        &self,
        org_id: i64,
        namespace_uid: &str,
        rule_group: &str,
        interval_seconds: i64,
    ) -> Result<()> {
        (**self)
            .update_rule_group_interval(org_id, namespace_uid, rule_group, interval_seconds)
            .await
    }

    async fn bump_namespace_versions(
        &self,
        org_id: i64,
        namespace_uid: &str,
    ) -> Result<Vec<AlertRuleKeyWithVersion>> {
        (**self).bump_namespace_versions(org_id, namespace_uid).await
    }

    async fn in_transaction(&self, f: TxFn) -> Result<()> {
        (**self).in_transaction(f).await
    }

    async fn visible_namespaces(
        &self,
        org_id: i64,
        visibility: &ActorVisibility,
    ) -> Result<HashMap<String, Namespace>> {
        (**self).visible_namespaces(org_id, visibility).await
    }

    async fn namespace_by_title(
        &self,
        title: &str,
        org_id: i64,
        visibility: &ActorVisibility,
    ) -> Result<Namespace> {
        (**self).namespace_by_title(title, org_id, visibility).await
    }

    async fn namespace_by_uid(
        &self,
        uid: &str,
        org_id: i64,
        visibility: &ActorVisibility,
    ) -> Result<Namespace> {
        (**self).namespace_by_uid(uid, org_id, visibility).await
    }
}
