//! Fault injection: a decorator that can fail any operation before it
//! reaches the wrapped store.
//!
//! Store consumers (the scheduler, editor services) are tested against
//! `FaultInjector<MemRuleStore>` instead of a modified engine: the hook
//! inspects the would-be operation and either lets it through or returns an
//! error, leaving the inner store untouched.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use rulevault_model::{
    ActorVisibility, AlertRule, AlertRuleKeyWithVersion, ListRulesFilter, Namespace, UpdateRule,
};

use crate::error::Result;
use crate::observe::StoreOp;
use crate::{RuleStore, TxFn};

/// Decision hook consulted before each operation is delegated.
pub type FaultHook = Arc<dyn Fn(&StoreOp) -> Result<()> + Send + Sync>;

/// Wraps any [`RuleStore`], consulting a hook before delegating each call.
///
/// When the hook returns an error the inner store is never touched, so the
/// operation has zero effect — the same contract a failed bulk write gives.
pub struct FaultInjector<S> {
    inner: S,
    hook: FaultHook,
}

impl<S: RuleStore> FaultInjector<S> {
    pub fn new(inner: S, hook: FaultHook) -> Self {
        Self { inner, hook }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Replace the decision hook.
    pub fn set_hook(&mut self, hook: FaultHook) {
        self.hook = hook;
    }

    fn check(&self, op: &StoreOp) -> Result<()> {
        (self.hook)(op)
    }
}

#[async_trait]
impl<S: RuleStore> RuleStore for FaultInjector<S> {
    async fn get_rule_by_uid(&self, org_id: i64, uid: &str) -> Result<Option<AlertRule>> {
        self.check(&StoreOp::GetRuleByUid {
            org_id,
            uid: uid.to_string(),
        })?;
        self.inner.get_rule_by_uid(org_id, uid).await
    }

    async fn get_rule_group_by_rule_uid(&self, org_id: i64, uid: &str) -> Result<Vec<AlertRule>> {
        self.check(&StoreOp::GetRuleGroupByRuleUid {
            org_id,
            uid: uid.to_string(),
        })?;
        self.inner.get_rule_group_by_rule_uid(org_id, uid).await
    }

    async fn list_rules(&self, org_id: i64, filter: &ListRulesFilter) -> Result<Vec<AlertRule>> {
        self.check(&StoreOp::ListRules {
            org_id,
            filter: filter.clone(),
        })?;
        self.inner.list_rules(org_id, filter).await
    }

    async fn insert_rules(
        &self,
        org_id: i64,
        rules: Vec<AlertRule>,
    ) -> Result<HashMap<String, i64>> {
        self.check(&StoreOp::InsertRules {
            org_id,
            uids: rules.iter().map(|rule| rule.uid.clone()).collect(),
        })?;
        self.inner.insert_rules(org_id, rules).await
    }

    async fn update_rules(&self, org_id: i64, updates: Vec<UpdateRule>) -> Result<()> {
        self.check(&StoreOp::UpdateRules {
            org_id,
            uids: updates.iter().map(|cmd| cmd.uid.clone()).collect(),
        })?;
        self.inner.update_rules(org_id, updates).await
    }

    async fn delete_rules_by_uid(&self, org_id: i64, uids: &[String]) -> Result<()> {
        self.check(&StoreOp::DeleteRulesByUid {
            org_id,
            uids: uids.to_vec(),
        })?;
        self.inner.delete_rules_by_uid(org_id, uids).await
    }

    async fn get_rule_group_interval(
        &self,
        org_id: i64,
        namespace_uid: &str,
        rule_group: &str,
    ) -> Result<i64> {
        self.check(&StoreOp::GetRuleGroupInterval {
            org_id,
            namespace_uid: namespace_uid.to_string(),
            rule_group: rule_group.to_string(),
        })?;
        self.inner
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
        self.check(&StoreOp::UpdateRuleGroupInterval {
            org_id,
            namespace_uid: namespace_uid.to_string(),
            rule_group: rule_group.to_string(),
            interval_seconds,
        })?;
        self.inner
            .update_rule_group_interval(org_id, namespace_uid, rule_group, interval_seconds)
            .await
    }

    async fn bump_namespace_versions(
        &self,
        org_id: i64,
        namespace_uid: &str,
    ) -> Result<Vec<AlertRuleKeyWithVersion>> {
        self.check(&StoreOp::BumpNamespaceVersions {
            org_id,
            namespace_uid: namespace_uid.to_string(),
        })?;
        self.inner.bump_namespace_versions(org_id, namespace_uid).await
    }

    async fn in_transaction(&self, f: TxFn) -> Result<()> {
        self.check(&StoreOp::Transaction)?;
        self.inner.in_transaction(f).await
    }

    async fn visible_namespaces(
        &self,
        org_id: i64,
        visibility: &ActorVisibility,
    ) -> Result<HashMap<String, Namespace>> {
        self.check(&StoreOp::VisibleNamespaces { org_id })?;
        self.inner.visible_namespaces(org_id, visibility).await
    }

    async fn namespace_by_title(
        &self,
        title: &str,
        org_id: i64,
        visibility: &ActorVisibility,
    ) -> Result<Namespace> {
        self.check(&StoreOp::NamespaceByTitle {
            org_id,
            title: title.to_string(),
        })?;
        self.inner.namespace_by_title(title, org_id, visibility).await
    }

    async fn namespace_by_uid(
        &self,
        uid: &str,
        org_id: i64,
        visibility: &ActorVisibility,
    ) -> Result<Namespace> {
        self.check(&StoreOp::NamespaceByUid {
            org_id,
            uid: uid.to_string(),
        })?;
        self.inner.namespace_by_uid(uid, org_id, visibility).await
    }
}
