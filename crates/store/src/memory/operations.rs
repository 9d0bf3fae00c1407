//! Operation logic for [`MemRuleStore`]: pure functions over [`StoreState`]
//! shared by the direct trait surface and the transactional view.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use rulevault_model::{
    short_uid, ActorVisibility, AlertRule, AlertRuleGroupKey, AlertRuleKeyWithVersion,
    ListRulesFilter, Namespace, UpdateRule,
};

use crate::error::{Result, StoreError};
use crate::observe::StoreOp;
use crate::{RuleStore, RuleStoreTx, TxFn};

use super::{MemRuleStore, OrgState, StoreState, StoredRule};

// ── Read operations ─────────────────────────────────────────────

pub(super) fn get_rule_by_uid(state: &StoreState, org_id: i64, uid: &str) -> Option<AlertRule> {
    state
        .orgs
        .get(&org_id)
        .and_then(|org| org.rules.get(uid))
        .map(|stored| stored.rule.clone())
}

pub(super) fn get_rule_group_by_rule_uid(
    state: &StoreState,
    org_id: i64,
    uid: &str,
) -> Vec<AlertRule> {
    let Some(org) = state.orgs.get(&org_id) else {
        return Vec::new();
    };
    let Some(seed) = org.rules.get(uid) else {
        return Vec::new();
    };
    let group_key = seed.rule.group_key();
    org.rules
        .values()
        .filter(|stored| stored.rule.group_key() == group_key)
        .map(|stored| stored.rule.clone())
        .collect()
}

pub(super) fn list_rules(
    state: &StoreState,
    org_id: i64,
    filter: &ListRulesFilter,
) -> Vec<AlertRule> {
    let Some(org) = state.orgs.get(&org_id) else {
        return Vec::new();
    };
    org.rules
        .values()
        .filter(|stored| filter.matches(&stored.rule))
        .map(|stored| stored.rule.clone())
        .collect()
}

pub(super) fn get_rule_group_interval(
    state: &StoreState,
    org_id: i64,
    namespace_uid: &str,
    rule_group: &str,
) -> Result<i64> {
    state
        .orgs
        .get(&org_id)
        .and_then(|org| {
            org.rules
                .values()
                .find(|stored| in_group(&stored.rule, namespace_uid, rule_group))
        })
        .map(|stored| stored.rule.interval_seconds)
        .ok_or_else(|| StoreError::GroupNotFound {
            group_key: AlertRuleGroupKey {
                org_id,
                namespace_uid: namespace_uid.to_string(),
                rule_group: rule_group.to_string(),
            },
        })
}

// ── Write operations ────────────────────────────────────────────
//
// All writers run against a scratch clone of the state; callers commit by
// swapping the scratch in. An early `Err` return therefore always means
// zero visible effect.

pub(super) fn insert_rules(
    state: &mut StoreState,
    org_id: i64,
    rules: Vec<AlertRule>,
) -> Result<HashMap<String, i64>> {
    let StoreState { next_id, orgs } = state;
    let org = orgs.entry(org_id).or_default();

    let mut ids = HashMap::with_capacity(rules.len());
    let mut touched = HashSet::new();

    for mut rule in rules {
        rule.org_id = org_id;
        if rule.uid.is_empty() {
            rule.uid = short_uid();
        }
        validate_rule(&rule)?;
        if org.rules.contains_key(&rule.uid) {
            return Err(StoreError::RuleAlreadyExists { key: rule.key() });
        }

        // Version lineage survives delete + reinsert of the same UID.
        rule.version = org.version_high_water.get(&rule.uid).copied().unwrap_or(0) + 1;
        rule.updated = Utc::now();

        ensure_namespace(org, next_id, org_id, &rule.namespace_uid);
        org.version_high_water.insert(rule.uid.clone(), rule.version);
        touched.insert(rule.group_key());

        let id = alloc_id(next_id);
        ids.insert(rule.uid.clone(), id);
        org.rules.insert(rule.uid.clone(), StoredRule { id, rule });
    }

    validate_group_intervals(org, &touched)?;
    Ok(ids)
}

pub(super) fn update_rules(
    state: &mut StoreState,
    org_id: i64,
    updates: Vec<UpdateRule>,
) -> Result<()> {
    let StoreState { next_id, orgs } = state;
    let org = orgs.entry(org_id).or_default();

    let mut touched = HashSet::new();

    for cmd in updates {
        let Some(existing) = org.rules.get(&cmd.uid).map(|stored| stored.rule.clone()) else {
            return Err(StoreError::RuleNotFound {
                key: rulevault_model::AlertRuleKey {
                    org_id,
                    uid: cmd.uid.clone(),
                },
            });
        };

        let mut new = cmd.new;
        new.org_id = org_id;
        new.uid = cmd.uid.clone();
        validate_rule(&new)?;
        new.version = existing.version + 1;
        new.updated = Utc::now();

        touched.insert(existing.group_key());
        touched.insert(new.group_key());

        ensure_namespace(org, next_id, org_id, &new.namespace_uid);
        org.version_high_water.insert(new.uid.clone(), new.version);
        if let Some(stored) = org.rules.get_mut(&cmd.uid) {
            stored.rule = new;
        }
    }

    validate_group_intervals(org, &touched)
}

pub(super) fn delete_rules_by_uid(state: &mut StoreState, org_id: i64, uids: &[String]) {
    let Some(org) = state.orgs.get_mut(&org_id) else {
        return;
    };
    for uid in uids {
        // Absent UIDs are silently ignored: delete is idempotent.
        // shift_remove keeps the remaining rules in store order.
        org.rules.shift_remove(uid);
    }
}

pub(super) fn update_rule_group_interval(
    state: &mut StoreState,
    org_id: i64,
    namespace_uid: &str,
    rule_group: &str,
    interval_seconds: i64,
) -> Result<()> {
    if interval_seconds <= 0 {
        return Err(StoreError::InvalidInterval {
            group_key: AlertRuleGroupKey {
                org_id,
                namespace_uid: namespace_uid.to_string(),
                rule_group: rule_group.to_string(),
            },
            interval_seconds,
        });
    }
    // A group with zero members is a no-op: the group may have been
    // concurrently emptied between the caller's read and this write.
    let Some(org) = state.orgs.get_mut(&org_id) else {
        return Ok(());
    };
    let now = Utc::now();
    for stored in org.rules.values_mut() {
        if in_group(&stored.rule, namespace_uid, rule_group) {
            stored.rule.interval_seconds = interval_seconds;
            stored.rule.version += 1;
            stored.rule.updated = now;
            org.version_high_water
                .insert(stored.rule.uid.clone(), stored.rule.version);
        }
    }
    Ok(())
}

pub(super) fn bump_namespace_versions(
    state: &mut StoreState,
    org_id: i64,
    namespace_uid: &str,
) -> Vec<AlertRuleKeyWithVersion> {
    let Some(org) = state.orgs.get_mut(&org_id) else {
        return Vec::new();
    };
    let now = Utc::now();
    let mut bumped = Vec::new();
    for stored in org.rules.values_mut() {
        if stored.rule.namespace_uid == namespace_uid {
            stored.rule.version += 1;
            stored.rule.updated = now;
            org.version_high_water
                .insert(stored.rule.uid.clone(), stored.rule.version);
            bumped.push(AlertRuleKeyWithVersion {
                key: stored.rule.key(),
                version: stored.rule.version,
            });
        }
    }
    bumped
}

pub(super) fn put_rule(state: &mut StoreState, rule: AlertRule) {
    let StoreState { next_id, orgs } = state;
    let org = orgs.entry(rule.org_id).or_default();
    ensure_namespace(org, next_id, rule.org_id, &rule.namespace_uid);

    let high_water = org.version_high_water.entry(rule.uid.clone()).or_insert(0);
    if rule.version > *high_water {
        *high_water = rule.version;
    }

    match org.rules.get_mut(&rule.uid) {
        Some(stored) => stored.rule = rule,
        None => {
            let id = alloc_id(next_id);
            org.rules.insert(rule.uid.clone(), StoredRule { id, rule });
        }
    }
}

// ── Namespace directory ─────────────────────────────────────────

pub(super) fn visible_namespaces(
    state: &StoreState,
    org_id: i64,
    visibility: &ActorVisibility,
) -> HashMap<String, Namespace> {
    let Some(org) = state.orgs.get(&org_id) else {
        return HashMap::new();
    };
    org.namespaces
        .values()
        .filter(|ns| visibility.can_see(&ns.uid))
        .map(|ns| (ns.uid.clone(), ns.clone()))
        .collect()
}

pub(super) fn namespace_by_title(
    state: &StoreState,
    title: &str,
    org_id: i64,
    visibility: &ActorVisibility,
) -> Result<Namespace> {
    state
        .orgs
        .get(&org_id)
        .and_then(|org| {
            org.namespaces
                .values()
                .find(|ns| ns.title == title && visibility.can_see(&ns.uid))
        })
        .cloned()
        .ok_or_else(|| StoreError::NamespaceNotFound {
            org_id,
            reference: title.to_string(),
        })
}

pub(super) fn namespace_by_uid(
    state: &StoreState,
    uid: &str,
    org_id: i64,
    visibility: &ActorVisibility,
) -> Result<Namespace> {
    state
        .orgs
        .get(&org_id)
        .and_then(|org| org.namespaces.get(uid))
        .filter(|ns| visibility.can_see(&ns.uid))
        .cloned()
        .ok_or_else(|| StoreError::NamespaceNotFound {
            org_id,
            reference: uid.to_string(),
        })
}

// ── Helpers ─────────────────────────────────────────────────────

fn alloc_id(next_id: &mut i64) -> i64 {
    let id = *next_id;
    *next_id += 1;
    id
}

fn in_group(rule: &AlertRule, namespace_uid: &str, rule_group: &str) -> bool {
    rule.namespace_uid == namespace_uid && rule.rule_group == rule_group
}

/// Auto-provision a folder record the first time a rule references an
/// unknown namespace UID. The directory owns folder records afterwards;
/// the rule store never deletes them.
fn ensure_namespace(org: &mut OrgState, next_id: &mut i64, org_id: i64, namespace_uid: &str) {
    if org.namespaces.contains_key(namespace_uid) {
        return;
    }
    let namespace = Namespace {
        id: alloc_id(next_id),
        org_id,
        uid: namespace_uid.to_string(),
        title: format!("folder-{}", short_uid()),
    };
    debug!(org_id, namespace_uid, title = %namespace.title, "auto-provisioned namespace");
    org.namespaces.insert(namespace_uid.to_string(), namespace);
}

fn validate_rule(rule: &AlertRule) -> Result<()> {
    let invalid = |reason: String| StoreError::InvalidRule {
        uid: rule.uid.clone(),
        reason,
    };
    if rule.namespace_uid.is_empty() {
        return Err(invalid("namespace UID must not be empty".to_string()));
    }
    if rule.rule_group.is_empty() {
        return Err(invalid("rule group must not be empty".to_string()));
    }
    if rule.interval_seconds <= 0 {
        return Err(invalid(format!(
            "interval must be positive, got {}",
            rule.interval_seconds
        )));
    }
    // Dashboard and panel provenance is both-or-neither.
    match (&rule.dashboard_uid, rule.panel_id) {
        (Some(_), None) => Err(invalid("dashboard UID set without panel ID".to_string())),
        (None, Some(_)) => Err(invalid("panel ID set without dashboard UID".to_string())),
        _ => Ok(()),
    }
}

/// Reject a write whose post-state leaves one group with differing
/// intervals. Only groups touched by the write need checking: untouched
/// groups were consistent before and are unchanged.
fn validate_group_intervals(org: &OrgState, touched: &HashSet<AlertRuleGroupKey>) -> Result<()> {
    for group_key in touched {
        let mut intervals: Vec<i64> = org
            .rules
            .values()
            .filter(|stored| stored.rule.group_key() == *group_key)
            .map(|stored| stored.rule.interval_seconds)
            .collect();
        intervals.sort_unstable();
        intervals.dedup();
        if intervals.len() > 1 {
            return Err(StoreError::GroupIntervalConflict {
                group_key: group_key.clone(),
                intervals,
            });
        }
    }
    Ok(())
}

// ── Transactional view ──────────────────────────────────────────

/// Scratch state for one transaction. Operation descriptors are buffered and
/// only reach the observer if the unit commits.
pub(super) struct MemTx {
    pub(super) state: StoreState,
    pub(super) ops: Vec<StoreOp>,
}

impl RuleStoreTx for MemTx {
    fn get_rule_by_uid(&self, org_id: i64, uid: &str) -> Result<Option<AlertRule>> {
        Ok(get_rule_by_uid(&self.state, org_id, uid))
    }

    fn get_rule_group_by_rule_uid(&self, org_id: i64, uid: &str) -> Result<Vec<AlertRule>> {
        Ok(get_rule_group_by_rule_uid(&self.state, org_id, uid))
    }

    fn list_rules(&self, org_id: i64, filter: &ListRulesFilter) -> Result<Vec<AlertRule>> {
        Ok(list_rules(&self.state, org_id, filter))
    }

    fn insert_rules(
        &mut self,
        org_id: i64,
        rules: Vec<AlertRule>,
    ) -> Result<HashMap<String, i64>> {
        // Bulk ops run against their own scratch even inside a transaction:
        // a mid-batch failure must have zero effect, including when the
        // closure swallows the error and still commits the unit.
        let mut scratch = self.state.clone();
        let ids = insert_rules(&mut scratch, org_id, rules)?;
        self.state = scratch;
        self.ops.push(StoreOp::InsertRules {
            org_id,
            uids: ids.keys().cloned().collect(),
        });
        Ok(ids)
    }

    fn update_rules(&mut self, org_id: i64, updates: Vec<UpdateRule>) -> Result<()> {
        let uids: Vec<String> = updates.iter().map(|cmd| cmd.uid.clone()).collect();
        let mut scratch = self.state.clone();
        update_rules(&mut scratch, org_id, updates)?;
        self.state = scratch;
        self.ops.push(StoreOp::UpdateRules { org_id, uids });
        Ok(())
    }

    fn delete_rules_by_uid(&mut self, org_id: i64, uids: &[String]) -> Result<()> {
        delete_rules_by_uid(&mut self.state, org_id, uids);
        self.ops.push(StoreOp::DeleteRulesByUid {
            org_id,
            uids: uids.to_vec(),
        });
        Ok(())
    }

    fn get_rule_group_interval(
        &self,
        org_id: i64,
        namespace_uid: &str,
        rule_group: &str,
    ) -> Result<i64> {
        get_rule_group_interval(&self.state, org_id, namespace_uid, rule_group)
    }

    fn update_rule_group_interval(
        &mut self,
        org_id: i64,
        namespace_uid: &str,
        rule_group: &str,
        interval_seconds: i64,
    ) -> Result<()> {
        update_rule_group_interval(
            &mut self.state,
            org_id,
            namespace_uid,
            rule_group,
            interval_seconds,
        )?;
        self.ops.push(StoreOp::UpdateRuleGroupInterval {
            org_id,
            namespace_uid: namespace_uid.to_string(),
            rule_group: rule_group.to_string(),
            interval_seconds,
        });
        Ok(())
    }

    fn bump_namespace_versions(
        &mut self,
        org_id: i64,
        namespace_uid: &str,
    ) -> Result<Vec<AlertRuleKeyWithVersion>> {
        let bumped = bump_namespace_versions(&mut self.state, org_id, namespace_uid);
        self.ops.push(StoreOp::BumpNamespaceVersions {
            org_id,
            namespace_uid: namespace_uid.to_string(),
        });
        Ok(bumped)
    }
}

// ── Trait surface ───────────────────────────────────────────────

#[async_trait]
impl RuleStore for MemRuleStore {
    async fn get_rule_by_uid(&self, org_id: i64, uid: &str) -> Result<Option<AlertRule>> {
        let rule = get_rule_by_uid(&self.lock(), org_id, uid);
        self.notify(&StoreOp::GetRuleByUid {
            org_id,
            uid: uid.to_string(),
        });
        Ok(rule)
    }

    async fn get_rule_group_by_rule_uid(&self, org_id: i64, uid: &str) -> Result<Vec<AlertRule>> {
        let rules = get_rule_group_by_rule_uid(&self.lock(), org_id, uid);
        self.notify(&StoreOp::GetRuleGroupByRuleUid {
            org_id,
            uid: uid.to_string(),
        });
        Ok(rules)
    }

    async fn list_rules(&self, org_id: i64, filter: &ListRulesFilter) -> Result<Vec<AlertRule>> {
        let rules = list_rules(&self.lock(), org_id, filter);
        self.notify(&StoreOp::ListRules {
            org_id,
            filter: filter.clone(),
        });
        Ok(rules)
    }

    async fn insert_rules(
        &self,
        org_id: i64,
        rules: Vec<AlertRule>,
    ) -> Result<HashMap<String, i64>> {
        let ids = {
            let mut guard = self.lock();
            let mut scratch = guard.clone();
            let ids = insert_rules(&mut scratch, org_id, rules)?;
            *guard = scratch;
            ids
        };
        debug!(org_id, count = ids.len(), "inserted alert rules");
        self.notify(&StoreOp::InsertRules {
            org_id,
            uids: ids.keys().cloned().collect(),
        });
        Ok(ids)
    }

    async fn update_rules(&self, org_id: i64, updates: Vec<UpdateRule>) -> Result<()> {
        let uids: Vec<String> = updates.iter().map(|cmd| cmd.uid.clone()).collect();
        {
            let mut guard = self.lock();
            let mut scratch = guard.clone();
            update_rules(&mut scratch, org_id, updates)?;
            *guard = scratch;
        }
        debug!(org_id, count = uids.len(), "updated alert rules");
        self.notify(&StoreOp::UpdateRules { org_id, uids });
        Ok(())
    }

    async fn delete_rules_by_uid(&self, org_id: i64, uids: &[String]) -> Result<()> {
        {
            let mut guard = self.lock();
            delete_rules_by_uid(&mut guard, org_id, uids);
        }
        debug!(org_id, count = uids.len(), "deleted alert rules");
        self.notify(&StoreOp::DeleteRulesByUid {
            org_id,
            uids: uids.to_vec(),
        });
        Ok(())
    }

    async fn get_rule_group_interval(
        &self,
        org_id: i64,
        namespace_uid: &str,
        rule_group: &str,
    ) -> Result<i64> {
        let interval = get_rule_group_interval(&self.lock(), org_id, namespace_uid, rule_group);
        self.notify(&StoreOp::GetRuleGroupInterval {
            org_id,
            namespace_uid: namespace_uid.to_string(),
            rule_group: rule_group.to_string(),
        });
        interval
    }

    async fn update_rule_group_interval(
        &self,
        org_id: i64,
        namespace_uid: &str,
        rule_group: &str,
        interval_seconds: i64,
    ) -> Result<()> {
        {
            let mut guard = self.lock();
            let mut scratch = guard.clone();
            update_rule_group_interval(
                &mut scratch,
                org_id,
                namespace_uid,
                rule_group,
                interval_seconds,
            )?;
            *guard = scratch;
        }
        debug!(
            org_id,
            namespace_uid, rule_group, interval_seconds, "updated rule group interval"
        );
        self.notify(&StoreOp::UpdateRuleGroupInterval {
            org_id,
            namespace_uid: namespace_uid.to_string(),
            rule_group: rule_group.to_string(),
            interval_seconds,
        });
        Ok(())
    }

    async fn bump_namespace_versions(
        &self,
        org_id: i64,
        namespace_uid: &str,
    ) -> Result<Vec<AlertRuleKeyWithVersion>> {
        let bumped = {
            let mut guard = self.lock();
            bump_namespace_versions(&mut guard, org_id, namespace_uid)
        };
        debug!(org_id, namespace_uid, count = bumped.len(), "bumped namespace versions");
        self.notify(&StoreOp::BumpNamespaceVersions {
            org_id,
            namespace_uid: namespace_uid.to_string(),
        });
        Ok(bumped)
    }

    async fn in_transaction(&self, f: TxFn) -> Result<()> {
        let ops = {
            let mut guard = self.lock();
            let mut tx = MemTx {
                state: guard.clone(),
                ops: Vec::new(),
            };
            // An Err here drops the scratch state: zero visible effect.
            f(&mut tx)?;
            *guard = tx.state;
            tx.ops
        };
        debug!(ops = ops.len(), "committed rule store transaction");
        for op in &ops {
            self.notify(op);
        }
        self.notify(&StoreOp::Transaction);
        Ok(())
    }

    async fn visible_namespaces(
        &self,
        org_id: i64,
        visibility: &ActorVisibility,
    ) -> Result<HashMap<String, Namespace>> {
        let namespaces = visible_namespaces(&self.lock(), org_id, visibility);
        self.notify(&StoreOp::VisibleNamespaces { org_id });
        Ok(namespaces)
    }

    async fn namespace_by_title(
        &self,
        title: &str,
        org_id: i64,
        visibility: &ActorVisibility,
    ) -> Result<Namespace> {
        let namespace = namespace_by_title(&self.lock(), title, org_id, visibility);
        self.notify(&StoreOp::NamespaceByTitle {
            org_id,
            title: title.to_string(),
        });
        namespace
    }

    async fn namespace_by_uid(
        &self,
        uid: &str,
        org_id: i64,
        visibility: &ActorVisibility,
    ) -> Result<Namespace> {
        let namespace = namespace_by_uid(&self.lock(), uid, org_id, visibility);
        self.notify(&StoreOp::NamespaceByUid {
            org_id,
            uid: uid.to_string(),
        });
        namespace
    }
}
