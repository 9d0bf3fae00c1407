//! The [`AlertRule`] entity and its derived keys.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single evaluation rule owned by exactly one organization.
///
/// Rules are grouped for scheduling by [`group_key`](AlertRule::group_key):
/// every rule sharing a group key is evaluated together, on one shared
/// `interval_seconds` cadence. The store enforces that interval agreement;
/// the entity itself is pure data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Tenant scope. All store operations are bound to one org.
    pub org_id: i64,
    /// Globally unique within the org.
    pub uid: String,
    /// Human-readable rule title.
    pub title: String,
    /// Opaque rule condition (query/expression payload). Irrelevant to
    /// grouping and scheduling; carried verbatim by the store.
    pub condition: String,
    /// UID of the owning namespace (folder).
    pub namespace_uid: String,
    /// Grouping name within the namespace.
    pub rule_group: String,
    /// Provenance link to a dashboard, populated together with `panel_id`
    /// or not at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_uid: Option<String>,
    /// Provenance link to a dashboard panel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panel_id: Option<i64>,
    /// Evaluation cadence shared by every rule in the group.
    pub interval_seconds: i64,
    /// Monotonically increasing change counter. Schedulers cache compiled
    /// rule state keyed by `(uid, version)`; any bump forces a recompile.
    pub version: i64,
    /// Timestamp of the last mutation.
    pub updated: DateTime<Utc>,
}

impl AlertRule {
    /// Unique identity of this rule: `(org_id, uid)`.
    pub fn key(&self) -> AlertRuleKey {
        AlertRuleKey {
            org_id: self.org_id,
            uid: self.uid.clone(),
        }
    }

    /// Identity of the evaluation group this rule belongs to.
    ///
    /// Two rules are in the same group iff their group keys are equal;
    /// rule content plays no part in grouping.
    pub fn group_key(&self) -> AlertRuleGroupKey {
        AlertRuleGroupKey {
            org_id: self.org_id,
            namespace_uid: self.namespace_uid.clone(),
            rule_group: self.rule_group.clone(),
        }
    }
}

/// Unique rule identity within the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertRuleKey {
    pub org_id: i64,
    pub uid: String,
}

impl fmt::Display for AlertRuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{orgID: {}, UID: {}}}", self.org_id, self.uid)
    }
}

/// Identity of an evaluation group: `(org, namespace, group name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertRuleGroupKey {
    pub org_id: i64,
    pub namespace_uid: String,
    pub rule_group: String,
}

impl fmt::Display for AlertRuleGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{orgID: {}, namespaceUID: {}, groupName: {}}}",
            self.org_id, self.namespace_uid, self.rule_group
        )
    }
}

/// A rule key paired with its post-bump version, returned by the
/// namespace-wide version fence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRuleKeyWithVersion {
    pub key: AlertRuleKey,
    pub version: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(org_id: i64, uid: &str, ns: &str, group: &str) -> AlertRule {
        AlertRule {
            org_id,
            uid: uid.to_string(),
            title: format!("rule {}", uid),
            condition: "A".to_string(),
            namespace_uid: ns.to_string(),
            rule_group: group.to_string(),
            dashboard_uid: None,
            panel_id: None,
            interval_seconds: 60,
            version: 1,
            updated: Utc::now(),
        }
    }

    #[test]
    fn key_derivation() {
        let r = rule(1, "a", "ns1", "g1");
        assert_eq!(
            r.key(),
            AlertRuleKey {
                org_id: 1,
                uid: "a".to_string()
            }
        );
    }

    #[test]
    fn group_key_ignores_content() {
        let mut a = rule(1, "a", "ns1", "g1");
        let mut b = rule(1, "b", "ns1", "g1");
        a.condition = "avg() > 5".to_string();
        b.condition = "max() < 2".to_string();
        b.interval_seconds = 120;
        assert_eq!(a.group_key(), b.group_key());
    }

    #[test]
    fn group_key_separates_orgs() {
        let a = rule(1, "a", "ns1", "g1");
        let b = rule(2, "a", "ns1", "g1");
        assert_ne!(a.group_key(), b.group_key());
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn group_key_separates_namespaces_and_groups() {
        let a = rule(1, "a", "ns1", "g1");
        assert_ne!(a.group_key(), rule(1, "b", "ns2", "g1").group_key());
        assert_ne!(a.group_key(), rule(1, "c", "ns1", "g2").group_key());
    }

    #[test]
    fn key_display() {
        let r = rule(3, "abc", "ns1", "g1");
        assert_eq!(r.key().to_string(), "{orgID: 3, UID: abc}");
    }
}
