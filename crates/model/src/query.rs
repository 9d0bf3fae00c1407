//! Query filters and bulk-write command types.

use serde::{Deserialize, Serialize};

use crate::rule::AlertRule;

/// Conjunctive filter for listing rules within one organization.
///
/// Every populated field must match for a rule to be included; absent fields
/// match all rules. The panel filter is only applied when a dashboard filter
/// is also set and the panel ID is positive — a panel filter on its own is
/// meaningless (panel IDs are only unique within a dashboard) and is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRulesFilter {
    pub dashboard_uid: Option<String>,
    pub panel_id: Option<i64>,
    pub namespace_uids: Vec<String>,
    pub rule_group: Option<String>,
}

impl ListRulesFilter {
    /// Whether the rule satisfies every populated filter term.
    pub fn matches(&self, rule: &AlertRule) -> bool {
        if let Some(dashboard_uid) = &self.dashboard_uid {
            if rule.dashboard_uid.as_deref() != Some(dashboard_uid.as_str()) {
                return false;
            }
            // Panel filter is gated on the dashboard filter; zero/negative
            // panel IDs disable the check.
            if let Some(panel_id) = self.panel_id {
                if panel_id > 0 && rule.panel_id != Some(panel_id) {
                    return false;
                }
            }
        }

        if !self.namespace_uids.is_empty()
            && !self.namespace_uids.iter().any(|uid| *uid == rule.namespace_uid)
        {
            return false;
        }

        if let Some(group) = &self.rule_group {
            if *group != rule.rule_group {
                return false;
            }
        }

        true
    }
}

/// One bulk-update command: replaces the content of the rule addressed by
/// `uid` with `new`.
///
/// Identity and bookkeeping fields of `new` (`org_id`, `uid`, `version`,
/// `updated`) are store-managed and overwritten on apply; callers only
/// control content and grouping fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRule {
    pub uid: String,
    pub new: AlertRule,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn rule(uid: &str, ns: &str, group: &str, dashboard: Option<&str>, panel: Option<i64>) -> AlertRule {
        AlertRule {
            org_id: 1,
            uid: uid.to_string(),
            title: uid.to_string(),
            condition: "A".to_string(),
            namespace_uid: ns.to_string(),
            rule_group: group.to_string(),
            dashboard_uid: dashboard.map(String::from),
            panel_id: panel,
            interval_seconds: 60,
            version: 1,
            updated: Utc::now(),
        }
    }

    #[test]
    fn empty_filter_matches_all() {
        let f = ListRulesFilter::default();
        assert!(f.matches(&rule("a", "ns1", "g1", None, None)));
        assert!(f.matches(&rule("b", "ns2", "g2", Some("d1"), Some(4))));
    }

    #[test]
    fn dashboard_filter() {
        let f = ListRulesFilter {
            dashboard_uid: Some("d1".to_string()),
            ..Default::default()
        };
        assert!(f.matches(&rule("a", "ns1", "g1", Some("d1"), Some(1))));
        assert!(!f.matches(&rule("b", "ns1", "g1", Some("d2"), Some(1))));
        assert!(!f.matches(&rule("c", "ns1", "g1", None, None)));
    }

    #[test]
    fn panel_filter_requires_dashboard() {
        // A panel filter without a dashboard filter is ignored entirely.
        let f = ListRulesFilter {
            panel_id: Some(4),
            ..Default::default()
        };
        assert!(f.matches(&rule("a", "ns1", "g1", Some("d1"), Some(9))));
        assert!(f.matches(&rule("b", "ns1", "g1", None, None)));
    }

    #[test]
    fn panel_filter_with_dashboard() {
        let f = ListRulesFilter {
            dashboard_uid: Some("d1".to_string()),
            panel_id: Some(4),
            ..Default::default()
        };
        assert!(f.matches(&rule("a", "ns1", "g1", Some("d1"), Some(4))));
        assert!(!f.matches(&rule("b", "ns1", "g1", Some("d1"), Some(5))));
        assert!(!f.matches(&rule("c", "ns1", "g1", Some("d1"), None)));
    }

    #[test]
    fn zero_panel_id_disables_panel_check() {
        let f = ListRulesFilter {
            dashboard_uid: Some("d1".to_string()),
            panel_id: Some(0),
            ..Default::default()
        };
        assert!(f.matches(&rule("a", "ns1", "g1", Some("d1"), Some(7))));

        let f = ListRulesFilter {
            dashboard_uid: Some("d1".to_string()),
            panel_id: Some(-3),
            ..Default::default()
        };
        assert!(f.matches(&rule("a", "ns1", "g1", Some("d1"), None)));
    }

    #[test]
    fn namespace_filter_is_a_set() {
        let f = ListRulesFilter {
            namespace_uids: vec!["ns1".to_string(), "ns3".to_string()],
            ..Default::default()
        };
        assert!(f.matches(&rule("a", "ns1", "g1", None, None)));
        assert!(f.matches(&rule("b", "ns3", "g1", None, None)));
        assert!(!f.matches(&rule("c", "ns2", "g1", None, None)));
    }

    #[test]
    fn group_filter() {
        let f = ListRulesFilter {
            rule_group: Some("g1".to_string()),
            ..Default::default()
        };
        assert!(f.matches(&rule("a", "ns1", "g1", None, None)));
        assert!(!f.matches(&rule("b", "ns1", "g2", None, None)));
    }

    #[test]
    fn conjunction_of_terms() {
        let f = ListRulesFilter {
            dashboard_uid: Some("d1".to_string()),
            panel_id: Some(4),
            namespace_uids: vec!["ns1".to_string()],
            rule_group: Some("g1".to_string()),
        };
        assert!(f.matches(&rule("a", "ns1", "g1", Some("d1"), Some(4))));
        // Any single failing term excludes the rule.
        assert!(!f.matches(&rule("b", "ns2", "g1", Some("d1"), Some(4))));
        assert!(!f.matches(&rule("c", "ns1", "g2", Some("d1"), Some(4))));
        assert!(!f.matches(&rule("d", "ns1", "g1", Some("d2"), Some(4))));
    }
}
