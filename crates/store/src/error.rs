//! Error types for rule-store operations.

use rulevault_model::{AlertRuleGroupKey, AlertRuleKey};
use thiserror::Error;

/// Errors produced by [`RuleStore`](crate::RuleStore) operations.
///
/// Single-rule lookups deliberately do NOT use [`StoreError::RuleNotFound`]:
/// a missing rule is a soft miss (`Ok(None)`), which schedulers read as
/// "rule not currently scheduled". Namespace and group lookups, and update
/// commands addressing a specific rule, are strict and fail loudly.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No visible namespace matched the given title or UID.
    #[error("namespace not found in org {org_id}: {reference}")]
    NamespaceNotFound { org_id: i64, reference: String },

    /// An interval query addressed a group with no member rules.
    #[error("rule group not found: {group_key}")]
    GroupNotFound { group_key: AlertRuleGroupKey },

    /// A bulk write would leave members of one group with differing
    /// evaluation intervals. The whole batch is rejected with zero effect.
    #[error("conflicting intervals {intervals:?} for rule group {group_key}")]
    GroupIntervalConflict {
        group_key: AlertRuleGroupKey,
        intervals: Vec<i64>,
    },

    /// An update command addressed a rule that does not exist.
    #[error("rule not found: {key}")]
    RuleNotFound { key: AlertRuleKey },

    /// An insert collided with an existing rule UID.
    #[error("rule already exists: {key}")]
    RuleAlreadyExists { key: AlertRuleKey },

    /// A rule payload violated a structural invariant (e.g. a panel ID
    /// without a dashboard UID).
    #[error("invalid rule {uid}: {reason}")]
    InvalidRule { uid: String, reason: String },

    /// A group interval rewrite specified a non-positive cadence.
    #[error("invalid interval {interval_seconds}s for rule group {group_key}")]
    InvalidInterval {
        group_key: AlertRuleGroupKey,
        interval_seconds: i64,
    },

    /// The operation was aborted before taking effect. Distinct from
    /// rejection so callers can tell "you cancelled" from "we refused".
    #[error("operation cancelled")]
    Cancelled,

    /// Underlying persistence failure, surfaced verbatim. The store never
    /// retries internally; retry policy belongs to the caller.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
