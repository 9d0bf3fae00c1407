//! Namespace (folder) records and actor visibility scoping.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A named container grouping rules within one organization.
///
/// Namespaces exist independently of rules: a namespace may hold zero rules,
/// and the store auto-provisions one the first time a rule references an
/// unknown `namespace_uid`. The rule store never deletes namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    /// Store-generated internal identity.
    pub id: i64,
    pub org_id: i64,
    pub uid: String,
    pub title: String,
}

/// Opaque visibility capability resolved by an external authorization
/// collaborator.
///
/// The store only filters by it; it never interprets permission semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorVisibility {
    /// The actor can see every namespace in the org (e.g. an admin, or a
    /// backend service acting on its own behalf).
    All,
    /// The actor can see exactly the listed namespace UIDs.
    Only(HashSet<String>),
}

impl ActorVisibility {
    /// Build a restricted capability from an iterator of visible UIDs.
    pub fn only<I, S>(uids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ActorVisibility::Only(uids.into_iter().map(Into::into).collect())
    }

    /// Whether the actor may see the given namespace UID.
    pub fn can_see(&self, namespace_uid: &str) -> bool {
        match self {
            ActorVisibility::All => true,
            ActorVisibility::Only(uids) => uids.contains(namespace_uid),
        }
    }
}
