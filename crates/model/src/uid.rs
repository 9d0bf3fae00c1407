//! Short random UID generation for auto-provisioned records.

use uuid::Uuid;

/// Length of generated short UIDs.
pub const SHORT_UID_LEN: usize = 14;

/// Generate a short random lowercase-hex UID.
///
/// Used for namespace titles provisioned on the fly when a rule references
/// a folder the directory has never seen. Collision resistance at 14 hex
/// chars (56 bits) is ample for per-org folder counts.
pub fn short_uid() -> String {
    let mut s = Uuid::new_v4().simple().to_string();
    s.truncate(SHORT_UID_LEN);
    s
}
