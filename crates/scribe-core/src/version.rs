//! Optimistic-concurrency version guard.
//!
//! The provider enforces optimistic concurrency itself; the guard's job is
//! to translate a version mismatch into [`MutationError::VersionConflict`]
//! with both versions attached. There is no CAS loop and no automatic
//! retry or merge here: conflict resolution belongs to the caller, who can
//! re-fetch and resubmit.

use crate::error::{MutationError, Result};

/// Compare the version an update was based on against the provider's
/// current version.
///
/// # Errors
/// Returns `MutationError::VersionConflict` carrying both versions when
/// they differ.
pub fn check_version(expected: i64, actual: i64) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(MutationError::VersionConflict { expected, actual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_matching_versions_pass() {
        assert!(check_version(4, 4).is_ok());
    }

    #[test]
    fn test_stale_version_carries_both_numbers() {
        let err = check_version(3, 4).unwrap_err();
        assert_eq!(
            err,
            MutationError::VersionConflict {
                expected: 3,
                actual: 4
            }
        );
    }
}
