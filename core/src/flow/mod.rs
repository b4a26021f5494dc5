//! Participant and creator lifecycles built on the program instructions.

pub mod commitment;
pub mod graduation;

pub use commitment::{Allocation, CommitmentFlow, CommitmentState};
pub use graduation::{CreatorFlow, LaunchTerms};

use serde::Serialize;

use crate::error::Result;

/// Result of an idempotent setup call. Failure is the `Err` arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SetupOutcome {
    Created,
    AlreadyExists,
}

impl SetupOutcome {
    /// Fold "already exists" rejections into [`SetupOutcome::AlreadyExists`].
    pub fn from_result<T>(result: Result<T>) -> Result<Self> {
        match result {
            Ok(_) => Ok(SetupOutcome::Created),
            Err(e) if e.is_benign() => Ok(SetupOutcome::AlreadyExists),
            Err(e) => Err(e),
        }
    }

    /// Combined outcome of a setup made of several steps.
    pub fn merge(self, other: SetupOutcome) -> SetupOutcome {
        if self == SetupOutcome::Created || other == SetupOutcome::Created {
            SetupOutcome::Created
        } else {
            SetupOutcome::AlreadyExists
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use vestige_program::VestigeError;

    #[test]
    fn test_from_result_tri_state() {
        assert_eq!(SetupOutcome::from_result(Ok(())).unwrap(), SetupOutcome::Created);
        assert_eq!(
            SetupOutcome::from_result::<()>(Err(ProtocolError::Program(
                VestigeError::PermissionAlreadyExists
            )))
            .unwrap(),
            SetupOutcome::AlreadyExists
        );
        assert!(
            SetupOutcome::from_result::<()>(Err(ProtocolError::Program(
                VestigeError::SaleWindowClosed
            )))
            .is_err()
        );
    }

    #[test]
    fn test_merge() {
        use SetupOutcome::*;
        assert_eq!(Created.merge(AlreadyExists), Created);
        assert_eq!(AlreadyExists.merge(Created), Created);
        assert_eq!(AlreadyExists.merge(AlreadyExists), AlreadyExists);
    }
}
