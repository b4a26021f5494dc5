use serde::{Deserialize, Serialize};

/// Which quantity the per-participant bounds apply to.
///
/// The minimum always applies to the amount of the commit being made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundCheck {
    /// The maximum caps the participant's total after the commit.
    #[default]
    RunningTotal,
    /// The maximum caps each commit on its own; top-ups may exceed it in sum.
    Incremental,
}

/// When a creator may graduate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraduationPolicy {
    /// After the window ends, or earlier once the target is reached.
    #[default]
    TargetOrExpiry,
    /// Only after the window ends.
    ExpiryOnly,
}

/// Deployment-time rules of the program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramPolicy {
    pub bound_check: BoundCheck,
    pub graduation: GraduationPolicy,
}

impl GraduationPolicy {
    pub fn allows(&self, now: i64, end_time: i64, total_committed: u64, target: u64) -> bool {
        if now >= end_time {
            return true;
        }
        match self {
            GraduationPolicy::TargetOrExpiry => total_committed >= target,
            GraduationPolicy::ExpiryOnly => false,
        }
    }
}
