use serde::{Deserialize, Serialize};

/// Status of a flow, a command, or an overall run.
///
/// Valid transitions: `Pending` -> `Running` -> one of `Passed`/`Failed`/
/// `Skipped`. No reversions or arbitrary jumps between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Passed | Status::Failed | Status::Skipped)
    }

    /// Aggregates a collection of statuses per §3: any `Failed` makes the
    /// whole thing `Failed`; else any non-terminal status makes it
    /// `Running`; else `Passed` (an all-`Skipped` set is `Passed`, not
    /// `Skipped` -- there is no "all skipped" outcome at the aggregate
    /// level).
    pub fn aggregate(statuses: impl IntoIterator<Item = Status>) -> Status {
        let mut any_failed = false;
        let mut any_non_terminal = false;
        for s in statuses {
            match s {
                Status::Failed => any_failed = true,
                Status::Pending | Status::Running => any_non_terminal = true,
                Status::Passed | Status::Skipped => {}
            }
        }
        if any_failed {
            Status::Failed
        } else if any_non_terminal {
            Status::Running
        } else {
            Status::Passed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_failed_wins() {
        assert_eq!(Status::aggregate([Status::Passed, Status::Failed, Status::Running]), Status::Failed);
    }

    #[test]
    fn non_terminal_without_failure_is_running() {
        assert_eq!(Status::aggregate([Status::Passed, Status::Pending]), Status::Running);
    }

    #[test]
    fn all_skipped_is_passed() {
        assert_eq!(Status::aggregate([Status::Skipped, Status::Skipped]), Status::Passed);
    }

    #[test]
    fn empty_is_passed() {
        assert_eq!(Status::aggregate([]), Status::Passed);
    }
}
