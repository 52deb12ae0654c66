//! Core types for declarative resource reconciliation

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Desired end state for a resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ensure::Present => write!(f, "present"),
            Ensure::Absent => write!(f, "absent"),
        }
    }
}

/// Observed or desired state of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    /// Resource exists
    Present { details: Option<String> },
    /// Resource does not exist
    Absent,
}

impl ResourceState {
    /// Present with no extra detail
    pub fn present() -> Self {
        Self::Present { details: None }
    }

    /// Check if state represents presence
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    /// Check if state represents absence
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Whether this state satisfies the desired end state.
    pub fn satisfies(&self, ensure: Ensure) -> bool {
        match ensure {
            Ensure::Present => self.is_present(),
            Ensure::Absent => self.is_absent(),
        }
    }
}

impl From<Ensure> for ResourceState {
    fn from(ensure: Ensure) -> Self {
        match ensure {
            Ensure::Present => Self::present(),
            Ensure::Absent => Self::Absent,
        }
    }
}

/// What happened when a resource attempted a single mutation.
///
/// Hard faults (missing tool, I/O) are returned as `Err` by the resource
/// instead and abort the reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The command ran and reported success
    Applied,
    /// The command ran and exited non-zero
    CommandFailed { message: String },
    /// A precondition was unmet; no command was issued
    Refused { reason: String },
}

/// Verdict of one reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
    /// Dry run: the change would have been attempted
    Pending,
}

impl Outcome {
    /// Tri-state rendering: `Some(true)`, `Some(false)` or `None` when pending.
    pub fn as_option(&self) -> Option<bool> {
        match self {
            Outcome::Succeeded => Some(true),
            Outcome::Failed => Some(false),
            Outcome::Pending => None,
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_option().serialize(serializer)
    }
}

/// Result of one present/absent/update call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileResult {
    /// Name of the target resource
    pub name: String,
    /// Resource type (e.g. "postgres_database")
    pub resource_type: String,
    /// Whether the observed state changed
    pub changed: bool,
    /// Succeeded, failed, or pending (dry run)
    #[serde(rename = "result")]
    pub outcome: Outcome,
    /// Human-readable explanation
    pub comment: String,
}

impl ReconcileResult {
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Succeeded
    }

    pub fn is_failure(&self) -> bool {
        self.outcome == Outcome::Failed
    }

    pub fn is_pending(&self) -> bool {
        self.outcome == Outcome::Pending
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub changed: usize,
    pub unchanged: usize,
    pub pending: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ExecuteSummary {
    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.changed + self.unchanged + self.pending + self.failed + self.skipped
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ReconcileResult) {
        match result.outcome {
            Outcome::Failed => self.failed += 1,
            Outcome::Pending => self.pending += 1,
            Outcome::Succeeded if result.changed => self.changed += 1,
            Outcome::Succeeded => self.unchanged += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just report what would happen
    pub dry_run: bool,
    /// Number of parallel jobs for read-only probing
    pub jobs: usize,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
        }
    }
}
