//! Diff computation for planned resources

use crate::planner::PlanEntry;
use crate::types::{Ensure, ResourceState};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A diff between current and desired state of a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// Current state
    pub current: ResourceState,
    /// Desired state
    pub desired: ResourceState,
}

impl ResourceDiff {
    /// Probe a plan entry, returning None if it already satisfies its ensure
    pub fn from_entry(entry: &PlanEntry) -> Result<Option<Self>> {
        let resource = entry.resource.as_ref();
        let current = resource.current_state().with_context(|| {
            format!(
                "Failed to probe {} {}",
                resource.resource_type(),
                resource.id()
            )
        })?;

        if current.satisfies(entry.ensure) {
            return Ok(None);
        }

        Ok(Some(Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            current,
            desired: ResourceState::from(entry.ensure),
        }))
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        self.current.is_absent() && self.desired.is_present()
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        self.current.is_present() && self.desired.is_absent()
    }

    /// The end state the diff moves towards
    pub fn ensure(&self) -> Ensure {
        if self.desired.is_present() {
            Ensure::Present
        } else {
            Ensure::Absent
        }
    }
}

/// Compute diffs for a list of plan entries
///
/// Probes are read-only, so they run on a pool of `jobs` threads.
/// Results keep the order of `entries`. The first failed probe aborts.
pub fn compute_diffs(entries: &[PlanEntry], jobs: usize) -> Result<Vec<ResourceDiff>> {
    if jobs <= 1 || entries.len() <= 1 {
        let mut diffs = Vec::new();
        for entry in entries {
            if let Some(diff) = ResourceDiff::from_entry(entry)? {
                diffs.push(diff);
            }
        }
        return Ok(diffs);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?;

    let probed: Vec<Result<Option<ResourceDiff>>> =
        pool.install(|| entries.par_iter().map(ResourceDiff::from_entry).collect());

    let mut diffs = Vec::new();
    for diff in probed {
        if let Some(diff) = diff? {
            diffs.push(diff);
        }
    }
    Ok(diffs)
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to create
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(diffs: &[ResourceDiff]) -> BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<String, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}
