//! Execution engine - reconciles a plan entry by entry

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::diff::compute_diffs;
use crate::engine;
use crate::planner::ExecutionPlan;
use crate::types::{ExecuteOptions, ExecuteSummary, ReconcileResult};
use anyhow::Result;
use std::collections::HashSet;

/// Everything an execution produced
#[derive(Debug, Clone, Default)]
pub struct ExecuteReport {
    pub summary: ExecuteSummary,
    /// One result per reconciled entry, in execution order
    pub results: Vec<ReconcileResult>,
}

/// Execute a plan with the given options and callbacks
///
/// Entries already in their desired state are counted as unchanged
/// without being touched. The rest are reconciled one at a time in plan
/// order; each reconciliation re-probes before and after its mutation.
/// A hard fault (failed probe, missing tool) aborts the run.
pub fn execute<P, C>(
    plan: ExecutionPlan,
    opts: ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let plan = plan.ordered();
    let diffs = compute_diffs(plan.entries(), opts.jobs)?;

    let mut report = ExecuteReport::default();
    report.summary.unchanged = plan.len() - diffs.len();

    if diffs.is_empty() {
        return Ok(report);
    }

    // Confirm before proceeding (unless dry_run)
    if !opts.dry_run && !confirm.confirm("Apply changes?")? {
        report.summary.skipped = diffs.len();
        return Ok(report);
    }

    let pending: HashSet<(String, String)> = diffs
        .iter()
        .map(|d| (d.resource_type.clone(), d.resource_id.clone()))
        .collect();

    let ctx = ApplyContext::new(opts.dry_run);
    progress.on_batch_start(diffs.len());

    for entry in plan.into_entries() {
        let resource = entry.resource.as_ref();
        let key = (resource.resource_type().to_string(), resource.id());
        if !pending.contains(&key) {
            continue;
        }

        progress.on_resource_start(&key.1, &resource.description());
        let result = engine::reconcile(resource, entry.ensure, &ctx)?;
        progress.on_resource_complete(&key.1, &result);

        report.summary.add_result(&result);
        report.results.push(result);
    }

    progress.on_batch_complete();
    Ok(report)
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple(plan: ExecutionPlan, opts: ExecuteOptions) -> Result<ExecuteReport> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, &mut NoProgress, &mut AutoConfirm)
}
