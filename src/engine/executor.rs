//! Plan execution with terminal progress and confirmation

use anyhow::Result;
use declarative::{
    ExecuteOptions, ExecuteReport, ExecutionPlan, ProgressCallback,
    ReconcileResult, ResourceDiff, compute_diffs,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;

use super::differ::display_diff;
use crate::ui;

/// Options for `apply`
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Report what would happen without mutating anything
    pub dry_run: bool,
    /// Worker threads for the read-only pre-probes
    pub jobs: usize,
    /// Skip the confirmation prompt
    pub yes: bool,
    /// Machine-readable output only
    pub json: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            yes: false,
            json: false,
        }
    }
}

/// Progress bar that prints each result above itself as it completes
pub struct BarProgress {
    bar: ProgressBar,
    quiet: bool,
}

impl BarProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: ProgressBar::hidden(),
            quiet,
        }
    }
}

impl ProgressCallback for BarProgress {
    fn on_batch_start(&mut self, count: usize) {
        if self.quiet {
            return;
        }
        let bar = ProgressBar::new(count as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        self.bar = bar;
    }

    fn on_resource_start(&mut self, _id: &str, description: &str) {
        self.bar.set_message(ui::truncate(description, 40));
    }

    fn on_resource_complete(&mut self, _id: &str, result: &ReconcileResult) {
        if !self.quiet {
            self.bar.suspend(|| ui::print_result(result));
        }
        self.bar.inc(1);
    }

    fn on_batch_complete(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Probe every entry and show what `apply` would change
pub fn status(plan: ExecutionPlan, jobs: usize, json: bool) -> Result<Vec<ResourceDiff>> {
    let plan = plan.ordered();
    let diffs = compute_diffs(plan.entries(), jobs)?;
    if json {
        ui::print_json(&diffs)?;
    } else {
        display_diff(&diffs);
    }
    Ok(diffs)
}

/// Reconcile a plan, printing results and a summary
pub fn apply(plan: ExecutionPlan, opts: &ApplyOptions) -> Result<ExecuteReport> {
    let plan = plan.ordered();
    debug!("Applying plan with {} entries", plan.len());

    if !opts.json {
        let diffs = compute_diffs(plan.entries(), opts.jobs)?;
        display_diff(&diffs);
        if diffs.is_empty() {
            return Ok(ExecuteReport {
                summary: declarative::ExecuteSummary {
                    unchanged: plan.len(),
                    ..Default::default()
                },
                results: Vec::new(),
            });
        }
    }

    let exec = ExecuteOptions {
        dry_run: opts.dry_run,
        jobs: opts.jobs,
    };
    let mut progress = BarProgress::new(opts.json);
    let mut confirm = ui::Prompt {
        // No terminal to ask on when emitting JSON.
        assume_yes: opts.yes || opts.json,
    };

    let report = declarative::execute(plan, exec, &mut progress, &mut confirm)?;

    if opts.json {
        ui::print_json(&JsonReport {
            summary: &report.summary,
            results: &report.results,
        })?;
    } else {
        if report.summary.skipped > 0 {
            ui::warn("Aborted, nothing applied");
        }
        ui::print_summary(&report.summary, opts.dry_run);
    }
    Ok(report)
}

#[derive(serde::Serialize)]
struct JsonReport<'a> {
    summary: &'a declarative::ExecuteSummary,
    results: &'a [ReconcileResult],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{PostgresDatabase, PostgresRole};
    use declarative::{AutoDecline, Ensure, Outcome};
    use pgkit::testing::FakeServer;
    use pgkit::{DatabaseSpec, RoleSpec};

    fn plan(server: &FakeServer) -> ExecutionPlan {
        let mut plan = ExecutionPlan::new();
        plan.push(
            Box::new(PostgresDatabase::new(
                server.client(),
                DatabaseSpec::new("app").with_owner("app"),
            )),
            Ensure::Present,
        );
        plan.push(
            Box::new(PostgresRole::new(server.client(), RoleSpec::new("app"))),
            Ensure::Present,
        );
        plan
    }

    #[test]
    fn test_apply_creates_role_before_database() {
        let server = FakeServer::new();
        let opts = ApplyOptions {
            json: true,
            ..Default::default()
        };
        let report = apply(plan(&server), &opts).unwrap();

        assert_eq!(report.summary.changed, 2);
        assert_eq!(report.results[0].resource_type, "postgres_role");
        assert_eq!(report.results[1].resource_type, "postgres_database");
        assert!(server.has_role("app"));
        assert!(server.has_database("app"));
    }

    #[test]
    fn test_apply_dry_run_only_pends() {
        let server = FakeServer::new();
        let opts = ApplyOptions {
            dry_run: true,
            json: true,
            ..Default::default()
        };
        let report = apply(plan(&server), &opts).unwrap();

        assert_eq!(report.summary.pending, 2);
        assert!(report.results.iter().all(|r| r.outcome == Outcome::Pending));
        assert!(!server.has_database("app"));
    }

    #[test]
    fn test_declined_confirmation_skips_everything() {
        let server = FakeServer::new();
        let exec = ExecuteOptions::default();
        let report = declarative::execute(
            plan(&server),
            exec,
            &mut BarProgress::new(true),
            &mut AutoDecline,
        )
        .unwrap();
        assert_eq!(report.summary.skipped, 2);
        assert!(!server.has_role("app"));
    }

    #[test]
    fn test_status_reports_missing() {
        let server = FakeServer::new().with_role("app", false, false);
        let diffs = status(plan(&server), 1, true).unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].resource_id, "app");
        assert_eq!(diffs[0].resource_type, "postgres_database");
    }
}
