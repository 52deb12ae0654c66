//! `converge apply` and `converge status`

use anyhow::Result;
use declarative::ExecutionPlan;
use pgkit::ExplicitParams;
use std::path::Path;
use std::process::ExitCode;

use super::{exit_code, pg_client, poudriere};
use crate::Context;
use crate::cli::{ApplyArgs, StatusArgs};
use crate::engine::{self, ApplyOptions};
use crate::manifest::{Backends, Manifest};
use crate::ui;

pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<ExitCode> {
    let plan = load_plan(ctx, &args.manifest, &args.conn.explicit(), args.target.as_deref())?;
    if plan.is_empty() {
        nothing_to_do(ctx);
        return Ok(ExitCode::SUCCESS);
    }
    let opts = ApplyOptions {
        dry_run: args.dry_run,
        jobs: args.jobs.max(1),
        yes: args.yes,
        json: ctx.json,
    };
    let report = engine::apply(plan, &opts)?;
    Ok(exit_code(report.summary.is_success()))
}

pub fn status(ctx: &Context, args: &StatusArgs) -> Result<ExitCode> {
    let plan = load_plan(ctx, &args.manifest, &args.conn.explicit(), args.target.as_deref())?;
    if plan.is_empty() {
        nothing_to_do(ctx);
        return Ok(ExitCode::SUCCESS);
    }
    engine::status(plan, args.jobs.max(1), ctx.json)?;
    Ok(ExitCode::SUCCESS)
}

fn nothing_to_do(ctx: &Context) {
    if !ctx.json && !ctx.quiet {
        ui::info("No resources selected");
    }
}

fn load_plan(
    ctx: &Context,
    path: &Path,
    explicit: &ExplicitParams,
    target: Option<&str>,
) -> Result<ExecutionPlan> {
    let manifest = Manifest::load(path)?;
    let backends = backends(ctx, &manifest, explicit)?;
    Ok(manifest.plan(&backends)?.filter_by_target(target))
}

/// Clients for the backends the manifest uses; none for the others.
fn backends(ctx: &Context, manifest: &Manifest, explicit: &ExplicitParams) -> Result<Backends> {
    let mut backends = Backends::default();
    if manifest.needs_postgres() {
        let explicit = explicit.clone().or(&manifest.connection);
        backends.postgres = Some(pg_client(ctx, &explicit)?);
    }
    if manifest.needs_poudriere() {
        backends.poudriere = Some(poudriere(ctx)?);
    }
    Ok(backends)
}
