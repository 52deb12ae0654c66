//! Command implementations
//!
//! Each command returns the process exit code: non-zero when any result
//! failed. Hard faults (missing tool, failed probe) come back as errors.

pub mod apply;
pub mod db;
pub mod jail;
pub mod role;
pub mod version;

use anyhow::{Context as _, Result};
use declarative::ReconcileResult;
use jailkit::Poudriere;
use pgkit::{ExplicitParams, ResourceKind, TabularRecord};
use std::process::ExitCode;

use crate::Context;
use crate::ui;

/// PostgreSQL client for the resolved connection parameters
pub fn pg_client(ctx: &Context, explicit: &ExplicitParams) -> Result<pgkit::Client> {
    let params = ctx.settings.connection(explicit);
    log::debug!("Connecting with {params:?}");
    pgkit::Client::new(params).context("PostgreSQL client tools are not available")
}

/// Poudriere client for the configured paths
pub fn poudriere(ctx: &Context) -> Result<Poudriere> {
    Poudriere::new(ctx.settings.poudriere_paths()).context("poudriere is not available")
}

/// Print one result the way the user asked for and map it to an exit code
pub fn report(ctx: &Context, result: &ReconcileResult) -> Result<ExitCode> {
    if ctx.json {
        ui::print_json(result)?;
    } else if !ctx.quiet || result.is_failure() {
        ui::print_result(result);
    }
    Ok(exit_code(!result.is_failure()))
}

/// Print listing rows by name, or as JSON objects
pub fn print_records(ctx: &Context, kind: ResourceKind, records: &[TabularRecord]) -> Result<()> {
    if ctx.json {
        let rows: Vec<_> = records
            .iter()
            .map(|r| {
                r.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<std::collections::BTreeMap<_, _>>()
            })
            .collect();
        return ui::print_json(&rows);
    }
    for record in records {
        println!("{}", record.get(kind.identity_field()).unwrap_or_default());
    }
    Ok(())
}

pub fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
pub(crate) fn test_context() -> Context {
    Context {
        quiet: true,
        json: false,
        settings: crate::config::Settings::default(),
    }
}
