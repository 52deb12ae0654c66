//! `converge version`

use anyhow::Result;
use std::collections::BTreeMap;
use std::process::ExitCode;

use super::{pg_client, poudriere};
use crate::Context;
use crate::cli::ConnArgs;
use crate::ui;

/// Print converge's version and whatever backend tools answer.
pub fn run(ctx: &Context, conn: &ConnArgs) -> Result<ExitCode> {
    let mut versions = BTreeMap::new();
    versions.insert("converge", Some(env!("CARGO_PKG_VERSION").to_string()));

    let psql = pg_client(ctx, &conn.explicit()).and_then(|c| c.version().map_err(Into::into));
    versions.insert("psql", tool_version("psql", psql));

    let poudriere = poudriere(ctx).and_then(|p| p.version().map_err(Into::into));
    versions.insert("poudriere", tool_version("poudriere", poudriere));

    if ctx.json {
        ui::print_json(&versions)?;
    } else {
        for (tool, version) in &versions {
            ui::kv(tool, version.as_deref().unwrap_or("not available"));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn tool_version(tool: &str, version: Result<String>) -> Option<String> {
    match version {
        Ok(version) => Some(version),
        Err(e) => {
            log::debug!("{tool} version unavailable: {e:#}");
            None
        }
    }
}
