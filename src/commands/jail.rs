//! `converge jail`

use anyhow::Result;
use declarative::{ApplyContext, absent, present};
use jailkit::{JailSpec, Poudriere};
use std::path::Path;
use std::process::ExitCode;

use super::{poudriere, report};
use crate::Context;
use crate::cli::JailCommand;
use crate::resource::PoudriereJail;
use crate::ui;

pub fn run(ctx: &Context, cmd: JailCommand) -> Result<ExitCode> {
    let client = poudriere(ctx)?;
    match cmd {
        JailCommand::Present {
            name,
            arch,
            version,
            dry_run,
        } => {
            let mut spec = JailSpec::new(name, arch);
            if let Some(version) = version {
                spec = spec.with_version(version);
            }
            let jail = PoudriereJail::new(client, spec);
            report(ctx, &present(&jail, &ApplyContext::new(dry_run))?)
        }
        JailCommand::Absent { name, dry_run } => {
            // Arch plays no part in removal.
            let jail = PoudriereJail::new(client, JailSpec::new(name, ""));
            report(ctx, &absent(&jail, &ApplyContext::new(dry_run))?)
        }
        JailCommand::List => print_lines(ctx, &client.list_jails()?),
        JailCommand::Ports { create } => ports(ctx, &client, create),
        JailCommand::Bulk {
            jail,
            pkg_file,
            keep,
        } => bulk(ctx, &client, &jail, &pkg_file, keep),
        JailCommand::Config => config(ctx, &client),
    }
}

fn print_lines(ctx: &Context, lines: &[String]) -> Result<ExitCode> {
    if ctx.json {
        ui::print_json(lines)?;
    } else {
        for line in lines {
            println!("{line}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn ports(ctx: &Context, client: &Poudriere, create: bool) -> Result<ExitCode> {
    if create {
        client.create_ports_tree()?;
        if !ctx.quiet && !ctx.json {
            ui::success("Ports tree created");
        }
    }
    print_lines(ctx, &client.list_ports()?)
}

fn bulk(
    ctx: &Context,
    client: &Poudriere,
    jail: &str,
    pkg_file: &Path,
    keep: bool,
) -> Result<ExitCode> {
    match client.bulk_build(jail, pkg_file, keep) {
        Ok(summary) => {
            if ctx.json {
                ui::print_json(&serde_json::json!({ "jail": jail, "summary": summary }))?;
            } else {
                ui::success(&summary);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(jailkit::Error::BulkBuildFailed { output }) => {
            if ctx.json {
                ui::print_json(&serde_json::json!({ "jail": jail, "error": output }))?;
            } else {
                ui::error(&format!("Bulk build in {jail} failed"));
                eprintln!("{output}");
            }
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

fn config(ctx: &Context, client: &Poudriere) -> Result<ExitCode> {
    let values = client.parse_config()?;
    if ctx.json {
        ui::print_json(&values)?;
    } else {
        ui::header(&client.paths().config_file.display().to_string());
        for (key, value) in &values {
            ui::kv(key, value);
        }
    }
    Ok(ExitCode::SUCCESS)
}
