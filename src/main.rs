mod cli;
mod commands;
mod config;
mod engine;
mod manifest;
mod resource;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::Settings;
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
    pub json: bool,
    pub settings: Settings,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            ui::error(&format!("{e:#}"));
            if let Some(advice) = advice(&e) {
                ui::dim(advice);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "converge", &mut io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let ctx = Context {
        quiet: cli.quiet,
        json: cli.json,
        settings: Settings::load(cli.config.as_deref(), cli.pillar.as_deref())?,
    };

    match cli.command {
        Command::Db(cmd) => commands::db::run(&ctx, cmd),
        Command::Role(cmd) => commands::role::run(&ctx, cmd),
        Command::Jail(cmd) => commands::jail::run(&ctx, cmd),
        Command::Apply(args) => commands::apply::apply(&ctx, &args),
        Command::Status(args) => commands::apply::status(&ctx, &args),
        Command::Version(conn) => commands::version::run(&ctx, &conn),
        Command::Completions { .. } => Ok(ExitCode::SUCCESS),
    }
}

/// Remedy for a backend error anywhere in the chain
fn advice(error: &anyhow::Error) -> Option<&'static str> {
    error.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<pgkit::Error>() {
            Some(e.category().advice())
        } else {
            cause
                .downcast_ref::<jailkit::Error>()
                .map(|e| e.category().advice())
        }
    })
}
