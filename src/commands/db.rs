//! `converge db`

use anyhow::Result;
use declarative::{ApplyContext, absent, present};
use pgkit::{Client, DatabaseSpec, ResourceKind};
use std::process::ExitCode;

use super::{exit_code, pg_client, print_records, report};
use crate::Context;
use crate::cli::{DbCommand, DbPresentArgs};
use crate::resource::PostgresDatabase;

pub fn run(ctx: &Context, cmd: DbCommand) -> Result<ExitCode> {
    match cmd {
        DbCommand::Present(args) => {
            let client = pg_client(ctx, &args.conn.explicit())?;
            ensure_present(ctx, &client, &args)
        }
        DbCommand::Absent {
            name,
            force,
            dry_run,
            conn,
        } => {
            let client = pg_client(ctx, &conn.explicit())?;
            ensure_absent(ctx, &client, &name, force, dry_run)
        }
        DbCommand::List(conn) => {
            let client = pg_client(ctx, &conn.explicit())?;
            list(ctx, &client)
        }
        DbCommand::Exists { name, conn } => {
            let client = pg_client(ctx, &conn.explicit())?;
            exists(ctx, &client, &name)
        }
    }
}

fn spec_from(args: &DbPresentArgs) -> DatabaseSpec {
    DatabaseSpec {
        name: args.name.clone(),
        owner: args.owner.clone(),
        encoding: args.encoding.clone(),
        template: args.template.clone(),
        tablespace: args.tablespace.clone(),
        locale: args.locale.clone(),
        lc_collate: args.lc_collate.clone(),
        lc_ctype: args.lc_ctype.clone(),
    }
}

fn ensure_present(ctx: &Context, client: &Client, args: &DbPresentArgs) -> Result<ExitCode> {
    let database = PostgresDatabase::new(client.clone(), spec_from(args));
    let result = present(&database, &ApplyContext::new(args.dry_run))?;
    report(ctx, &result)
}

fn ensure_absent(
    ctx: &Context,
    client: &Client,
    name: &str,
    force: bool,
    dry_run: bool,
) -> Result<ExitCode> {
    let database = PostgresDatabase::new(client.clone(), DatabaseSpec::new(name)).with_force(force);
    let result = absent(&database, &ApplyContext::new(dry_run))?;
    report(ctx, &result)
}

fn list(ctx: &Context, client: &Client) -> Result<ExitCode> {
    let records = client.list_databases()?;
    print_records(ctx, ResourceKind::Database, &records)?;
    Ok(ExitCode::SUCCESS)
}

fn exists(ctx: &Context, client: &Client, name: &str) -> Result<ExitCode> {
    let found = client.database_exists(name)?;
    if ctx.json {
        crate::ui::print_json(&serde_json::json!({ "name": name, "exists": found }))?;
    } else if !ctx.quiet {
        println!("{}", if found { "yes" } else { "no" });
    }
    Ok(exit_code(found))
}
