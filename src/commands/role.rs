//! `converge role`

use anyhow::Result;
use declarative::{ApplyContext, absent, present, update};
use pgkit::{Client, ResourceKind, RoleSpec};
use std::process::ExitCode;

use super::{pg_client, print_records, report};
use crate::Context;
use crate::cli::{RoleArgs, RoleCommand};
use crate::resource::PostgresRole;

pub fn run(ctx: &Context, cmd: RoleCommand) -> Result<ExitCode> {
    match cmd {
        RoleCommand::Present(args) => {
            let client = pg_client(ctx, &args.conn.explicit())?;
            let role = PostgresRole::new(client, spec_from(&args));
            report(ctx, &present(&role, &ApplyContext::new(args.dry_run))?)
        }
        RoleCommand::Update(args) => {
            let client = pg_client(ctx, &args.conn.explicit())?;
            ensure_updated(ctx, &client, &args)
        }
        RoleCommand::Absent {
            name,
            dry_run,
            conn,
        } => {
            let client = pg_client(ctx, &conn.explicit())?;
            let role = PostgresRole::new(client, RoleSpec::new(&name));
            report(ctx, &absent(&role, &ApplyContext::new(dry_run))?)
        }
        RoleCommand::List(conn) => {
            let client = pg_client(ctx, &conn.explicit())?;
            list(ctx, &client)
        }
    }
}

fn spec_from(args: &RoleArgs) -> RoleSpec {
    RoleSpec {
        name: args.name.clone(),
        createdb: args.createdb(),
        createrole: args.createrole(),
        superuser: args.superuser(),
        encrypted: args.encrypted,
        password: args.password.clone(),
    }
}

fn ensure_updated(ctx: &Context, client: &Client, args: &RoleArgs) -> Result<ExitCode> {
    let role = PostgresRole::new(client.clone(), spec_from(args));
    report(ctx, &update(&role, &ApplyContext::new(args.dry_run))?)
}

fn list(ctx: &Context, client: &Client) -> Result<ExitCode> {
    let records = client.list_roles()?;
    print_records(ctx, ResourceKind::Role, &records)?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ConnArgs;
    use crate::commands::test_context;
    use pgkit::testing::FakeServer;

    fn args(name: &str) -> RoleArgs {
        RoleArgs {
            name: name.into(),
            createdb: true,
            no_createdb: false,
            createrole: false,
            no_createrole: true,
            superuser: false,
            no_superuser: false,
            encrypted: false,
            password: None,
            dry_run: false,
            conn: ConnArgs::default(),
        }
    }

    #[test]
    fn test_spec_from_args() {
        let mut a = args("bob");
        a.password = Some("pw".into());
        a.encrypted = true;
        let spec = spec_from(&a);
        assert_eq!(spec.createdb, Some(true));
        assert_eq!(spec.createrole, Some(false));
        assert_eq!(spec.superuser, None);
        assert!(spec.encrypted);
        assert_eq!(spec.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_update_changes_privileges() {
        let ctx = test_context();
        let server = FakeServer::new().with_role("bob", false, true);
        let code = ensure_updated(&ctx, &server.client(), &args("bob")).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(server.role_privileges("bob"), Some((true, false)));
    }

    #[test]
    fn test_update_missing_role_exits_non_zero() {
        let ctx = test_context();
        let server = FakeServer::new();
        let code = ensure_updated(&ctx, &server.client(), &args("ghost")).unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[test]
    fn test_list_roles() {
        let ctx = test_context();
        let server = FakeServer::new().with_role("bob", false, false);
        assert_eq!(list(&ctx, &server.client()).unwrap(), ExitCode::SUCCESS);
    }
}
