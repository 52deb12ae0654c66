//! Mutating commands: create, alter and drop.
//!
//! Each public operation issues at most one mutating command. Names are
//! always passed after `--` (for the wrapper tools) or quoted (inside SQL),
//! so a name can never be read as an option or break out of a statement.

use crate::error::{Error, Result};
use crate::sql::{quote_ident, quote_literal};
use crate::types::{DatabaseSpec, DropOptions, ResourceDescriptor, ResourceKind, RoleSpec};
use crate::Client;
use declarative::Invocation;

impl Client {
    /// Create the object described by `descriptor`.
    pub fn create(&self, descriptor: &ResourceDescriptor) -> Result<()> {
        match descriptor {
            ResourceDescriptor::Database(spec) => self.create_database(spec),
            ResourceDescriptor::Role(spec) => self.create_role(spec),
        }
    }

    /// Drop the object of `kind` named `name`.
    pub fn drop(&self, kind: ResourceKind, name: &str, options: DropOptions) -> Result<()> {
        match kind {
            ResourceKind::Database => self.drop_database(name, options),
            ResourceKind::Role => self.drop_role(name),
        }
    }

    // =========================================================================
    // Databases
    // =========================================================================

    /// Create a database with `createdb`.
    ///
    /// When a template is named it must already exist; otherwise
    /// [`Error::MissingTemplate`] is returned and nothing is executed.
    pub fn create_database(&self, spec: &DatabaseSpec) -> Result<()> {
        validate_name(&spec.name)?;

        if let Some(template) = spec.template.as_deref().filter(|t| !t.is_empty())
            && !self.database_exists(template)?
        {
            return Err(Error::MissingTemplate {
                template: template.to_string(),
            });
        }

        let mut inv = self.base(&self.tools.createdb);
        for (flag, value) in createdb_options(spec) {
            inv = inv.args([flag, value]);
        }
        let inv = inv.args(["--", spec.name.as_str()]);

        self.run_checked(&inv, Some(&spec.name))?;
        log::info!("created database {}", spec.name);
        Ok(())
    }

    /// Drop a database with `dropdb`.
    ///
    /// With `force`, other sessions on the database are terminated first.
    /// Termination is best-effort: a failure there is logged and the drop
    /// is still attempted.
    pub fn drop_database(&self, name: &str, options: DropOptions) -> Result<()> {
        validate_name(name)?;

        if options.force {
            match self.terminate_sessions(name) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => log::warn!("could not terminate sessions on {name}: {e}"),
            }
        }

        let inv = self.base(&self.tools.dropdb).args(["--", name]);
        self.run_checked(&inv, Some(name))?;
        log::info!("dropped database {name}");
        Ok(())
    }

    /// Terminate every backend connected to `database` except our own.
    pub fn terminate_sessions(&self, database: &str) -> Result<()> {
        let statement = format!(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
             WHERE datname = {} AND pid <> pg_backend_pid()",
            quote_literal(database)
        );
        self.run_checked(&self.psql(&statement), Some(database))?;
        Ok(())
    }

    // =========================================================================
    // Roles
    // =========================================================================

    /// Create a login role with `CREATE USER`.
    pub fn create_role(&self, spec: &RoleSpec) -> Result<()> {
        validate_name(&spec.name)?;
        let inv = self.role_statement("CREATE USER", spec);
        self.run_checked(&inv, Some(&spec.name))?;
        log::info!("created role {}", spec.name);
        Ok(())
    }

    /// Change an existing role's attributes with `ALTER USER`.
    ///
    /// Attributes left unspecified are not touched. A spec with no
    /// attributes issues no command.
    pub fn update_role(&self, spec: &RoleSpec) -> Result<()> {
        validate_name(&spec.name)?;
        if !spec.has_attributes() {
            log::debug!("nothing to alter for role {}", spec.name);
            return Ok(());
        }
        let inv = self.role_statement("ALTER USER", spec);
        self.run_checked(&inv, Some(&spec.name))?;
        log::info!("altered role {}", spec.name);
        Ok(())
    }

    /// Drop a role with `dropuser`.
    pub fn drop_role(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let inv = self.base(&self.tools.dropuser).args(["--", name]);
        self.run_checked(&inv, Some(name))?;
        log::info!("dropped role {name}");
        Ok(())
    }

    /// Statements carrying a password go through stdin.
    fn role_statement(&self, verb: &str, spec: &RoleSpec) -> Invocation {
        let sql = role_sql(verb, spec);
        if spec.password.is_some() {
            self.psql_stdin(&sql).sensitive()
        } else {
            self.psql(&sql)
        }
    }
}

/// `createdb` options in the order they are passed. Unset and empty
/// attributes are skipped.
fn createdb_options(spec: &DatabaseSpec) -> Vec<(&'static str, &str)> {
    [
        ("-D", spec.tablespace.as_deref()),
        ("-E", spec.encoding.as_deref()),
        ("-l", spec.locale.as_deref()),
        ("--lc-collate", spec.lc_collate.as_deref()),
        ("--lc-ctype", spec.lc_ctype.as_deref()),
        ("-O", spec.owner.as_deref()),
        ("-T", spec.template.as_deref()),
    ]
    .into_iter()
    .filter_map(|(flag, value)| value.filter(|v| !v.is_empty()).map(|v| (flag, v)))
    .collect()
}

/// `VERB "name" [WITH options]` for a role.
fn role_sql(verb: &str, spec: &RoleSpec) -> String {
    let mut options: Vec<String> = Vec::new();

    if let Some(password) = &spec.password {
        let keyword = if spec.encrypted {
            "ENCRYPTED PASSWORD"
        } else {
            "PASSWORD"
        };
        options.push(format!("{keyword} {}", quote_literal(password)));
    }
    if let Some(createdb) = spec.createdb {
        options.push(if createdb { "CREATEDB" } else { "NOCREATEDB" }.to_string());
    }
    if let Some(createrole) = spec.createrole {
        options.push(if createrole { "CREATEROLE" } else { "NOCREATEROLE" }.to_string());
    }
    if let Some(superuser) = spec.superuser {
        options.push(if superuser { "SUPERUSER" } else { "NOSUPERUSER" }.to_string());
    }

    let mut sql = format!("{verb} {}", quote_ident(&spec.name));
    if !options.is_empty() {
        sql.push_str(" WITH ");
        sql.push_str(&options.join(" "));
    }
    sql
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidName("name must not be empty".to_string()));
    }
    if name.contains('\0') {
        return Err(Error::InvalidName(format!("{name:?} contains a NUL byte")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeServer;

    #[test]
    fn test_role_sql_full() {
        let spec = RoleSpec::new("bob")
            .with_password("pw", true)
            .with_createdb(true)
            .with_createrole(false)
            .with_superuser(true);
        assert_eq!(
            role_sql("CREATE USER", &spec),
            "CREATE USER \"bob\" WITH ENCRYPTED PASSWORD 'pw' CREATEDB NOCREATEROLE SUPERUSER"
        );
    }

    #[test]
    fn test_role_sql_bare() {
        assert_eq!(
            role_sql("CREATE USER", &RoleSpec::new("bob")),
            "CREATE USER \"bob\""
        );
    }

    #[test]
    fn test_role_sql_quotes_hostile_input() {
        let spec = RoleSpec::new("x\"; DROP ROLE postgres; --").with_password("a'b", false);
        assert_eq!(
            role_sql("ALTER USER", &spec),
            "ALTER USER \"x\"\"; DROP ROLE postgres; --\" WITH PASSWORD 'a''b'"
        );
    }

    #[test]
    fn test_createdb_options_skip_unset_and_empty() {
        let spec = DatabaseSpec {
            owner: Some("bob".into()),
            encoding: Some(String::new()),
            lc_ctype: Some("C".into()),
            ..DatabaseSpec::new("app")
        };
        assert_eq!(
            createdb_options(&spec),
            vec![("--lc-ctype", "C"), ("-O", "bob")]
        );
    }

    #[test]
    fn test_create_database_invocation() {
        let server = FakeServer::new();
        let spec = DatabaseSpec::new("app")
            .with_owner("postgres")
            .with_encoding("UTF8");
        server.client().create_database(&spec).unwrap();

        let calls = server.calls();
        let create = calls.iter().find(|c| c.program == "createdb").unwrap();
        assert_eq!(create.arg_after("-E"), Some("UTF8"));
        assert_eq!(create.arg_after("-O"), Some("postgres"));
        assert_eq!(create.args[create.args.len() - 2..], ["--", "app"]);
        assert!(server.has_database("app"));
    }

    #[test]
    fn test_dash_leading_name_is_not_an_option() {
        let server = FakeServer::new();
        server.client().create_database(&DatabaseSpec::new("-x")).unwrap();
        let calls = server.calls();
        let create = calls.iter().find(|c| c.program == "createdb").unwrap();
        assert_eq!(create.arg_after("--"), Some("-x"));
    }

    #[test]
    fn test_missing_template_refused_before_createdb() {
        let server = FakeServer::new();
        let err = server
            .client()
            .create_database(&DatabaseSpec::new("app").with_template("tpl"))
            .unwrap_err();
        assert!(matches!(err, Error::MissingTemplate { ref template } if template == "tpl"));
        assert!(server.calls().iter().all(|c| c.program != "createdb"));
        assert!(!server.has_database("app"));
    }

    #[test]
    fn test_existing_template_passed_through() {
        let server = FakeServer::new().with_database("tpl", "postgres");
        server
            .client()
            .create_database(&DatabaseSpec::new("app").with_template("tpl"))
            .unwrap();
        let calls = server.calls();
        let create = calls.iter().find(|c| c.program == "createdb").unwrap();
        assert_eq!(create.arg_after("-T"), Some("tpl"));
    }

    #[test]
    fn test_create_existing_database_is_conflict() {
        let server = FakeServer::new().with_database("app", "postgres");
        let err = server
            .client()
            .create_database(&DatabaseSpec::new("app"))
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[test]
    fn test_forced_drop_terminates_sessions_first() {
        let server = FakeServer::new().with_database("app", "postgres");
        server.open_session("app");
        server
            .client()
            .drop_database("app", DropOptions { force: true })
            .unwrap();

        let programs: Vec<_> = server
            .calls()
            .iter()
            .map(|c| c.program.clone())
            .collect();
        assert_eq!(programs, vec!["psql", "dropdb"]);
        let calls = server.calls();
        let terminate = &calls[0];
        assert!(
            terminate
                .arg_after("-c")
                .unwrap()
                .contains("pg_terminate_backend")
        );
        assert!(!server.has_database("app"));
    }

    #[test]
    fn test_unforced_drop_with_sessions_fails() {
        let server = FakeServer::new().with_database("app", "postgres");
        server.open_session("app");
        let err = server
            .client()
            .drop_database("app", DropOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::InUse { .. }));
        assert!(server.calls().iter().all(|c| c.program == "dropdb"));
    }

    #[test]
    fn test_terminate_failure_still_drops() {
        let server = FakeServer::new().with_database("app", "postgres");
        server.fail_statements_containing("pg_terminate_backend");
        server
            .client()
            .drop_database("app", DropOptions { force: true })
            .unwrap();
        assert!(!server.has_database("app"));
    }

    #[test]
    fn test_create_role_with_password_is_sensitive() {
        let server = FakeServer::new();
        let spec = RoleSpec::new("bob").with_password("hunter2", true);
        server.client().create_role(&spec).unwrap();

        let calls = server.calls();

        let inv = &calls[0];
        assert!(inv.sensitive);
        assert!(!inv.display().contains("hunter2"));
        assert!(inv.args.iter().all(|a| !a.contains("hunter2")));
        assert!(!inv.has_arg("-c"));
        assert_eq!(inv.arg_after("-v"), Some("ON_ERROR_STOP=1"));
        assert!(inv.stdin.as_deref().unwrap().contains("'hunter2'"));
        assert!(server.has_role("bob"));
    }

    #[test]
    fn test_update_role_changes_privileges() {
        let server = FakeServer::new().with_role("bob", false, false);
        server
            .client()
            .update_role(&RoleSpec::new("bob").with_createdb(true))
            .unwrap();
        assert_eq!(server.role_privileges("bob"), Some((true, false)));
    }

    #[test]
    fn test_update_role_without_attributes_runs_nothing() {
        let server = FakeServer::new().with_role("bob", false, false);
        server.client().update_role(&RoleSpec::new("bob")).unwrap();
        assert!(server.calls().is_empty());
    }

    #[test]
    fn test_create_dispatches_on_descriptor() {
        let server = FakeServer::new();
        let client = server.client();

        client
            .create(&ResourceDescriptor::Role(RoleSpec::new("bob").with_createdb(true)))
            .unwrap();
        client
            .create(&ResourceDescriptor::Database(
                DatabaseSpec::new("app").with_owner("bob"),
            ))
            .unwrap();

        let programs: Vec<_> = server.calls().iter().map(|c| c.program.clone()).collect();
        assert_eq!(programs, vec!["psql", "createdb"]);
        assert_eq!(server.role_privileges("bob"), Some((true, false)));
        assert!(server.has_database("app"));
    }

    #[test]
    fn test_create_descriptor_checks_template() {
        let server = FakeServer::new();
        let descriptor = ResourceDescriptor::Database(DatabaseSpec::new("app").with_template("tpl"));
        let err = server.client().create(&descriptor).unwrap_err();
        assert!(err.is_precondition());
        assert!(server.calls().iter().all(|c| c.program != "createdb"));
    }

    #[test]
    fn test_drop_database_by_kind_honours_force() {
        let server = FakeServer::new().with_database("app", "postgres");
        server.open_session("app");
        server
            .client()
            .drop(ResourceKind::Database, "app", DropOptions { force: true })
            .unwrap();
        assert!(!server.has_database("app"));
    }

    #[test]
    fn test_drop_role() {
        let server = FakeServer::new().with_role("bob", false, false);
        server.client().drop(ResourceKind::Role, "bob", DropOptions::default()).unwrap();
        assert!(!server.has_role("bob"));
        let calls = server.calls();
        let inv = &calls[0];
        assert_eq!(inv.program, "dropuser");
        assert_eq!(inv.arg_after("--"), Some("bob"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let server = FakeServer::new();
        let err = server.client().drop_role("").unwrap_err();
        assert!(err.is_precondition());
        assert!(server.calls().is_empty());
    }
}
