//! In-memory PostgreSQL server for tests.
//!
//! [`FakeServer`] implements [`CommandRunner`] and answers the exact
//! invocations [`Client`] issues: the two listing queries, role
//! statements, session termination, `createdb`, `dropdb` and `dropuser`.
//! Every invocation is recorded for later inspection.

use crate::params::ConnectionParams;
use crate::types::Tools;
use crate::Client;
use declarative::{CommandOutput, CommandRunner, Invocation};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RoleRow {
    createdb: bool,
    createrole: bool,
    superuser: bool,
    oid: u32,
}

#[derive(Debug, Default)]
struct State {
    databases: BTreeMap<String, String>,
    roles: BTreeMap<String, RoleRow>,
    sessions: BTreeSet<String>,
    calls: Vec<Invocation>,
    next_oid: u32,
    unreachable: bool,
    tools_missing: bool,
    ignore_mutations: bool,
    failing_statements: Vec<String>,
    failing_programs: Vec<String>,
}

/// Shared handle to a simulated server.
#[derive(Debug, Clone)]
pub struct FakeServer {
    state: Arc<Mutex<State>>,
}

impl Default for FakeServer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeServer {
    /// A server with the stock `postgres`, `template0` and `template1`
    /// databases and a `postgres` superuser.
    pub fn new() -> Self {
        let mut state = State {
            next_oid: 16384,
            ..State::default()
        };
        for db in ["postgres", "template0", "template1"] {
            state.databases.insert(db.to_string(), "postgres".to_string());
        }
        state.roles.insert(
            "postgres".to_string(),
            RoleRow {
                createdb: true,
                createrole: true,
                superuser: true,
                oid: 10,
            },
        );
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Add a database owned by `owner`.
    pub fn with_database(self, name: &str, owner: &str) -> Self {
        self.lock()
            .databases
            .insert(name.to_string(), owner.to_string());
        self
    }

    /// Add a role with the given privileges.
    pub fn with_role(self, name: &str, createdb: bool, createrole: bool) -> Self {
        {
            let mut state = self.lock();
            let oid = state.next_oid;
            state.next_oid += 1;
            state.roles.insert(
                name.to_string(),
                RoleRow {
                    createdb,
                    createrole,
                    superuser: false,
                    oid,
                },
            );
        }
        self
    }

    /// A client using default tool names and connection parameters.
    pub fn client(&self) -> Client {
        self.client_with(ConnectionParams::default())
    }

    /// A client using the given connection parameters.
    pub fn client_with(&self, params: ConnectionParams) -> Client {
        Client::with_runner(Arc::new(self.clone()), Tools::default(), params)
    }

    /// Every invocation received so far.
    pub fn calls(&self) -> Vec<Invocation> {
        self.lock().calls.clone()
    }

    /// Forget recorded invocations.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Whether a database exists.
    pub fn has_database(&self, name: &str) -> bool {
        self.lock().databases.contains_key(name)
    }

    /// Whether a role exists.
    pub fn has_role(&self, name: &str) -> bool {
        self.lock().roles.contains_key(name)
    }

    /// `(createdb, createrole)` of a role.
    pub fn role_privileges(&self, name: &str) -> Option<(bool, bool)> {
        self.lock()
            .roles
            .get(name)
            .map(|r| (r.createdb, r.createrole))
    }

    /// Whether a role is a superuser.
    pub fn is_superuser(&self, name: &str) -> bool {
        self.lock().roles.get(name).is_some_and(|r| r.superuser)
    }

    /// Simulate another client connected to `database`.
    pub fn open_session(&self, database: &str) {
        self.lock().sessions.insert(database.to_string());
    }

    /// Make every command fail as if the server were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Make every spawn fail as if the client tools were not installed.
    pub fn set_tools_missing(&self, missing: bool) {
        self.lock().tools_missing = missing;
    }

    /// Report success for mutations without applying them.
    pub fn set_ignore_mutations(&self, ignore: bool) {
        self.lock().ignore_mutations = ignore;
    }

    /// Fail any `psql` statement containing `needle`.
    pub fn fail_statements_containing(&self, needle: &str) {
        self.lock().failing_statements.push(needle.to_string());
    }

    /// Fail every invocation of `program` with a generic error.
    pub fn fail_program(&self, program: &str) {
        self.lock().failing_programs.push(program.to_string());
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl CommandRunner for FakeServer {
    fn run(&self, inv: &Invocation) -> io::Result<CommandOutput> {
        let mut state = self.lock();
        state.calls.push(inv.clone());

        if state.tools_missing {
            return Err(io::Error::new(io::ErrorKind::NotFound, "No such file"));
        }
        if inv.has_arg("--version") {
            return Ok(CommandOutput::ok("psql (PostgreSQL) 16.2\n"));
        }
        if state.unreachable {
            return Ok(CommandOutput::failed(format!(
                "{}: error: connection to server at \"127.0.0.1\", port 5432 failed: Connection refused\n",
                inv.program
            )));
        }
        if state.failing_programs.iter().any(|p| *p == inv.program) {
            return Ok(CommandOutput::failed(format!(
                "{}: error: unexpected failure\n",
                inv.program
            )));
        }

        match inv.program.as_str() {
            "psql" => Ok(psql(&mut state, inv)),
            "createdb" => Ok(createdb(&mut state, inv)),
            "dropdb" => Ok(dropdb(&mut state, inv)),
            "dropuser" => Ok(dropuser(&mut state, inv)),
            other => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{other}: not simulated"),
            )),
        }
    }
}

fn psql(state: &mut State, inv: &Invocation) -> CommandOutput {
    let sql = inv
        .stdin
        .as_deref()
        .or_else(|| inv.arg_after("-c"))
        .unwrap_or_default()
        .trim_end()
        .trim_end_matches(';')
        .to_string();

    if state.failing_statements.iter().any(|n| sql.contains(n.as_str())) {
        return CommandOutput::failed("ERROR:  canceling statement due to user request\n");
    }

    if sql.starts_with("SELECT d.datname") {
        return CommandOutput::ok(render_databases(state));
    }
    if sql.starts_with("SELECT rolname") {
        return CommandOutput::ok(render_roles(state));
    }
    if sql.starts_with("SELECT pg_terminate_backend") {
        let name = between(&sql, '\'').unwrap_or_default();
        if !state.ignore_mutations {
            state.sessions.remove(&name);
        }
        return CommandOutput::ok("pg_terminate_backend\n");
    }

    let Some(name) = between(&sql, '"') else {
        return CommandOutput::failed("ERROR:  syntax error\n");
    };
    let tokens: Vec<&str> = sql.split_whitespace().collect();
    let flag = |on: &str, off: &str| {
        if tokens.contains(&on) {
            Some(true)
        } else if tokens.contains(&off) {
            Some(false)
        } else {
            None
        }
    };
    let createdb = flag("CREATEDB", "NOCREATEDB");
    let createrole = flag("CREATEROLE", "NOCREATEROLE");
    let superuser = flag("SUPERUSER", "NOSUPERUSER");

    if sql.starts_with("CREATE USER") {
        if state.roles.contains_key(&name) {
            return CommandOutput::failed(format!("ERROR:  role \"{name}\" already exists\n"));
        }
        if !state.ignore_mutations {
            let oid = state.next_oid;
            state.next_oid += 1;
            state.roles.insert(
                name,
                RoleRow {
                    createdb: createdb.unwrap_or(false),
                    createrole: createrole.unwrap_or(false),
                    superuser: superuser.unwrap_or(false),
                    oid,
                },
            );
        }
        return CommandOutput::ok("CREATE ROLE\n");
    }

    if sql.starts_with("ALTER USER") {
        let ignore = state.ignore_mutations;
        let Some(role) = state.roles.get_mut(&name) else {
            return CommandOutput::failed(format!("ERROR:  role \"{name}\" does not exist\n"));
        };
        if !ignore {
            if let Some(v) = createdb {
                role.createdb = v;
            }
            if let Some(v) = createrole {
                role.createrole = v;
            }
            if let Some(v) = superuser {
                role.superuser = v;
            }
        }
        return CommandOutput::ok("ALTER ROLE\n");
    }

    CommandOutput::failed("ERROR:  syntax error\n")
}

fn createdb(state: &mut State, inv: &Invocation) -> CommandOutput {
    let name = last_arg(inv);
    if state.databases.contains_key(&name) {
        return CommandOutput::failed(format!(
            "createdb: error: database creation failed: ERROR:  database \"{name}\" already exists\n"
        ));
    }
    if let Some(template) = inv.arg_after("-T")
        && !state.databases.contains_key(template)
    {
        return CommandOutput::failed(format!(
            "createdb: error: database creation failed: ERROR:  template database \"{template}\" does not exist\n"
        ));
    }
    let owner = inv
        .arg_after("-O")
        .or_else(|| inv.arg_after("-U"))
        .unwrap_or("postgres")
        .to_string();
    if !state.ignore_mutations {
        state.databases.insert(name, owner);
    }
    CommandOutput::ok("")
}

fn dropdb(state: &mut State, inv: &Invocation) -> CommandOutput {
    let name = last_arg(inv);
    if !state.databases.contains_key(&name) {
        return CommandOutput::failed(format!(
            "dropdb: error: database removal failed: ERROR:  database \"{name}\" does not exist\n"
        ));
    }
    if state.sessions.contains(&name) {
        return CommandOutput::failed(format!(
            "dropdb: error: database removal failed: ERROR:  database \"{name}\" is being accessed by other users\n"
        ));
    }
    if !state.ignore_mutations {
        state.databases.remove(&name);
    }
    CommandOutput::ok("")
}

fn dropuser(state: &mut State, inv: &Invocation) -> CommandOutput {
    let name = last_arg(inv);
    if !state.roles.contains_key(&name) {
        return CommandOutput::failed(format!(
            "dropuser: error: removal of role \"{name}\" failed: ERROR:  role \"{name}\" does not exist\n"
        ));
    }
    if !state.ignore_mutations {
        state.roles.remove(&name);
    }
    CommandOutput::ok("")
}

fn render_databases(state: &State) -> String {
    let mut out = String::from("Name|Owner|Encoding|Collate|Ctype|_\n");
    for (name, owner) in &state.databases {
        out.push_str(&format!("{name}|{owner}|UTF8|C.UTF-8|C.UTF-8|\n"));
    }
    out
}

fn render_roles(state: &State) -> String {
    let mut out = String::from(
        "rolname|rolsuper|rolinherit|rolcreaterole|rolcreatedb|rolcanlogin|rolreplication|\
         rolconnlimit|rolpassword|rolvaliduntil|rolbypassrls|oid|_\n",
    );
    let tf = |b: bool| if b { "t" } else { "f" };
    for (name, role) in &state.roles {
        out.push_str(&format!(
            "{name}|{}|t|{}|{}|t|{}|-1|********||{}|{}|\n",
            tf(role.superuser),
            tf(role.createrole),
            tf(role.createdb),
            tf(role.superuser),
            tf(role.superuser),
            role.oid
        ));
    }
    out
}

fn last_arg(inv: &Invocation) -> String {
    inv.args.last().cloned().unwrap_or_default()
}

/// Text between the first pair of `quote` characters, with doubled
/// quotes collapsed.
fn between(text: &str, quote: char) -> Option<String> {
    let start = text.find(quote)? + quote.len_utf8();
    let rest = &text[start..];
    let mut out = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c == quote {
            if chars.peek() == Some(&quote) {
                out.push(quote);
                chars.next();
            } else {
                return Some(out);
            }
        } else {
            out.push(c);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between_unescapes() {
        assert_eq!(between("ALTER USER \"a\"\"b\" WITH", '"'), Some("a\"b".into()));
        assert_eq!(between("no quotes", '"'), None);
    }

    #[test]
    fn test_listing_shapes() {
        let state = FakeServer::new();
        let guard = state.lock();
        for line in render_databases(&guard).lines() {
            assert_eq!(line.split('|').count(), 6);
        }
        for line in render_roles(&guard).lines() {
            assert_eq!(line.split('|').count(), 13);
        }
    }
}
