//! # pgkit
//!
//! PostgreSQL database and role management through the stock client tools
//! (`psql`, `createdb`, `dropdb`, `dropuser`).
//!
//! This crate provides functionality for:
//! - Resolving connection parameters from call-site values and two
//!   configuration layers
//! - Listing databases and roles by parsing `psql` tabular output
//! - Creating, altering and dropping databases and roles
//!
//! Every command goes through a [`declarative::CommandRunner`], so tests
//! can run the whole client against an in-memory server.
//!
//! ## Example
//!
//! ```no_run
//! use pgkit::{Client, ConnectionParams, DatabaseSpec};
//!
//! let client = Client::new(ConnectionParams::default()).expect("psql not available");
//!
//! if !client.database_exists("app").expect("probe failed") {
//!     client
//!         .create_database(&DatabaseSpec::new("app").with_owner("app"))
//!         .expect("create failed");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
mod mutate;
pub mod params;
mod probe;
pub mod sql;
pub mod tabular;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use params::{ConfigLayer, ConnectionParams, ExplicitParams, resolve};
pub use tabular::TabularRecord;
pub use types::{DatabaseSpec, DropOptions, ResourceDescriptor, ResourceKind, RoleSpec, Tools};

use declarative::{CommandOutput, CommandRunner, Invocation, ProcessRunner};
use regex::Regex;
use std::io;
use std::sync::Arc;

/// Database every listing and statement connects to.
const MAINTENANCE_DB: &str = "postgres";

/// High-level client for one PostgreSQL server.
#[derive(Clone)]
pub struct Client {
    runner: Arc<dyn CommandRunner>,
    tools: Tools,
    params: ConnectionParams,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tools", &self.tools)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client that spawns the client tools found in PATH.
    ///
    /// Returns an error if `psql` is not installed.
    pub fn new(params: ConnectionParams) -> Result<Self> {
        let tools = Tools::discover()?;
        Ok(Self::with_runner(Arc::new(ProcessRunner), tools, params))
    }

    /// Create a client with a custom runner (useful for testing).
    pub fn with_runner(
        runner: Arc<dyn CommandRunner>,
        tools: Tools,
        params: ConnectionParams,
    ) -> Self {
        Self {
            runner,
            tools,
            params,
        }
    }

    /// The resolved connection parameters.
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// The client program paths.
    pub fn tools(&self) -> &Tools {
        &self.tools
    }

    /// Version of the installed `psql`, e.g. `16.2`.
    pub fn version(&self) -> Result<String> {
        let inv = Invocation::new(&self.tools.psql).arg("--version");
        let stdout = self.run_checked(&inv, None)?;
        parse_version(&stdout).ok_or_else(|| {
            Error::Other(format!("unrecognized psql version output: {}", stdout.trim()))
        })
    }

    // =========================================================================
    // Invocation building
    // =========================================================================

    /// `program -w -h HOST -U USER -p PORT`, with the password in the
    /// child's environment when one is configured.
    fn base(&self, program: &str) -> Invocation {
        let inv = Invocation::new(program).args([
            "-w",
            "-h",
            self.params.host.as_str(),
            "-U",
            self.params.user.as_str(),
            "-p",
            self.params.port.as_str(),
        ]);
        match &self.params.password {
            Some(password) => inv.env("PGPASSWORD", password),
            None => inv,
        }
    }

    /// `psql` running one statement with unaligned, `|`-separated output.
    fn psql(&self, statement: &str) -> Invocation {
        self.psql_base().args(["-c", statement])
    }

    /// `psql` reading one statement from standard input, keeping it out
    /// of the process list.
    fn psql_stdin(&self, statement: &str) -> Invocation {
        self.psql_base()
            .args(["-v", "ON_ERROR_STOP=1"])
            .stdin(format!("{statement};\n"))
    }

    fn psql_base(&self) -> Invocation {
        self.base(&self.tools.psql).args([
            "-X",
            "-d",
            MAINTENANCE_DB,
            "-A",
            "-F",
            "|",
            "-P",
            "footer=off",
        ])
    }

    // =========================================================================
    // Running
    // =========================================================================

    /// Run an invocation, mapping spawn failures.
    fn run(&self, inv: &Invocation) -> Result<CommandOutput> {
        log::debug!("pgkit: {inv}");
        self.runner.run(inv).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::ToolNotFound {
                    tool: inv.program.clone(),
                }
            } else {
                Error::Io(e)
            }
        })
    }

    /// Run an invocation and require a zero exit, returning stdout.
    fn run_checked(&self, inv: &Invocation, name: Option<&str>) -> Result<String> {
        let output = self.run(inv)?;
        if !output.success {
            return Err(Error::from_psql_output(
                program_name(&inv.program),
                &output.stderr_str(),
                name,
            ));
        }
        Ok(output.stdout_str())
    }
}

/// File name of a program path, for messages.
fn program_name(program: &str) -> &str {
    program.rsplit(['/', '\\']).next().unwrap_or(program)
}

fn parse_version(output: &str) -> Option<String> {
    let re = Regex::new(r"(\d+(?:\.\d+)*)").ok()?;
    re.captures(output).map(|c| c[1].to_string())
}
