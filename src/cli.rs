use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use pgkit::ExplicitParams;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "converge")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Declarative PostgreSQL databases, roles and poudriere build jails",
    long_about = None
)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Local config file [default: ~/.config/converge/config.toml]
    #[arg(long, global = true, env = "CONVERGE_CONFIG")]
    pub config: Option<String>,

    /// Shared (pillar) config file [default: ~/.config/converge/pillar.toml]
    #[arg(long, global = true, env = "CONVERGE_PILLAR")]
    pub pillar: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage PostgreSQL databases
    #[command(subcommand)]
    Db(DbCommand),

    /// Manage PostgreSQL roles (users)
    #[command(subcommand)]
    Role(RoleCommand),

    /// Manage poudriere build jails
    #[command(subcommand)]
    Jail(JailCommand),

    /// Reconcile everything a manifest declares
    Apply(ApplyArgs),

    /// Show what apply would change
    Status(StatusArgs),

    /// Show converge and backend tool versions
    Version(ConnArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Connection
// ============================================================================

/// Connection parameters; these win over config files
#[derive(Args, Clone, Debug, Default)]
pub struct ConnArgs {
    /// Role to connect as
    #[arg(long)]
    pub pguser: Option<String>,

    /// Password for the connecting role
    #[arg(long)]
    pub pgpassword: Option<String>,

    /// Server host
    #[arg(long)]
    pub host: Option<String>,

    /// Server port
    #[arg(long)]
    pub port: Option<String>,
}

impl ConnArgs {
    pub fn explicit(&self) -> ExplicitParams {
        ExplicitParams {
            user: self.pguser.clone(),
            password: self.pgpassword.clone(),
            host: self.host.clone(),
            port: self.port.clone(),
        }
    }
}

// ============================================================================
// Databases
// ============================================================================

#[derive(Subcommand)]
pub enum DbCommand {
    /// Ensure a database exists
    Present(DbPresentArgs),

    /// Ensure a database does not exist
    Absent {
        name: String,

        /// Terminate other sessions first
        #[arg(long)]
        force: bool,

        /// Show what would be done
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        conn: ConnArgs,
    },

    /// List databases
    List(ConnArgs),

    /// Exit 0 if the database exists, 1 otherwise
    Exists {
        name: String,

        #[command(flatten)]
        conn: ConnArgs,
    },
}

#[derive(Args)]
pub struct DbPresentArgs {
    pub name: String,

    #[arg(long)]
    pub owner: Option<String>,

    #[arg(long)]
    pub encoding: Option<String>,

    /// Template database to copy
    #[arg(long)]
    pub template: Option<String>,

    #[arg(long)]
    pub tablespace: Option<String>,

    #[arg(long)]
    pub locale: Option<String>,

    #[arg(long)]
    pub lc_collate: Option<String>,

    #[arg(long)]
    pub lc_ctype: Option<String>,

    /// Show what would be done
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub conn: ConnArgs,
}

// ============================================================================
// Roles
// ============================================================================

#[derive(Subcommand)]
pub enum RoleCommand {
    /// Ensure a role exists
    Present(RoleArgs),

    /// Bring an existing role's attributes in line
    Update(RoleArgs),

    /// Ensure a role does not exist
    Absent {
        name: String,

        /// Show what would be done
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        conn: ConnArgs,
    },

    /// List roles
    List(ConnArgs),
}

#[derive(Args)]
pub struct RoleArgs {
    pub name: String,

    /// Allow creating databases
    #[arg(long, overrides_with = "no_createdb")]
    pub createdb: bool,

    #[arg(long)]
    pub no_createdb: bool,

    /// Allow creating roles
    #[arg(long, overrides_with = "no_createrole")]
    pub createrole: bool,

    #[arg(long)]
    pub no_createrole: bool,

    /// Grant superuser
    #[arg(long, overrides_with = "no_superuser")]
    pub superuser: bool,

    #[arg(long)]
    pub no_superuser: bool,

    /// Store the password encrypted
    #[arg(long)]
    pub encrypted: bool,

    /// Password for the role
    #[arg(long)]
    pub password: Option<String>,

    /// Show what would be done
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub conn: ConnArgs,
}

impl RoleArgs {
    pub fn createdb(&self) -> Option<bool> {
        tristate(self.createdb, self.no_createdb)
    }

    pub fn createrole(&self) -> Option<bool> {
        tristate(self.createrole, self.no_createrole)
    }

    pub fn superuser(&self) -> Option<bool> {
        tristate(self.superuser, self.no_superuser)
    }
}

/// `--flag` / `--no-flag` / neither
fn tristate(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

// ============================================================================
// Jails
// ============================================================================

#[derive(Subcommand)]
pub enum JailCommand {
    /// Ensure a build jail exists
    Present {
        name: String,

        /// Target architecture (amd64, i386, ...)
        #[arg(long)]
        arch: String,

        /// FreeBSD release [default: 9.0-RELEASE]
        #[arg(long)]
        version: Option<String>,

        /// Show what would be done
        #[arg(long)]
        dry_run: bool,
    },

    /// Ensure a build jail does not exist
    Absent {
        name: String,

        /// Show what would be done
        #[arg(long)]
        dry_run: bool,
    },

    /// List jails
    List,

    /// List ports trees
    Ports {
        /// Create the default ports tree first
        #[arg(long)]
        create: bool,
    },

    /// Build the packages listed in a file inside a jail
    Bulk {
        jail: String,

        /// File with one port origin per line
        pkg_file: PathBuf,

        /// Keep previously built packages
        #[arg(short, long)]
        keep: bool,
    },

    /// Show the parsed poudriere.conf
    Config,
}

// ============================================================================
// Manifests
// ============================================================================

#[derive(Args)]
pub struct ApplyArgs {
    /// Manifest file
    pub manifest: PathBuf,

    /// Only apply one type or one resource (e.g. "role" or "database.app")
    #[arg(short, long)]
    pub target: Option<String>,

    /// Show what would be done
    #[arg(long)]
    pub dry_run: bool,

    /// Number of parallel probes
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    #[command(flatten)]
    pub conn: ConnArgs,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Manifest file
    pub manifest: PathBuf,

    /// Only check one type or one resource
    #[arg(short, long)]
    pub target: Option<String>,

    /// Number of parallel probes
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    #[command(flatten)]
    pub conn: ConnArgs,
}
