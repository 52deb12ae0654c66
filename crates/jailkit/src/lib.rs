//! # jailkit
//!
//! Poudriere build jail management: jails, ports trees and bulk package
//! builds on FreeBSD.
//!
//! ```no_run
//! use jailkit::{JailSpec, Poudriere, PoudrierePaths};
//!
//! let poudriere = Poudriere::new(PoudrierePaths::default()).expect("poudriere not installed");
//! if !poudriere.is_jail("90amd64").expect("listing failed") {
//!     poudriere.create_jail(&JailSpec::new("90amd64", "amd64")).expect("create failed");
//! }
//! ```

pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use types::{DEFAULT_VERSION, JailSpec, PoudrierePaths};

use declarative::{CommandOutput, CommandRunner, Invocation, ProcessRunner};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Marker poudriere prints on the summary line of a bulk build.
const BULK_SUMMARY_MARKER: &str = "packages built";

/// Client for the `poudriere` command.
#[derive(Clone)]
pub struct Poudriere {
    runner: Arc<dyn CommandRunner>,
    program: String,
    paths: PoudrierePaths,
}

impl std::fmt::Debug for Poudriere {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poudriere")
            .field("program", &self.program)
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

impl Poudriere {
    /// Create a client for the `poudriere` found in PATH.
    pub fn new(paths: PoudrierePaths) -> Result<Self> {
        let program = which::which("poudriere").map_err(|_| Error::PoudriereNotFound)?;
        Ok(Self::with_runner(
            Arc::new(ProcessRunner),
            program.display().to_string(),
            paths,
        ))
    }

    /// Create a client with a custom runner (useful for testing).
    pub fn with_runner(
        runner: Arc<dyn CommandRunner>,
        program: impl Into<String>,
        paths: PoudrierePaths,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            paths,
        }
    }

    /// Configuration paths in use.
    pub fn paths(&self) -> &PoudrierePaths {
        &self.paths
    }

    /// `poudriere version` output.
    pub fn version(&self) -> Result<String> {
        Ok(self.run_checked(&["version"])?.trim().to_string())
    }

    // =========================================================================
    // Jails
    // =========================================================================

    /// Lines of `poudriere jails -l`, without the header and blank lines.
    pub fn list_jails(&self) -> Result<Vec<String>> {
        let stdout = self.run_checked(&["jails", "-l"])?;
        Ok(listing_lines(&stdout, "JAILNAME"))
    }

    /// Whether a jail named `name` exists.
    pub fn is_jail(&self, name: &str) -> Result<bool> {
        Ok(self
            .list_jails()?
            .iter()
            .any(|line| line.split_whitespace().next() == Some(name)))
    }

    /// Create a jail and make it pkgng aware.
    ///
    /// The main configuration file must exist; otherwise nothing runs.
    /// Once the jail exists, a make.conf failure is reported as
    /// [`Error::MakeConf`], which is not fatal.
    pub fn create_jail(&self, spec: &JailSpec) -> Result<()> {
        validate_name(&spec.name)?;
        self.require_config()?;

        self.run_checked(&[
            "jails",
            "-c",
            "-j",
            spec.name.as_str(),
            "-v",
            spec.version.as_str(),
            "-a",
            spec.arch.as_str(),
        ])?;
        log::info!("created jail {} ({} {})", spec.name, spec.version, spec.arch);

        self.make_pkgng_aware(&spec.name).map_err(|e| match e {
            Error::Io(source) => {
                let path = self.paths.make_conf(&spec.name);
                log::warn!("jail {} created without {}: {source}", spec.name, path.display());
                Error::MakeConf { path, source }
            }
            other => other,
        })?;
        Ok(())
    }

    /// Write `<config_dir>/<jail>-make.conf` enabling pkgng, creating the
    /// directory when needed.
    pub fn make_pkgng_aware(&self, jail: &str) -> Result<PathBuf> {
        validate_name(jail)?;
        let dir = &self.paths.config_dir;
        if !dir.is_dir() {
            fs::create_dir_all(dir)?;
            log::info!("created poudriere make file dir {}", dir.display());
        }
        let path = self.paths.make_conf(jail);
        fs::write(&path, "WITH_PKGNG=yes\n")?;
        log::debug!("wrote {}", path.display());
        Ok(path)
    }

    /// Delete a jail and its make.conf.
    pub fn delete_jail(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.run_checked(&["jail", "-d", "-j", name])?;
        log::info!("deleted jail {name}");

        let make_conf = self.paths.make_conf(name);
        match fs::remove_file(&make_conf) {
            Ok(()) => log::debug!("removed {}", make_conf.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                log::warn!("jail {name} deleted but {} remains: {source}", make_conf.display());
                return Err(Error::MakeConf {
                    path: make_conf,
                    source,
                });
            }
        }
        Ok(())
    }

    // =========================================================================
    // Ports trees and builds
    // =========================================================================

    /// Lines of `poudriere ports -l`, without the header and blank lines.
    pub fn list_ports(&self) -> Result<Vec<String>> {
        let stdout = self.run_checked(&["ports", "-l"])?;
        Ok(listing_lines(&stdout, "PORTSTREE"))
    }

    /// Fetch a new ports tree with `poudriere ports -c`.
    pub fn create_ports_tree(&self) -> Result<String> {
        self.require_config()?;
        let stdout = self.run_checked(&["ports", "-c"])?;
        log::info!("created ports tree");
        Ok(stdout)
    }

    /// Build every port listed in `pkg_file` inside `jail`.
    ///
    /// Returns poudriere's summary line (the one mentioning packages
    /// built). Without it the build is reported as failed, carrying the
    /// full output.
    pub fn bulk_build(&self, jail: &str, pkg_file: &Path, keep: bool) -> Result<String> {
        if !pkg_file.is_file() {
            return Err(Error::PackageListNotFound {
                path: pkg_file.to_path_buf(),
            });
        }
        if !self.is_jail(jail)? {
            return Err(Error::JailNotFound {
                name: jail.to_string(),
            });
        }

        let pkg_file = pkg_file.display().to_string();
        let mut args = vec!["bulk"];
        if keep {
            args.push("-k");
        }
        args.extend(["-f", pkg_file.as_str(), "-j", jail]);

        // The summary line matters, not the exit status.
        let output = self.run(&args)?;
        let stdout = output.stdout_str();
        if let Some(line) = stdout.lines().find(|l| l.contains(BULK_SUMMARY_MARKER)) {
            return Ok(line.trim().to_string());
        }
        Err(Error::BulkBuildFailed {
            output: format!("{stdout}{}", output.stderr_str()),
        })
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Parse `poudriere.conf` into key/value pairs.
    pub fn parse_config(&self) -> Result<BTreeMap<String, String>> {
        self.require_config()?;
        let content = fs::read_to_string(&self.paths.config_file)?;
        Ok(parse_config_str(&content))
    }

    fn require_config(&self) -> Result<()> {
        if self.paths.config_exists() {
            Ok(())
        } else {
            Err(Error::ConfigMissing {
                path: self.paths.config_file.clone(),
            })
        }
    }

    // =========================================================================
    // Running
    // =========================================================================

    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let inv = Invocation::new(&self.program).args(args.iter().copied());
        log::debug!("jailkit: {inv}");
        self.runner.run(&inv).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::PoudriereNotFound
            } else {
                Error::Io(e)
            }
        })
    }

    fn run_checked(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args)?;
        if !output.success {
            return Err(Error::CommandFailed {
                message: format!("poudriere {}", args.join(" ")),
                stderr: output.stderr_str().trim().to_string(),
            });
        }
        Ok(output.stdout_str())
    }
}

/// Non-blank lines of a listing, minus the header row starting with `header`.
fn listing_lines(stdout: &str, header: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| line.split_whitespace().next() != Some(header))
        .map(str::to_string)
        .collect()
}

/// `KEY=VALUE` lines; comments and lines without `=` are skipped, and one
/// layer of matching quotes is stripped from values.
fn parse_config_str(content: &str) -> BTreeMap<String, String> {
    let mut config = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        let value = ['"', '\'']
            .iter()
            .find_map(|q| value.strip_prefix(*q)?.strip_suffix(*q))
            .unwrap_or(value);
        config.insert(key.trim().to_string(), value.to_string());
    }
    config
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidName("name must not be empty".to_string()));
    }
    if name.contains(['/', '\0']) || name == "." || name == ".." || name.starts_with('-') {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}
