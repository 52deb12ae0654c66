//! Manifest files: the desired state of a whole host in one TOML document
//!
//! ```toml
//! [connection]
//! host = "db.internal"
//!
//! [[role]]
//! name = "app"
//! createdb = true
//!
//! [[database]]
//! name = "app"
//! owner = "app"
//!
//! [[jail]]
//! name = "90amd64"
//! arch = "amd64"
//! ensure = "absent"
//! ```

use anyhow::{Context, Result};
use declarative::{Ensure, ExecutionPlan};
use jailkit::{JailSpec, Poudriere};
use pgkit::{DatabaseSpec, ExplicitParams, RoleSpec};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::resource::{PoudriereJail, PostgresDatabase, PostgresRole};

/// Problems found in an otherwise well-formed manifest.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("{kind} entry with an empty name")]
    EmptyName { kind: &'static str },

    #[error("{kind} {name} is declared more than once")]
    Duplicate { kind: &'static str, name: String },

    #[error("jail {name} needs an arch to be created")]
    MissingArch { name: String },

    #[error("manifest declares {kind} entries but no {backend} client is available")]
    MissingBackend {
        kind: &'static str,
        backend: &'static str,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Connection parameters; command-line values take precedence
    #[serde(default)]
    pub connection: ExplicitParams,
    #[serde(default, rename = "database")]
    pub databases: Vec<DatabaseEntry>,
    #[serde(default, rename = "role")]
    pub roles: Vec<RoleEntry>,
    #[serde(default, rename = "jail")]
    pub jails: Vec<JailEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseEntry {
    #[serde(flatten)]
    pub spec: DatabaseSpec,
    #[serde(default)]
    pub ensure: Ensure,
    /// Terminate other sessions before dropping
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleEntry {
    #[serde(flatten)]
    pub spec: RoleSpec,
    #[serde(default)]
    pub ensure: Ensure,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JailEntry {
    pub name: String,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub ensure: Ensure,
}

/// Clients the plan's resources talk through.
#[derive(Debug, Clone, Default)]
pub struct Backends {
    pub postgres: Option<pgkit::Client>,
    pub poudriere: Option<Poudriere>,
}

impl Manifest {
    /// Load and validate a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest {}", path.display()))?;
        let manifest: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid manifest {}", path.display()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check names and required attributes.
    pub fn validate(&self) -> std::result::Result<(), ManifestError> {
        check_names("database", self.databases.iter().map(|d| d.spec.name.as_str()))?;
        check_names("role", self.roles.iter().map(|r| r.spec.name.as_str()))?;
        check_names("jail", self.jails.iter().map(|j| j.name.as_str()))?;

        for jail in &self.jails {
            if jail.ensure == Ensure::Present && jail.arch.as_deref().is_none_or(str::is_empty) {
                return Err(ManifestError::MissingArch {
                    name: jail.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Whether any entry needs a PostgreSQL client.
    pub fn needs_postgres(&self) -> bool {
        !self.databases.is_empty() || !self.roles.is_empty()
    }

    /// Whether any entry needs poudriere.
    pub fn needs_poudriere(&self) -> bool {
        !self.jails.is_empty()
    }

    /// Turn every entry into a plan entry, in declaration order.
    pub fn plan(&self, backends: &Backends) -> std::result::Result<ExecutionPlan, ManifestError> {
        let mut plan = ExecutionPlan::new();

        if self.needs_postgres() {
            let client = backends
                .postgres
                .as_ref()
                .ok_or(ManifestError::MissingBackend {
                    kind: "database/role",
                    backend: "PostgreSQL",
                })?;
            for role in &self.roles {
                plan.push(
                    Box::new(PostgresRole::new(client.clone(), role.spec.clone())),
                    role.ensure,
                );
            }
            for db in &self.databases {
                plan.push(
                    Box::new(
                        PostgresDatabase::new(client.clone(), db.spec.clone()).with_force(db.force),
                    ),
                    db.ensure,
                );
            }
        }

        if self.needs_poudriere() {
            let client = backends
                .poudriere
                .as_ref()
                .ok_or(ManifestError::MissingBackend {
                    kind: "jail",
                    backend: "poudriere",
                })?;
            for jail in &self.jails {
                let mut spec = JailSpec::new(&jail.name, jail.arch.clone().unwrap_or_default());
                if let Some(version) = jail.version.as_deref().filter(|v| !v.is_empty()) {
                    spec = spec.with_version(version);
                }
                plan.push(
                    Box::new(PoudriereJail::new(client.clone(), spec)),
                    jail.ensure,
                );
            }
        }

        Ok(plan)
    }
}

fn check_names<'a>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> std::result::Result<(), ManifestError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            return Err(ManifestError::EmptyName { kind });
        }
        if !seen.insert(name) {
            return Err(ManifestError::Duplicate {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}
