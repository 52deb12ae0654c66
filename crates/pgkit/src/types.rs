//! Core types for PostgreSQL resource management.

use crate::tabular::TabularRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Class of server object managed by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// A database
    Database,
    /// A role (user)
    Role,
}

impl ResourceKind {
    /// Segment count of one listing row, trailing separator included.
    pub fn column_count(&self) -> usize {
        match self {
            ResourceKind::Database => 6,
            ResourceKind::Role => 13,
        }
    }

    /// Listing field holding the object's name.
    pub fn identity_field(&self) -> &'static str {
        match self {
            ResourceKind::Database => "Name",
            ResourceKind::Role => "rolname",
        }
    }

    /// Query printing one row per object.
    ///
    /// The trailing NULL column makes every row end with the separator;
    /// the column count above depends on it.
    pub fn listing_query(&self) -> &'static str {
        match self {
            ResourceKind::Database => {
                "SELECT d.datname AS \"Name\", \
                 pg_catalog.pg_get_userbyid(d.datdba) AS \"Owner\", \
                 pg_catalog.pg_encoding_to_char(d.encoding) AS \"Encoding\", \
                 d.datcollate AS \"Collate\", \
                 d.datctype AS \"Ctype\", \
                 NULL AS \"_\" \
                 FROM pg_catalog.pg_database d ORDER BY 1"
            }
            ResourceKind::Role => {
                "SELECT rolname, rolsuper, rolinherit, rolcreaterole, rolcreatedb, \
                 rolcanlogin, rolreplication, rolconnlimit, rolpassword, rolvaliduntil, \
                 rolbypassrls, oid, NULL AS \"_\" \
                 FROM pg_catalog.pg_roles ORDER BY 1"
            }
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Database => write!(f, "database"),
            ResourceKind::Role => write!(f, "role"),
        }
    }
}

/// Desired attributes of a database. `None` means "do not specify".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSpec {
    /// Database name
    pub name: String,
    /// Owning role (`-O`)
    #[serde(default)]
    pub owner: Option<String>,
    /// Character set encoding (`-E`)
    #[serde(default)]
    pub encoding: Option<String>,
    /// Template database (`-T`); must exist
    #[serde(default)]
    pub template: Option<String>,
    /// Default tablespace (`-D`)
    #[serde(default)]
    pub tablespace: Option<String>,
    /// Locale (`-l`)
    #[serde(default)]
    pub locale: Option<String>,
    /// Collation order (`--lc-collate`)
    #[serde(default)]
    pub lc_collate: Option<String>,
    /// Character classification (`--lc-ctype`)
    #[serde(default)]
    pub lc_ctype: Option<String>,
}

impl DatabaseSpec {
    /// A database with no optional attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the owner.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Set the template.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Set the encoding.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }
}

/// Desired attributes of a role. `None` means "do not specify".
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    /// Role name
    pub name: String,
    /// May create databases
    #[serde(default)]
    pub createdb: Option<bool>,
    /// May create other roles
    #[serde(default)]
    pub createrole: Option<bool>,
    /// Superuser; `createuser` is the old keyword for the same privilege
    #[serde(default, alias = "createuser")]
    pub superuser: Option<bool>,
    /// Store the password hashed (`ENCRYPTED PASSWORD`)
    #[serde(default)]
    pub encrypted: bool,
    /// Password; never read back from the server
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for RoleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleSpec")
            .field("name", &self.name)
            .field("createdb", &self.createdb)
            .field("createrole", &self.createrole)
            .field("superuser", &self.superuser)
            .field("encrypted", &self.encrypted)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl RoleSpec {
    /// A role with no optional attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the createdb privilege.
    pub fn with_createdb(mut self, allowed: bool) -> Self {
        self.createdb = Some(allowed);
        self
    }

    /// Set the createrole privilege.
    pub fn with_createrole(mut self, allowed: bool) -> Self {
        self.createrole = Some(allowed);
        self
    }

    /// Set the superuser privilege.
    pub fn with_superuser(mut self, superuser: bool) -> Self {
        self.superuser = Some(superuser);
        self
    }

    /// Set the password.
    pub fn with_password(mut self, password: impl Into<String>, encrypted: bool) -> Self {
        self.password = Some(password.into());
        self.encrypted = encrypted;
        self
    }

    /// Whether a `pg_roles` record agrees with every specified privilege.
    ///
    /// The password cannot be read back and is not compared.
    pub fn matches(&self, record: &TabularRecord) -> bool {
        let agrees = |wanted: Option<bool>, field: &str| match wanted {
            None => true,
            Some(w) => record.get_bool(field) == Some(w),
        };
        agrees(self.createdb, "rolcreatedb")
            && agrees(self.createrole, "rolcreaterole")
            && agrees(self.superuser, "rolsuper")
    }

    /// Whether any attribute is set at all.
    pub fn has_attributes(&self) -> bool {
        self.createdb.is_some()
            || self.createrole.is_some()
            || self.superuser.is_some()
            || self.password.is_some()
    }
}

/// A server object together with its desired attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceDescriptor {
    /// A database
    Database(DatabaseSpec),
    /// A role
    Role(RoleSpec),
}

impl ResourceDescriptor {
    /// Object name.
    pub fn name(&self) -> &str {
        match self {
            ResourceDescriptor::Database(spec) => &spec.name,
            ResourceDescriptor::Role(spec) => &spec.name,
        }
    }

    /// Object class.
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceDescriptor::Database(_) => ResourceKind::Database,
            ResourceDescriptor::Role(_) => ResourceKind::Role,
        }
    }
}

/// Options for dropping an object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropOptions {
    /// Terminate open sessions on the database before dropping it
    #[serde(default)]
    pub force: bool,
}

/// Paths of the client programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    /// `psql`
    pub psql: String,
    /// `createdb`
    pub createdb: String,
    /// `dropdb`
    pub dropdb: String,
    /// `dropuser`
    pub dropuser: String,
}

impl Default for Tools {
    /// Bare program names, resolved through PATH at spawn time.
    fn default() -> Self {
        Self {
            psql: "psql".to_string(),
            createdb: "createdb".to_string(),
            dropdb: "dropdb".to_string(),
            dropuser: "dropuser".to_string(),
        }
    }
}

impl Tools {
    /// Locate `psql` in PATH and take its siblings from the same directory.
    pub fn discover() -> crate::Result<Self> {
        let psql = which::which("psql").map_err(|_| crate::Error::ToolNotFound {
            tool: "psql".to_string(),
        })?;
        let dir = psql.parent().map(Path::to_path_buf).unwrap_or_default();
        let sibling = |name: &str| -> String {
            let candidate: PathBuf = dir.join(name);
            if candidate.exists() {
                candidate.display().to_string()
            } else {
                name.to_string()
            }
        };

        Ok(Self {
            psql: psql.display().to_string(),
            createdb: sibling("createdb"),
            dropdb: sibling("dropdb"),
            dropuser: sibling("dropuser"),
        })
    }
}
