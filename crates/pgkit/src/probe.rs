//! Read-only queries against the server catalogs.

use crate::error::Result;
use crate::tabular::{self, TabularRecord};
use crate::types::ResourceKind;
use crate::Client;

impl Client {
    /// List every object of `kind` as parsed records.
    ///
    /// A command that cannot run or exits non-zero is an error, never an
    /// empty listing.
    pub fn list(&self, kind: ResourceKind) -> Result<Vec<TabularRecord>> {
        let inv = self.psql(kind.listing_query());
        let stdout = self.run_checked(&inv, None)?;
        let records = tabular::parse(&stdout, kind.column_count());
        log::debug!("pgkit: {} {kind} record(s)", records.len());
        Ok(records)
    }

    /// List databases.
    pub fn list_databases(&self) -> Result<Vec<TabularRecord>> {
        self.list(ResourceKind::Database)
    }

    /// List roles.
    pub fn list_roles(&self) -> Result<Vec<TabularRecord>> {
        self.list(ResourceKind::Role)
    }

    /// The record whose identity field equals `name` exactly.
    pub fn find(&self, kind: ResourceKind, name: &str) -> Result<Option<TabularRecord>> {
        let field = kind.identity_field();
        Ok(self
            .list(kind)?
            .into_iter()
            .find(|record| record.get(field) == Some(name)))
    }

    /// Whether an object of `kind` named `name` exists. Case-sensitive.
    pub fn exists(&self, kind: ResourceKind, name: &str) -> Result<bool> {
        Ok(self.find(kind, name)?.is_some())
    }

    /// Whether a database named `name` exists.
    pub fn database_exists(&self, name: &str) -> Result<bool> {
        self.exists(ResourceKind::Database, name)
    }

    /// Whether a role named `name` exists.
    pub fn role_exists(&self, name: &str) -> Result<bool> {
        self.exists(ResourceKind::Role, name)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::FakeServer;
    use crate::{ErrorCategory, ResourceKind};

    #[test]
    fn test_list_databases() {
        let server = FakeServer::new().with_database("app", "bob");
        let records = server.client().list_databases().unwrap();

        let names: Vec<_> = records.iter().filter_map(|r| r.get("Name")).collect();
        assert_eq!(names, vec!["app", "postgres", "template0", "template1"]);
        let app = &records[0];
        assert_eq!(app.get("Owner"), Some("bob"));
        assert_eq!(app.get("Encoding"), Some("UTF8"));
    }

    #[test]
    fn test_list_roles() {
        let server = FakeServer::new().with_role("bob", true, false);
        let roles = server.client().list_roles().unwrap();
        let bob = roles.iter().find(|r| r.get("rolname") == Some("bob")).unwrap();
        assert_eq!(bob.get_bool("rolcreatedb"), Some(true));
        assert_eq!(bob.get_bool("rolcreaterole"), Some(false));
        assert_eq!(bob.len(), 12);
    }

    #[test]
    fn test_exists_is_case_sensitive() {
        let server = FakeServer::new().with_database("App", "postgres");
        let client = server.client();
        assert!(client.database_exists("App").unwrap());
        assert!(!client.database_exists("app").unwrap());
    }

    #[test]
    fn test_exists_never_substring() {
        let server = FakeServer::new().with_database("application", "postgres");
        assert!(!server.client().database_exists("app").unwrap());
    }

    #[test]
    fn test_probe_failure_is_error_not_absent() {
        let server = FakeServer::new();
        server.set_unreachable(true);
        let err = server.client().exists(ResourceKind::Database, "app").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Connection);
    }

    #[test]
    fn test_find_returns_record() {
        let server = FakeServer::new().with_role("carol", false, true);
        let record = server
            .client()
            .find(ResourceKind::Role, "carol")
            .unwrap()
            .unwrap();
        assert_eq!(record.get("rolcreaterole"), Some("t"));
        assert!(matches!(
            server.client().find(ResourceKind::Role, "dave"),
            Ok(None)
        ));
    }

    #[test]
    fn test_listing_uses_unaligned_output() {
        let server = FakeServer::new();
        server.client().list_databases().unwrap();
        let calls = server.calls();
        let inv = &calls[0];
        assert!(inv.has_arg("-A"));
        assert_eq!(inv.arg_after("-F"), Some("|"));
        assert_eq!(inv.arg_after("-d"), Some("postgres"));
    }
}
