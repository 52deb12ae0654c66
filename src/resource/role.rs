//! PostgreSQL role (user) resource

use anyhow::Result;
use declarative::{ApplyContext, MutationOutcome, Resource, ResourceState, Updatable};
use pgkit::{Client, DropOptions, ResourceDescriptor, ResourceKind, RoleSpec};

use super::{ORDER_ROLE, pg_outcome};

/// A login role on one server
#[derive(Debug, Clone)]
pub struct PostgresRole {
    client: Client,
    spec: RoleSpec,
}

impl PostgresRole {
    pub fn new(client: Client, spec: RoleSpec) -> Self {
        Self { client, spec }
    }
}

impl Resource for PostgresRole {
    fn id(&self) -> String {
        self.spec.name.clone()
    }

    fn description(&self) -> String {
        format!("role {}", self.spec.name)
    }

    fn resource_type(&self) -> &'static str {
        "postgres_role"
    }

    fn label(&self) -> &'static str {
        "User"
    }

    fn order(&self) -> u8 {
        ORDER_ROLE
    }

    fn current_state(&self) -> Result<ResourceState> {
        let record = self.client.find(ResourceKind::Role, &self.spec.name)?;
        Ok(match record {
            Some(record) => {
                let mut privileges = Vec::new();
                if record.get_bool("rolsuper") == Some(true) {
                    privileges.push("superuser");
                }
                if record.get_bool("rolcreatedb") == Some(true) {
                    privileges.push("createdb");
                }
                if record.get_bool("rolcreaterole") == Some(true) {
                    privileges.push("createrole");
                }
                ResourceState::Present {
                    details: (!privileges.is_empty()).then(|| privileges.join(", ")),
                }
            }
            None => ResourceState::Absent,
        })
    }

    fn create(&self, _ctx: &ApplyContext) -> Result<MutationOutcome> {
        let descriptor = ResourceDescriptor::Role(self.spec.clone());
        pg_outcome(self.client.create(&descriptor))
    }

    fn remove(&self, _ctx: &ApplyContext) -> Result<MutationOutcome> {
        pg_outcome(
            self.client
                .drop(ResourceKind::Role, &self.spec.name, DropOptions::default()),
        )
    }
}

impl Updatable for PostgresRole {
    fn in_sync(&self) -> Result<bool> {
        let record = self.client.find(ResourceKind::Role, &self.spec.name)?;
        Ok(record.is_some_and(|r| self.spec.matches(&r)))
    }

    // Passwords cannot be read back.
    fn has_unverifiable_changes(&self) -> bool {
        self.spec.password.is_some()
    }

    fn update(&self, _ctx: &ApplyContext) -> Result<MutationOutcome> {
        pg_outcome(self.client.update_role(&self.spec))
    }
}
