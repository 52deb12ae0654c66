//! PostgreSQL database resource

use anyhow::Result;
use declarative::{ApplyContext, MutationOutcome, Resource, ResourceState};
use pgkit::{Client, DatabaseSpec, DropOptions, ResourceDescriptor, ResourceKind};

use super::{ORDER_DATABASE, pg_outcome};

/// A database on one server
#[derive(Debug, Clone)]
pub struct PostgresDatabase {
    client: Client,
    spec: DatabaseSpec,
    drop: DropOptions,
}

impl PostgresDatabase {
    pub fn new(client: Client, spec: DatabaseSpec) -> Self {
        Self {
            client,
            spec,
            drop: DropOptions::default(),
        }
    }

    /// Terminate other sessions before dropping.
    pub fn with_force(mut self, force: bool) -> Self {
        self.drop.force = force;
        self
    }
}

impl Resource for PostgresDatabase {
    fn id(&self) -> String {
        self.spec.name.clone()
    }

    fn description(&self) -> String {
        match &self.spec.owner {
            Some(owner) => format!("database {} (owner {owner})", self.spec.name),
            None => format!("database {}", self.spec.name),
        }
    }

    fn resource_type(&self) -> &'static str {
        "postgres_database"
    }

    fn label(&self) -> &'static str {
        "Database"
    }

    fn order(&self) -> u8 {
        ORDER_DATABASE
    }

    fn current_state(&self) -> Result<ResourceState> {
        let record = self.client.find(ResourceKind::Database, &self.spec.name)?;
        Ok(match record {
            Some(record) => ResourceState::Present {
                details: record.get("Owner").map(|o| format!("owner {o}")),
            },
            None => ResourceState::Absent,
        })
    }

    fn create(&self, _ctx: &ApplyContext) -> Result<MutationOutcome> {
        let descriptor = ResourceDescriptor::Database(self.spec.clone());
        pg_outcome(self.client.create(&descriptor))
    }

    fn remove(&self, _ctx: &ApplyContext) -> Result<MutationOutcome> {
        pg_outcome(
            self.client
                .drop(ResourceKind::Database, &self.spec.name, self.drop),
        )
    }
}
