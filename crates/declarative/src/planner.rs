//! Execution planner - orders resources for reconciliation

use crate::resource::{BoxedResource, Resource};
use crate::types::Ensure;

/// One resource together with its desired end state
#[derive(Debug)]
pub struct PlanEntry {
    pub resource: BoxedResource,
    pub ensure: Ensure,
}

/// An ordered list of resources to reconcile
///
/// Entries to create run first, lowest [`Resource::order`] first; entries
/// to remove run afterwards, highest order first. A database owned by a
/// role is therefore created after the role and removed before it.
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    entries: Vec<PlanEntry>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a resource with its desired end state
    pub fn push(&mut self, resource: BoxedResource, ensure: Ensure) {
        self.entries.push(PlanEntry { resource, ensure });
    }

    /// Entries in execution order
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Sort entries into execution order (stable within equal weights)
    pub fn ordered(mut self) -> Self {
        self.entries.sort_by_key(|e| match e.ensure {
            Ensure::Present => (0u8, e.resource.order()),
            Ensure::Absent => (1u8, u8::MAX - e.resource.order()),
        });
        self
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        Self {
            entries: self
                .entries
                .into_iter()
                .filter(|e| predicate(e.resource.as_ref()))
                .collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|r| matches_filter(r, &resource_type, name.as_deref()))
            }
        }
    }

    /// Total number of resources in the plan
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the plan, yielding its entries
    pub fn into_entries(self) -> Vec<PlanEntry> {
        self.entries
    }
}

/// Parse a target string like "type.name" into (type, name)
///
/// Only the first dot separates; names may contain dots themselves.
fn parse_target(target: &str) -> (String, Option<String>) {
    match target.split_once('.') {
        Some((kind, name)) => (kind.to_string(), Some(name.to_string())),
        None => (target.to_string(), None),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(resource: &dyn Resource, resource_type: &str, name: Option<&str>) -> bool {
    // Allow common aliases
    let matches_type = match resource_type {
        "db" | "database" | "databases" => resource.resource_type() == "postgres_database",
        "role" | "roles" | "user" | "users" => resource.resource_type() == "postgres_role",
        "jail" | "jails" => resource.resource_type() == "poudriere_jail",
        rt => resource.resource_type() == rt,
    };
    if !matches_type {
        return false;
    }

    match name {
        Some(n) => resource.id() == n,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ApplyContext;
    use crate::types::{MutationOutcome, ResourceState};
    use anyhow::Result;

    #[derive(Debug)]
    struct Weighted {
        name: &'static str,
        kind: &'static str,
        order: u8,
    }

    impl Resource for Weighted {
        fn id(&self) -> String {
            self.name.to_string()
        }
        fn description(&self) -> String {
            self.name.to_string()
        }
        fn resource_type(&self) -> &'static str {
            self.kind
        }
        fn label(&self) -> &'static str {
            "Weighted"
        }
        fn order(&self) -> u8 {
            self.order
        }
        fn current_state(&self) -> Result<ResourceState> {
            Ok(ResourceState::Absent)
        }
        fn create(&self, _ctx: &ApplyContext) -> Result<MutationOutcome> {
            Ok(MutationOutcome::Applied)
        }
        fn remove(&self, _ctx: &ApplyContext) -> Result<MutationOutcome> {
            Ok(MutationOutcome::Applied)
        }
    }

    fn entry(name: &'static str, kind: &'static str, order: u8) -> BoxedResource {
        Box::new(Weighted { name, kind, order })
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("db"), ("db".to_string(), None));
        assert_eq!(
            parse_target("db.alpha"),
            ("db".to_string(), Some("alpha".to_string()))
        );
        assert_eq!(
            parse_target("db.a.b"),
            ("db".to_string(), Some("a.b".to_string()))
        );
    }

    #[test]
    fn test_ordered_creates_owners_first_and_removes_them_last() {
        let mut plan = ExecutionPlan::new();
        plan.push(entry("old_db", "postgres_database", 2), Ensure::Absent);
        plan.push(entry("app_db", "postgres_database", 2), Ensure::Present);
        plan.push(entry("old_role", "postgres_role", 1), Ensure::Absent);
        plan.push(entry("app_role", "postgres_role", 1), Ensure::Present);

        let ids: Vec<String> = plan
            .ordered()
            .entries()
            .iter()
            .map(|e| e.resource.id())
            .collect();
        assert_eq!(ids, vec!["app_role", "app_db", "old_db", "old_role"]);
    }

    #[test]
    fn test_filter_by_target() {
        let mut plan = ExecutionPlan::new();
        plan.push(entry("alpha", "postgres_database", 2), Ensure::Present);
        plan.push(entry("beta", "postgres_database", 2), Ensure::Present);
        plan.push(entry("bob", "postgres_role", 1), Ensure::Present);

        let dbs = ExecutionPlan::filter_by_target(plan, Some("db"));
        assert_eq!(dbs.len(), 2);

        let one = dbs.filter_by_target(Some("database.beta"));
        assert_eq!(one.len(), 1);
        assert_eq!(one.entries()[0].resource.id(), "beta");
    }
}
