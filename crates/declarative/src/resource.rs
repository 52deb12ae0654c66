//! Resource trait for declarative reconciliation
//!
//! A Resource is something that can be probed for existence and
//! created or removed by exactly one mutating command. The engine
//! decides *whether* to mutate; the resource only knows *how*.

use crate::context::ApplyContext;
use crate::types::{MutationOutcome, ResourceState};
use anyhow::Result;
use std::fmt;

/// Core trait for reconcilable resources
///
/// # Example
///
/// ```ignore
/// use declarative::{Resource, ResourceState, MutationOutcome, ApplyContext};
///
/// #[derive(Debug)]
/// struct Marker { path: std::path::PathBuf }
///
/// impl Resource for Marker {
///     fn id(&self) -> String { self.path.display().to_string() }
///     fn description(&self) -> String { format!("Marker file {}", self.id()) }
///     fn resource_type(&self) -> &'static str { "marker" }
///     fn label(&self) -> &'static str { "Marker" }
///
///     fn current_state(&self) -> anyhow::Result<ResourceState> {
///         Ok(if self.path.exists() { ResourceState::present() } else { ResourceState::Absent })
///     }
///
///     fn create(&self, _ctx: &ApplyContext) -> anyhow::Result<MutationOutcome> {
///         std::fs::write(&self.path, "")?;
///         Ok(MutationOutcome::Applied)
///     }
///
///     fn remove(&self, _ctx: &ApplyContext) -> anyhow::Result<MutationOutcome> {
///         std::fs::remove_file(&self.path)?;
///         Ok(MutationOutcome::Applied)
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Name of the resource, unique within its type
    fn id(&self) -> String;

    /// Human-readable description of what this resource is
    fn description(&self) -> String;

    /// Resource type category, e.g. "postgres_database"
    fn resource_type(&self) -> &'static str;

    /// Capitalised noun used in result messages, e.g. "Database"
    fn label(&self) -> &'static str;

    /// Ordering weight within a plan.
    ///
    /// Lower values are created first and removed last.
    fn order(&self) -> u8 {
        0
    }

    /// Probe the current state.
    ///
    /// Errors propagate: a failed probe must never be read as "absent".
    fn current_state(&self) -> Result<ResourceState>;

    /// Issue the creating command.
    fn create(&self, ctx: &ApplyContext) -> Result<MutationOutcome>;

    /// Issue the removing command.
    fn remove(&self, ctx: &ApplyContext) -> Result<MutationOutcome>;
}

/// A resource whose attributes can be altered in place.
pub trait Updatable: Resource {
    /// Whether the verifiable attributes already match the desired ones.
    ///
    /// Only called when the resource exists.
    fn in_sync(&self) -> Result<bool>;

    /// Whether the update carries attributes that cannot be read back
    /// (e.g. a password) and so must be issued regardless of `in_sync`.
    fn has_unverifiable_changes(&self) -> bool {
        false
    }

    /// Issue the altering command.
    fn update(&self, ctx: &ApplyContext) -> Result<MutationOutcome>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;
