//! # Declarative
//!
//! A framework for declarative resource reconciliation.
//!
//! This crate provides the core abstractions for declaring a desired end
//! state, probing the current state, and converging the two with at most
//! one mutating command per resource plus a verifying probe.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something that can be probed, created and removed
//! - **Engine**: The present/absent state machine ([`present`], [`absent`], [`update`])
//! - **ReconcileResult**: What changed, whether it worked, and why
//! - **ExecutionPlan**: An ordered list of resources with their desired state
//! - **CommandRunner**: The collaborator that actually spawns external tools
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{present, ApplyContext, Resource};
//!
//! let database = /* any Resource implementation */;
//! let result = present(&database, &ApplyContext::live())?;
//! println!("{}: {}", result.name, result.comment);
//! ```
//!
//! ## Guarantees
//!
//! - A failed probe is an error, never "absent".
//! - Dry runs never call [`Resource::create`] or [`Resource::remove`].
//! - Success is only reported when the post-mutation probe agrees.
//! - Nothing is retried.

pub mod command;
pub mod context;
pub mod diff;
pub mod engine;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use command::{CommandOutput, CommandRunner, Invocation, ProcessRunner};
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use diff::{DiffSummary, ResourceDiff, compute_diffs, group_by_type};
pub use engine::{absent, present, reconcile, update};
pub use executor::{ExecuteReport, execute, execute_simple};
pub use planner::{ExecutionPlan, PlanEntry};
pub use resource::{BoxedResource, Resource, Updatable};
pub use types::{
    Ensure, ExecuteOptions, ExecuteSummary, MutationOutcome, Outcome, ReconcileResult,
    ResourceState,
};
