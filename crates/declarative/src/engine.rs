//! Reconciliation engine - the present/absent state machine
//!
//! Every call starts from a fresh probe, issues at most one mutation,
//! and re-probes to verify the mutation took effect before reporting
//! success. Nothing is cached between calls.

use crate::context::ApplyContext;
use crate::resource::{Resource, Updatable};
use crate::types::{Ensure, MutationOutcome, Outcome, ReconcileResult};
use anyhow::Result;

/// Bring a resource to the desired end state.
pub fn reconcile(
    resource: &dyn Resource,
    ensure: Ensure,
    ctx: &ApplyContext,
) -> Result<ReconcileResult> {
    match ensure {
        Ensure::Present => present(resource, ctx),
        Ensure::Absent => absent(resource, ctx),
    }
}

/// Ensure the resource exists.
pub fn present(resource: &dyn Resource, ctx: &ApplyContext) -> Result<ReconcileResult> {
    let name = resource.id();
    let label = resource.label();
    let noun = label.to_lowercase();

    if resource.current_state()?.is_present() {
        return Ok(finish(
            resource,
            false,
            Outcome::Succeeded,
            format!("{label} {name} is already present"),
        ));
    }

    if ctx.dry_run {
        return Ok(finish(
            resource,
            false,
            Outcome::Pending,
            format!("{label} {name} is set to be created"),
        ));
    }

    let detail = match resource.create(ctx)? {
        MutationOutcome::Refused { reason } => {
            log::info!("refusing to create {noun} {name}: {reason}");
            return Ok(finish(
                resource,
                false,
                Outcome::Failed,
                format!("Failed to create {noun} {name}: {reason}"),
            ));
        }
        MutationOutcome::CommandFailed { message } => Some(message),
        MutationOutcome::Applied => None,
    };

    if resource.current_state()?.is_present() {
        if let Some(message) = &detail {
            log::warn!("{noun} {name} exists although the create command failed: {message}");
        }
        log::info!("created {noun} {name}");
        Ok(finish(
            resource,
            true,
            Outcome::Succeeded,
            format!("The {noun} {name} has been created"),
        ))
    } else {
        log::info!("{noun} {name} still absent after create");
        Ok(finish(
            resource,
            false,
            Outcome::Failed,
            with_detail(format!("Failed to create {noun} {name}"), detail),
        ))
    }
}

/// Ensure the resource does not exist.
pub fn absent(resource: &dyn Resource, ctx: &ApplyContext) -> Result<ReconcileResult> {
    let name = resource.id();
    let label = resource.label();
    let noun = label.to_lowercase();

    if resource.current_state()?.is_absent() {
        return Ok(finish(
            resource,
            false,
            Outcome::Succeeded,
            format!("{label} {name} is not present, so it cannot be removed"),
        ));
    }

    if ctx.dry_run {
        return Ok(finish(
            resource,
            false,
            Outcome::Pending,
            format!("{label} {name} is set to be removed"),
        ));
    }

    let detail = match resource.remove(ctx)? {
        MutationOutcome::Refused { reason } => {
            log::info!("refusing to remove {noun} {name}: {reason}");
            return Ok(finish(
                resource,
                false,
                Outcome::Failed,
                format!("Failed to remove {noun} {name}: {reason}"),
            ));
        }
        MutationOutcome::CommandFailed { message } => Some(message),
        MutationOutcome::Applied => None,
    };

    if resource.current_state()?.is_absent() {
        log::info!("removed {noun} {name}");
        Ok(finish(
            resource,
            true,
            Outcome::Succeeded,
            format!("{label} {name} has been removed"),
        ))
    } else {
        log::info!("{noun} {name} still present after remove");
        Ok(finish(
            resource,
            false,
            Outcome::Failed,
            with_detail(format!("Failed to remove {noun} {name}"), detail),
        ))
    }
}

/// Alter an existing resource's attributes, verifying them afterwards.
pub fn update(resource: &dyn Updatable, ctx: &ApplyContext) -> Result<ReconcileResult> {
    let name = resource.id();
    let label = resource.label();
    let noun = label.to_lowercase();

    if resource.current_state()?.is_absent() {
        return Ok(finish(
            resource,
            false,
            Outcome::Failed,
            format!("{label} {name} is not present, so it cannot be updated"),
        ));
    }

    if !resource.has_unverifiable_changes() && resource.in_sync()? {
        return Ok(finish(
            resource,
            false,
            Outcome::Succeeded,
            format!("{label} {name} is already in the desired state"),
        ));
    }

    if ctx.dry_run {
        return Ok(finish(
            resource,
            false,
            Outcome::Pending,
            format!("{label} {name} is set to be updated"),
        ));
    }

    let detail = match resource.update(ctx)? {
        MutationOutcome::Refused { reason } => {
            return Ok(finish(
                resource,
                false,
                Outcome::Failed,
                format!("Failed to update {noun} {name}: {reason}"),
            ));
        }
        MutationOutcome::CommandFailed { message } => Some(message),
        MutationOutcome::Applied => None,
    };

    // A failed ALTER may leave verifiable attributes matching by accident;
    // the command's own verdict has to agree too.
    if detail.is_none() && resource.in_sync()? {
        log::info!("updated {noun} {name}");
        Ok(finish(
            resource,
            true,
            Outcome::Succeeded,
            format!("{label} {name} has been updated"),
        ))
    } else {
        Ok(finish(
            resource,
            false,
            Outcome::Failed,
            with_detail(format!("Failed to update {noun} {name}"), detail),
        ))
    }
}

fn finish(
    resource: &dyn Resource,
    changed: bool,
    outcome: Outcome,
    comment: String,
) -> ReconcileResult {
    ReconcileResult {
        name: resource.id(),
        resource_type: resource.resource_type().to_string(),
        changed,
        outcome,
        comment,
    }
}

fn with_detail(comment: String, detail: Option<String>) -> String {
    match detail {
        Some(d) if !d.trim().is_empty() => format!("{comment}: {}", d.trim()),
        _ => comment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceState;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory resource whose mutations may or may not take effect.
    #[derive(Debug)]
    struct Mock {
        exists: Mutex<bool>,
        synced: Mutex<bool>,
        takes_effect: bool,
        refuse: Option<String>,
        probe_fails: bool,
        mutations: AtomicUsize,
    }

    impl Mock {
        fn new(exists: bool) -> Self {
            Self {
                exists: Mutex::new(exists),
                synced: Mutex::new(false),
                takes_effect: true,
                refuse: None,
                probe_fails: false,
                mutations: AtomicUsize::new(0),
            }
        }

        fn broken(exists: bool) -> Self {
            Self {
                takes_effect: false,
                ..Self::new(exists)
            }
        }

        fn mutations(&self) -> usize {
            self.mutations.load(Ordering::SeqCst)
        }

        fn mutate(&self, target: bool) -> MutationOutcome {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            if let Some(reason) = &self.refuse {
                return MutationOutcome::Refused {
                    reason: reason.clone(),
                };
            }
            if self.takes_effect {
                *self.exists.lock().unwrap() = target;
                MutationOutcome::Applied
            } else {
                MutationOutcome::CommandFailed {
                    message: "permission denied".into(),
                }
            }
        }
    }

    impl Resource for Mock {
        fn id(&self) -> String {
            "alpha".into()
        }

        fn description(&self) -> String {
            "Mock alpha".into()
        }

        fn resource_type(&self) -> &'static str {
            "mock"
        }

        fn label(&self) -> &'static str {
            "Database"
        }

        fn current_state(&self) -> Result<ResourceState> {
            if self.probe_fails {
                anyhow::bail!("listing failed");
            }
            if *self.exists.lock().unwrap() {
                Ok(ResourceState::present())
            } else {
                Ok(ResourceState::Absent)
            }
        }

        fn create(&self, _ctx: &ApplyContext) -> Result<MutationOutcome> {
            Ok(self.mutate(true))
        }

        fn remove(&self, _ctx: &ApplyContext) -> Result<MutationOutcome> {
            Ok(self.mutate(false))
        }
    }

    impl Updatable for Mock {
        fn in_sync(&self) -> Result<bool> {
            Ok(*self.synced.lock().unwrap())
        }

        fn update(&self, _ctx: &ApplyContext) -> Result<MutationOutcome> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            if self.takes_effect {
                *self.synced.lock().unwrap() = true;
                Ok(MutationOutcome::Applied)
            } else {
                Ok(MutationOutcome::CommandFailed {
                    message: String::new(),
                })
            }
        }
    }

    #[test]
    fn test_present_is_idempotent() {
        let mock = Mock::new(false);
        let ctx = ApplyContext::live();

        let first = present(&mock, &ctx).unwrap();
        assert!(first.changed);
        assert_eq!(first.outcome, Outcome::Succeeded);
        assert_eq!(first.comment, "The database alpha has been created");

        let second = present(&mock, &ctx).unwrap();
        assert!(!second.changed);
        assert_eq!(second.outcome, Outcome::Succeeded);
        assert_eq!(second.comment, "Database alpha is already present");
        assert_eq!(mock.mutations(), 1);
    }

    #[test]
    fn test_present_dry_run_never_mutates() {
        let mock = Mock::new(false);
        let result = present(&mock, &ApplyContext::dry_run()).unwrap();

        assert_eq!(result.outcome, Outcome::Pending);
        assert_eq!(result.outcome.as_option(), None);
        assert!(!result.changed);
        assert_eq!(result.comment, "Database alpha is set to be created");
        assert_eq!(mock.mutations(), 0);
    }

    #[test]
    fn test_present_verification_mismatch() {
        let mock = Mock::broken(false);
        let result = present(&mock, &ApplyContext::live()).unwrap();

        assert!(!result.changed);
        assert_eq!(result.outcome, Outcome::Failed);
        assert_eq!(
            result.comment,
            "Failed to create database alpha: permission denied"
        );
    }

    #[test]
    fn test_present_refused() {
        let mock = Mock {
            refuse: Some("template tpl does not exist".into()),
            ..Mock::new(false)
        };
        let result = present(&mock, &ApplyContext::live()).unwrap();

        assert_eq!(result.outcome, Outcome::Failed);
        assert!(result.comment.contains("template tpl does not exist"));
    }

    #[test]
    fn test_absent_on_absent() {
        let mock = Mock::new(false);
        let result = absent(&mock, &ApplyContext::live()).unwrap();

        assert!(!result.changed);
        assert_eq!(result.outcome, Outcome::Succeeded);
        assert_eq!(
            result.comment,
            "Database alpha is not present, so it cannot be removed"
        );
        assert_eq!(mock.mutations(), 0);
    }

    #[test]
    fn test_absent_removes_and_verifies() {
        let mock = Mock::new(true);
        let result = absent(&mock, &ApplyContext::live()).unwrap();

        assert!(result.changed);
        assert_eq!(result.outcome, Outcome::Succeeded);
        assert_eq!(result.comment, "Database alpha has been removed");
    }

    #[test]
    fn test_absent_dry_run_is_pending() {
        let mock = Mock::new(true);
        let result = absent(&mock, &ApplyContext::dry_run()).unwrap();

        assert_eq!(result.outcome, Outcome::Pending);
        assert_eq!(result.comment, "Database alpha is set to be removed");
        assert_eq!(mock.mutations(), 0);
    }

    #[test]
    fn test_absent_verification_mismatch() {
        let mock = Mock::broken(true);
        let result = absent(&mock, &ApplyContext::live()).unwrap();

        assert!(!result.changed);
        assert_eq!(result.outcome, Outcome::Failed);
        assert!(result.comment.starts_with("Failed to remove database alpha"));
    }

    #[test]
    fn test_probe_failure_propagates() {
        let mock = Mock {
            probe_fails: true,
            ..Mock::new(false)
        };
        assert!(present(&mock, &ApplyContext::live()).is_err());
        assert!(absent(&mock, &ApplyContext::live()).is_err());
        assert_eq!(mock.mutations(), 0);
    }

    #[test]
    fn test_update_requires_existing_resource() {
        let mock = Mock::new(false);
        let result = update(&mock, &ApplyContext::live()).unwrap();

        assert_eq!(result.outcome, Outcome::Failed);
        assert_eq!(
            result.comment,
            "Database alpha is not present, so it cannot be updated"
        );
        assert_eq!(mock.mutations(), 0);
    }

    #[test]
    fn test_update_is_idempotent() {
        let mock = Mock::new(true);
        let ctx = ApplyContext::live();

        let first = update(&mock, &ctx).unwrap();
        assert!(first.changed);
        assert_eq!(first.outcome, Outcome::Succeeded);

        let second = update(&mock, &ctx).unwrap();
        assert!(!second.changed);
        assert_eq!(second.outcome, Outcome::Succeeded);
        assert_eq!(mock.mutations(), 1);
    }

    #[test]
    fn test_update_failure_is_reported() {
        let mock = Mock::broken(true);
        let result = update(&mock, &ApplyContext::live()).unwrap();

        assert!(!result.changed);
        assert_eq!(result.outcome, Outcome::Failed);
        assert_eq!(result.comment, "Failed to update database alpha");
    }

    #[test]
    fn test_reconcile_dispatches_on_ensure() {
        let mock = Mock::new(true);
        let result = reconcile(&mock, Ensure::Absent, &ApplyContext::live()).unwrap();
        assert!(result.changed);
        assert!(mock.current_state().unwrap().is_absent());
    }
}
