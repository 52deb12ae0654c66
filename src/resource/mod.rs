//! Resources managed by converge
//!
//! Each resource wraps a kit client and one desired object. Probing and
//! mutating go through the kit; the present/absent state machine lives
//! in the `declarative` engine.
//!
//! Kit errors from a mutation are sorted three ways:
//! - a fatal error (missing tool, I/O) aborts the call
//! - a precondition error becomes [`MutationOutcome::Refused`]
//! - anything else becomes [`MutationOutcome::CommandFailed`]

use anyhow::Result;
use declarative::MutationOutcome;

pub mod database;
pub mod jail;
pub mod role;

pub use database::PostgresDatabase;
pub use jail::PoudriereJail;
pub use role::PostgresRole;

// Plan order. Roles come before the databases they own.
pub const ORDER_JAIL: u8 = 0;
pub const ORDER_ROLE: u8 = 1;
pub const ORDER_DATABASE: u8 = 2;

/// Sort a PostgreSQL mutation result into a [`MutationOutcome`].
pub fn pg_outcome(result: pgkit::Result<()>) -> Result<MutationOutcome> {
    match result {
        Ok(()) => Ok(MutationOutcome::Applied),
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(e) if e.is_precondition() => Ok(MutationOutcome::Refused {
            reason: e.to_string(),
        }),
        Err(e) => Ok(MutationOutcome::CommandFailed {
            message: describe_pg(&e),
        }),
    }
}

/// Sort a poudriere mutation result into a [`MutationOutcome`].
pub fn jail_outcome(result: jailkit::Result<()>) -> Result<MutationOutcome> {
    match result {
        Ok(()) => Ok(MutationOutcome::Applied),
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(e) if e.is_precondition() => Ok(MutationOutcome::Refused {
            reason: e.to_string(),
        }),
        Err(jailkit::Error::CommandFailed { message, stderr }) if !stderr.is_empty() => {
            Ok(MutationOutcome::CommandFailed {
                message: format!("{message}: {stderr}"),
            })
        }
        Err(e) => Ok(MutationOutcome::CommandFailed {
            message: e.to_string(),
        }),
    }
}

fn describe_pg(error: &pgkit::Error) -> String {
    match error {
        pgkit::Error::CommandFailed { stderr, .. } if !stderr.is_empty() => stderr.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pg_outcome_sorting() {
        assert_eq!(pg_outcome(Ok(())).unwrap(), MutationOutcome::Applied);

        let refused = pg_outcome(Err(pgkit::Error::MissingTemplate {
            template: "tpl".into(),
        }))
        .unwrap();
        assert_eq!(
            refused,
            MutationOutcome::Refused {
                reason: "template tpl does not exist".into()
            }
        );

        let failed = pg_outcome(Err(pgkit::Error::CommandFailed {
            message: "createdb failed for app".into(),
            stderr: "ERROR:  boom".into(),
        }))
        .unwrap();
        assert_eq!(
            failed,
            MutationOutcome::CommandFailed {
                message: "ERROR:  boom".into()
            }
        );

        assert!(
            pg_outcome(Err(pgkit::Error::ToolNotFound {
                tool: "createdb".into()
            }))
            .is_err()
        );
    }

    #[test]
    fn test_jail_outcome_sorting() {
        assert!(matches!(
            jail_outcome(Err(jailkit::Error::ConfigMissing {
                path: "/nope".into()
            }))
            .unwrap(),
            MutationOutcome::Refused { .. }
        ));
        assert!(jail_outcome(Err(jailkit::Error::PoudriereNotFound)).is_err());
        assert_eq!(
            jail_outcome(Err(jailkit::Error::CommandFailed {
                message: "poudriere jail -d -j j".into(),
                stderr: "busy".into(),
            }))
            .unwrap(),
            MutationOutcome::CommandFailed {
                message: "poudriere jail -d -j j: busy".into()
            }
        );
    }
}
