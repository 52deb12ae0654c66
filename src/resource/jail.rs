//! Poudriere build jail resource

use anyhow::Result;
use declarative::{ApplyContext, MutationOutcome, Resource, ResourceState};
use jailkit::{JailSpec, Poudriere};

use super::{ORDER_JAIL, jail_outcome};

/// A poudriere build jail
#[derive(Debug, Clone)]
pub struct PoudriereJail {
    client: Poudriere,
    spec: JailSpec,
}

impl PoudriereJail {
    pub fn new(client: Poudriere, spec: JailSpec) -> Self {
        Self { client, spec }
    }
}

impl Resource for PoudriereJail {
    fn id(&self) -> String {
        self.spec.name.clone()
    }

    fn description(&self) -> String {
        format!(
            "jail {} ({} {})",
            self.spec.name, self.spec.version, self.spec.arch
        )
    }

    fn resource_type(&self) -> &'static str {
        "poudriere_jail"
    }

    fn label(&self) -> &'static str {
        "Jail"
    }

    fn order(&self) -> u8 {
        ORDER_JAIL
    }

    fn current_state(&self) -> Result<ResourceState> {
        let line = self
            .client
            .list_jails()?
            .into_iter()
            .find(|line| line.split_whitespace().next() == Some(self.spec.name.as_str()));
        Ok(match line {
            Some(line) => ResourceState::Present {
                details: Some(line.split_whitespace().skip(1).collect::<Vec<_>>().join(" ")),
            },
            None => ResourceState::Absent,
        })
    }

    fn create(&self, _ctx: &ApplyContext) -> Result<MutationOutcome> {
        jail_outcome(self.client.create_jail(&self.spec))
    }

    fn remove(&self, _ctx: &ApplyContext) -> Result<MutationOutcome> {
        jail_outcome(self.client.delete_jail(&self.spec.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Outcome, absent, present};
    use jailkit::PoudrierePaths;
    use jailkit::testing::FakePoudriere;
    use std::fs;
    use tempfile::TempDir;

    fn setup(with_config: bool) -> (TempDir, FakePoudriere, Poudriere) {
        let dir = TempDir::new().unwrap();
        let conf = dir.path().join("poudriere.conf");
        if with_config {
            fs::write(&conf, "BASEFS=/usr/local/poudriere\n").unwrap();
        }
        let fake = FakePoudriere::new();
        let client = fake.client(PoudrierePaths::new(conf, dir.path().join("poudriere.d")));
        (dir, fake, client)
    }

    #[test]
    fn test_present_then_absent() {
        let (_dir, fake, client) = setup(true);
        let jail = PoudriereJail::new(client.clone(), JailSpec::new("90amd64", "amd64"));

        let created = present(&jail, &ApplyContext::live()).unwrap();
        assert!(created.changed);
        assert_eq!(created.comment, "The jail 90amd64 has been created");
        assert!(client.paths().make_conf("90amd64").exists());

        let again = present(&jail, &ApplyContext::live()).unwrap();
        assert!(!again.changed);
        assert_eq!(again.comment, "Jail 90amd64 is already present");

        let removed = absent(&jail, &ApplyContext::live()).unwrap();
        assert!(removed.changed);
        assert_eq!(removed.comment, "Jail 90amd64 has been removed");
        assert!(!fake.has_jail("90amd64"));
    }

    #[test]
    fn test_missing_config_refuses_create() {
        let (_dir, fake, client) = setup(false);
        let jail = PoudriereJail::new(client, JailSpec::new("j", "amd64"));

        let result = present(&jail, &ApplyContext::live()).unwrap();
        assert_eq!(result.outcome, Outcome::Failed);
        assert!(result.comment.starts_with("Failed to create jail j: could not find"));
        assert!(fake.calls().iter().all(|c| !c.has_arg("-c")));
    }

    #[test]
    fn test_failed_delete_is_failed_result() {
        let (_dir, fake, client) = setup(true);
        fake.add_jail("j", "9.0-RELEASE", "amd64");
        fake.set_fail_mutations(true);
        let jail = PoudriereJail::new(client, JailSpec::new("j", "amd64"));

        let result = absent(&jail, &ApplyContext::live()).unwrap();
        assert_eq!(result.outcome, Outcome::Failed);
        assert!(result.comment.contains("busy"));
        assert!(fake.has_jail("j"));
    }

    #[test]
    fn test_created_jail_without_make_conf_still_counts() {
        let (dir, fake, client) = setup(true);
        fs::write(dir.path().join("poudriere.d"), "").unwrap();
        let jail = PoudriereJail::new(client, JailSpec::new("j", "amd64"));

        let result = present(&jail, &ApplyContext::live()).unwrap();
        assert!(result.changed);
        assert!(result.is_success());
        assert_eq!(result.comment, "The jail j has been created");
        assert!(fake.has_jail("j"));
    }

    #[test]
    fn test_deleted_jail_with_stuck_make_conf_still_counts() {
        let (_dir, fake, client) = setup(true);
        fake.add_jail("j", "9.0-RELEASE", "amd64");
        fs::create_dir_all(client.paths().make_conf("j")).unwrap();
        let jail = PoudriereJail::new(client, JailSpec::new("j", "amd64"));

        let result = absent(&jail, &ApplyContext::live()).unwrap();
        assert!(result.changed);
        assert!(result.is_success());
        assert!(!fake.has_jail("j"));
    }

    #[test]
    fn test_dry_run_creates_nothing() {
        let (_dir, fake, client) = setup(true);
        let jail = PoudriereJail::new(client, JailSpec::new("j", "amd64"));
        let result = present(&jail, &ApplyContext::dry_run()).unwrap();
        assert!(result.is_pending());
        assert!(!fake.has_jail("j"));
    }

    #[test]
    fn test_state_details() {
        let (_dir, fake, client) = setup(true);
        fake.add_jail("j", "10.1-RELEASE", "i386");
        let jail = PoudriereJail::new(client, JailSpec::new("j", "i386"));
        assert_eq!(
            jail.current_state().unwrap(),
            ResourceState::Present {
                details: Some("10.1-RELEASE i386 ftp".into())
            }
        );
    }
}
