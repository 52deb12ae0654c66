//! In-memory poudriere for tests.

use crate::Poudriere;
use crate::types::PoudrierePaths;
use declarative::{CommandOutput, CommandRunner, Invocation};
use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    jails: BTreeMap<String, (String, String)>,
    ports: Vec<String>,
    calls: Vec<Invocation>,
    bulk_output: Option<String>,
    missing: bool,
    ignore_mutations: bool,
    fail_mutations: bool,
}

/// Shared handle to a simulated `poudriere`.
#[derive(Debug, Clone, Default)]
pub struct FakePoudriere {
    state: Arc<Mutex<State>>,
}

impl FakePoudriere {
    /// A poudriere with no jails and no ports trees.
    pub fn new() -> Self {
        Self::default()
    }

    /// A client talking to this fake.
    pub fn client(&self, paths: PoudrierePaths) -> Poudriere {
        Poudriere::with_runner(Arc::new(self.clone()), "poudriere", paths)
    }

    /// Add a jail.
    pub fn add_jail(&self, name: &str, version: &str, arch: &str) {
        self.lock()
            .jails
            .insert(name.to_string(), (version.to_string(), arch.to_string()));
    }

    /// Add a ports tree.
    pub fn add_ports_tree(&self, name: &str) {
        self.lock().ports.push(name.to_string());
    }

    /// Whether a jail exists.
    pub fn has_jail(&self, name: &str) -> bool {
        self.lock().jails.contains_key(name)
    }

    /// Every invocation received so far.
    pub fn calls(&self) -> Vec<Invocation> {
        self.lock().calls.clone()
    }

    /// Replace the output of the next bulk builds.
    pub fn set_bulk_output(&self, output: &str) {
        self.lock().bulk_output = Some(output.to_string());
    }

    /// Make every spawn fail as if poudriere were not installed.
    pub fn set_missing(&self, missing: bool) {
        self.lock().missing = missing;
    }

    /// Report success for jail create/delete without applying them.
    pub fn set_ignore_mutations(&self, ignore: bool) {
        self.lock().ignore_mutations = ignore;
    }

    /// Make jail create/delete exit non-zero.
    pub fn set_fail_mutations(&self, fail: bool) {
        self.lock().fail_mutations = fail;
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl CommandRunner for FakePoudriere {
    fn run(&self, inv: &Invocation) -> io::Result<CommandOutput> {
        let mut state = self.lock();
        state.calls.push(inv.clone());
        if state.missing {
            return Err(io::Error::new(io::ErrorKind::NotFound, "No such file"));
        }

        let args: Vec<&str> = inv.args.iter().map(String::as_str).collect();
        let output = match args.as_slice() {
            ["version"] => CommandOutput::ok("3.0.0\n"),
            ["jails", "-l"] => {
                let mut out = String::from("JAILNAME VERSION ARCH METHOD\n");
                for (name, (version, arch)) in &state.jails {
                    out.push_str(&format!("{name} {version} {arch} ftp\n"));
                }
                CommandOutput::ok(out)
            }
            ["jails", "-c", "-j", name, "-v", version, "-a", arch] => {
                if state.fail_mutations {
                    return Ok(CommandOutput::failed("====>> Error: fetch failed\n"));
                }
                if !state.ignore_mutations {
                    state.jails.insert(
                        (*name).to_string(),
                        ((*version).to_string(), (*arch).to_string()),
                    );
                }
                CommandOutput::ok(format!("====>> Jail {name} {version} {arch} is ready\n"))
            }
            ["jail", "-d", "-j", name] => {
                if state.fail_mutations {
                    return Ok(CommandOutput::failed("====>> Error: busy\n"));
                }
                if !state.jails.contains_key(*name) {
                    return Ok(CommandOutput::failed(format!(
                        "====>> Error: No such jail: {name}\n"
                    )));
                }
                if !state.ignore_mutations {
                    state.jails.remove(*name);
                }
                CommandOutput::ok(format!("====>> Removing {name} jail... done\n"))
            }
            ["ports", "-l"] => {
                let mut out = String::from("PORTSTREE METHOD PATH\n");
                for tree in &state.ports {
                    out.push_str(&format!("{tree} portsnap /usr/local/poudriere/ports/{tree}\n"));
                }
                CommandOutput::ok(out)
            }
            ["ports", "-c"] => {
                let name = format!("ports{}", state.ports.len());
                state.ports.push(name);
                CommandOutput::ok("====>> Extracting portstree\n")
            }
            ["bulk", ..] => match &state.bulk_output {
                Some(out) => CommandOutput {
                    stdout: out.clone().into_bytes(),
                    stderr: Vec::new(),
                    success: false,
                },
                None => CommandOutput::ok(
                    "====>> Building 1 packages\n\
                     1 packages built, 0 failures, 0 ignored, 0 skipped\n",
                ),
            },
            _ => CommandOutput::failed("usage: poudriere command [options]\n"),
        };
        Ok(output)
    }
}
