//! Command invocation collaborator
//!
//! Resources never spawn processes themselves. They describe an
//! [`Invocation`] (program, discrete arguments, environment overrides)
//! and hand it to a [`CommandRunner`]. The default runner spawns a real
//! child process; tests substitute an in-memory fake.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::process::{Command, Output, Stdio};

/// A fully composed external command.
///
/// Arguments are passed to the child as-is; nothing goes through a shell.
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path
    pub program: String,
    /// Discrete arguments
    pub args: Vec<String>,
    /// Environment overrides, applied to this child process only
    pub env: BTreeMap<String, String>,
    /// Text written to the child's standard input; never logged
    pub stdin: Option<String>,
    /// Whether the arguments carry a secret and must not be logged
    pub sensitive: bool,
}

impl Invocation {
    /// Start building an invocation of `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            stdin: None,
            sensitive: false,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Feed `input` to the child on standard input.
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Mark the arguments as containing a secret.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Check whether any argument equals `value`.
    pub fn has_arg(&self, value: &str) -> bool {
        self.args.iter().any(|a| a == value)
    }

    /// The argument following `flag`, if any.
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Loggable rendering: environment values are never shown and
    /// sensitive argument lists are elided.
    pub fn display(&self) -> String {
        let mut out = String::new();
        for key in self.env.keys() {
            out.push_str(key);
            out.push_str("=*** ");
        }
        out.push_str(&self.program);
        if self.sensitive {
            out.push_str(" <redacted>");
        } else {
            for arg in &self.args {
                out.push(' ');
                out.push_str(arg);
            }
        }
        out
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Output captured from a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
        }
    }
}

impl CommandOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into().into_bytes(),
            stderr: Vec::new(),
            success: true,
        }
    }

    /// Failed output with the given stderr.
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: stderr.into().into_bytes(),
            success: false,
        }
    }

    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Runs external commands on behalf of resources.
///
/// `Err` means the command could not be started at all (missing binary,
/// spawn failure). A command that ran and exited non-zero is `Ok` with
/// `success == false`.
pub trait CommandRunner: Send + Sync {
    /// Run an invocation to completion, blocking the caller.
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput>;
}

/// Runner that spawns real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        log::debug!("running: {invocation}");
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(&invocation.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = match &invocation.stdin {
            None => command.stdin(Stdio::null()).output()?,
            Some(input) => {
                let mut child = command.stdin(Stdio::piped()).spawn()?;
                if let Some(mut pipe) = child.stdin.take() {
                    pipe.write_all(input.as_bytes())?;
                }
                child.wait_with_output()?
            }
        };
        let output = CommandOutput::from(output);
        if !output.success {
            log::debug!(
                "{} exited unsuccessfully: {}",
                invocation.program,
                output.stderr_str().trim()
            );
        }
        Ok(output)
    }
}
