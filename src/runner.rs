//! External command execution
//!
//! Backends never touch `std::process` directly. They build a [`Cmd`] and
//! hand it to a [`Runner`], which lets tests swap in a recording fake.

use anyhow::{Context, Result, bail};
use std::fmt;
use std::process::{Command, Stdio};

/// Environment variables for one command, in insertion order
///
/// Passed explicitly to the child; the process environment of converge
/// itself is never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Env {
    vars: Vec<(String, String)>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a variable, replacing an earlier value for the same key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.vars.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// A command line to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    pub program: String,
    pub args: Vec<String>,
    pub env: Env,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Env::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, env: &Env) -> Self {
        for (k, v) in env.iter() {
            self.env.set(k, v);
        }
        self
    }

    /// Run through `sudo` when `privileged` is set
    ///
    /// sudo resets the environment, so variables are passed on the command
    /// line through `env`.
    pub fn sudo_if(self, privileged: bool) -> Self {
        if !privileged {
            return self;
        }

        let mut wrapped = Self::new("sudo");
        if !self.env.is_empty() {
            wrapped = wrapped
                .arg("env")
                .args(self.env.iter().map(|(k, v)| format!("{k}={v}")));
        }
        wrapped.arg(self.program).args(self.args)
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in self.env.iter() {
            write!(f, "{k}={v} ")?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured output of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
}

/// Runs commands on behalf of backends
pub trait Runner {
    /// Run a command; a non-zero exit is an error carrying stderr
    fn run(&self, cmd: &Cmd) -> Result<Output>;

    /// Run a command for an existence check
    ///
    /// Failure becomes `None` instead of an error. Never use this for
    /// mutations.
    fn probe(&self, cmd: &Cmd) -> Result<Option<Output>>;

    /// Whether `program` is on PATH
    fn exists(&self, program: &str) -> bool;
}

/// Runs commands as child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn spawn(cmd: &Cmd) -> Result<std::process::Output> {
        log::debug!("running: {cmd}");
        Command::new(&cmd.program)
            .args(&cmd.args)
            .envs(cmd.env.iter())
            .stdin(Stdio::inherit())
            .output()
            .with_context(|| format!("Failed to execute: {cmd}"))
    }
}

impl Runner for SystemRunner {
    fn run(&self, cmd: &Cmd) -> Result<Output> {
        let output = Self::spawn(cmd)?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            bail!("Command failed ({}): {}\n{}", output.status, cmd, stderr.trim());
        }
        Ok(Output { stdout, stderr })
    }

    fn probe(&self, cmd: &Cmd) -> Result<Option<Output>> {
        match self.run(cmd) {
            Ok(output) => Ok(Some(output)),
            Err(e) => {
                log::debug!("probe failed: {e:#}");
                Ok(None)
            }
        }
    }

    fn exists(&self, program: &str) -> bool {
        matches!(self.probe(&Cmd::new("which").arg(program)), Ok(Some(_)))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let cmd = Cmd::new("apt-get")
            .args(["install", "-y", "curl"])
            .env(&Env::new().with("DEBIAN_FRONTEND", "noninteractive"));

        assert_eq!(
            cmd.to_string(),
            "DEBIAN_FRONTEND=noninteractive apt-get install -y curl"
        );
    }

    #[test]
    fn test_sudo_passes_env_on_command_line() {
        let cmd = Cmd::new("apt-get")
            .arg("update")
            .env(&Env::new().with("DEBIAN_FRONTEND", "noninteractive"))
            .sudo_if(true);

        assert_eq!(cmd.program, "sudo");
        assert!(cmd.env.is_empty());
        assert_eq!(
            cmd.to_string(),
            "sudo env DEBIAN_FRONTEND=noninteractive apt-get update"
        );
    }

    #[test]
    fn test_sudo_without_env() {
        let cmd = Cmd::new("snap").args(["remove", "jq"]).sudo_if(true);
        assert_eq!(cmd.to_string(), "sudo snap remove jq");
    }

    #[test]
    fn test_no_sudo_is_unchanged() {
        let cmd = Cmd::new("brew").arg("update");
        assert_eq!(cmd.clone().sudo_if(false), cmd);
    }

    #[test]
    fn test_env_set_replaces() {
        let mut env = Env::new().with("A", "1").with("B", "2");
        env.set("A", "3");

        assert_eq!(env.get("A"), Some("3"));
        assert_eq!(env.iter().collect::<Vec<_>>(), vec![("A", "3"), ("B", "2")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_run_and_probe() {
        let runner = SystemRunner;

        let out = runner
            .run(&Cmd::new("sh").args(["-c", "echo $GREETING"]).env(&Env::new().with("GREETING", "hi")))
            .unwrap();
        assert_eq!(out.stdout.trim(), "hi");

        assert!(runner.run(&Cmd::new("false")).is_err());
        assert!(runner.probe(&Cmd::new("false")).unwrap().is_none());
    }
}
