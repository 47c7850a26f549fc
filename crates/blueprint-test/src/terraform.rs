//! Terraform blueprint invocation.
//!
//! This module wraps the `terraform` CLI for a blueprint rooted at a
//! directory: init, apply, drift verification, destroy, workspace selection,
//! and typed output reads. Apply and destroy accept a per-test
//! [`RetryPolicy`] for cloud errors that are known to be eventually
//! consistent; retry tables are explicit configuration values constructed by
//! each test, never shared global state.

use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use thiserror::Error;

/// Terraform invocation errors.
#[derive(Debug, Error)]
pub enum TerraformError {
    #[error("failed to spawn terraform: {0}")]
    Io(#[from] std::io::Error),

    #[error("terraform {op} failed: {stderr}")]
    CommandFailed { op: String, stderr: String },

    #[error("terraform plan detected drift after apply: {summary}")]
    Drift { summary: String },

    #[error("terraform {op} still failing after {attempts} attempts: {stderr}")]
    RetriesExhausted {
        op: String,
        attempts: u32,
        stderr: String,
    },

    #[error("failed to parse terraform output as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("terraform output {name:?} is missing or null")]
    OutputMissing { name: String },

    #[error("terraform output {name:?} is not a string")]
    OutputNotString { name: String },

    #[error("no setup directory configured, cannot read setup output {name:?}")]
    NoSetupDir { name: String },
}

/// A single retryable-error rule: a stderr pattern and the reason retrying
/// is expected to help.
#[derive(Debug)]
pub struct RetryableError {
    pattern: Regex,
    reason: String,
}

impl RetryableError {
    /// Create a rule from a regex pattern and a human-readable reason.
    pub fn new(pattern: &str, reason: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            reason: reason.into(),
        })
    }
}

/// Retry budget for apply/destroy operations.
#[derive(Debug)]
pub struct RetryPolicy {
    errors: Vec<RetryableError>,
    max_attempts: u32,
    interval: Duration,
}

impl RetryPolicy {
    /// Create a policy retrying up to `max_attempts` total attempts with a
    /// fixed `interval` between them, for failures matching any rule.
    pub fn new(errors: Vec<RetryableError>, max_attempts: u32, interval: Duration) -> Self {
        Self {
            errors,
            max_attempts,
            interval,
        }
    }

    /// The reason associated with the first rule matching `stderr`, if any.
    fn match_reason(&self, stderr: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.pattern.is_match(stderr))
            .map(|e| e.reason.as_str())
    }
}

/// A Terraform blueprint rooted at a directory.
///
/// Variables, extra environment, and an optional retry policy are attached
/// builder-style before invoking operations.
#[derive(Debug, Default)]
pub struct Terraform {
    dir: PathBuf,
    setup_dir: Option<PathBuf>,
    vars: Vec<(String, String)>,
    env: Vec<(String, String)>,
    retry: Option<RetryPolicy>,
}

impl Terraform {
    /// Create a wrapper for the blueprint at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Set the setup stack directory (holds outputs like the project id).
    pub fn with_setup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.setup_dir = Some(dir.into());
        self
    }

    /// Add a `-var key=value` flag to apply/plan/destroy invocations.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.push((key.into(), value.into()));
        self
    }

    /// Add an environment variable for terraform child processes.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Attach a retryable-error policy for apply and destroy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Run `terraform init`.
    pub fn init(&self) -> Result<(), TerraformError> {
        self.run(&self.dir, &["init".into(), "-input=false".into()], "init")
            .map(|_| ())
    }

    /// Run `terraform apply`, retrying per the attached policy.
    pub fn apply(&self) -> Result<(), TerraformError> {
        self.run_with_retries(self.apply_args(), "apply")
    }

    /// Run `terraform destroy`, retrying per the attached policy.
    pub fn destroy(&self) -> Result<(), TerraformError> {
        self.run_with_retries(self.destroy_args(), "destroy")
    }

    /// Verify a second apply would be a no-op.
    ///
    /// Runs `terraform plan -detailed-exitcode`: exit code 0 means the state
    /// matches the configuration, exit code 2 means the plan wants changes
    /// (drift), anything else is a plan failure.
    pub fn verify_no_drift(&self) -> Result<(), TerraformError> {
        let args = self.plan_args();
        tracing::debug!(?args, "running terraform plan");

        let output = Command::new("terraform")
            .args(&args)
            .current_dir(&self.dir)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .output()?;

        match output.status.code() {
            Some(0) => Ok(()),
            Some(2) => Err(TerraformError::Drift {
                summary: String::from_utf8_lossy(&output.stdout).into_owned(),
            }),
            _ => Err(TerraformError::CommandFailed {
                op: "plan".into(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
        }
    }

    /// Select (creating if needed) a named Terraform workspace.
    pub fn select_workspace(&self, name: &str) -> Result<(), TerraformError> {
        let args: Vec<String> = vec![
            "workspace".into(),
            "select".into(),
            "-or-create".into(),
            name.into(),
        ];
        self.run(&self.dir, &args, "workspace select").map(|_| ())
    }

    /// Read a string output of the blueprint stack.
    pub fn output(&self, name: &str) -> Result<String, TerraformError> {
        self.read_output(&self.dir, name)
    }

    /// Read a string output of the setup stack.
    pub fn setup_output(&self, name: &str) -> Result<String, TerraformError> {
        let dir = self
            .setup_dir
            .clone()
            .ok_or_else(|| TerraformError::NoSetupDir { name: name.into() })?;
        self.read_output(&dir, name)
    }

    fn read_output(&self, dir: &Path, name: &str) -> Result<String, TerraformError> {
        let args: Vec<String> = vec!["output".into(), "-json".into(), name.into()];
        let stdout = self.run(dir, &args, "output")?;
        let value: Value = serde_json::from_str(&stdout)?;
        parse_output_value(name, &value)
    }

    fn apply_args(&self) -> Vec<String> {
        let mut args: Vec<String> =
            vec!["apply".into(), "-input=false".into(), "-auto-approve".into()];
        args.extend(self.var_args());
        args
    }

    fn destroy_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "destroy".into(),
            "-input=false".into(),
            "-auto-approve".into(),
        ];
        args.extend(self.var_args());
        args
    }

    fn plan_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "plan".into(),
            "-input=false".into(),
            "-detailed-exitcode".into(),
        ];
        args.extend(self.var_args());
        args
    }

    fn var_args(&self) -> Vec<String> {
        self.vars
            .iter()
            .flat_map(|(k, v)| ["-var".to_string(), format!("{k}={v}")])
            .collect()
    }

    /// Run an operation once, returning stdout on success.
    fn run(&self, dir: &Path, args: &[String], op: &str) -> Result<String, TerraformError> {
        tracing::debug!(op, ?args, "running terraform");

        let output = Command::new("terraform")
            .args(args)
            .current_dir(dir)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .output()?;

        if !output.status.success() {
            return Err(TerraformError::CommandFailed {
                op: op.into(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run an operation, retrying failures that match the attached policy.
    ///
    /// A failure not matching any rule, or the last allowed attempt failing,
    /// is returned to the caller. The interval between attempts is fixed.
    fn run_with_retries(&self, args: Vec<String>, op: &str) -> Result<(), TerraformError> {
        let Some(policy) = &self.retry else {
            return self.run(&self.dir, &args, op).map(|_| ());
        };

        let mut last_stderr = String::new();
        for attempt in 1..=policy.max_attempts {
            match self.run(&self.dir, &args, op) {
                Ok(_) => return Ok(()),
                Err(TerraformError::CommandFailed { stderr, .. }) => {
                    let Some(reason) = policy.match_reason(&stderr) else {
                        return Err(TerraformError::CommandFailed {
                            op: op.into(),
                            stderr,
                        });
                    };
                    tracing::warn!(op, attempt, reason, "retryable terraform error");
                    last_stderr = stderr;
                }
                Err(other) => return Err(other),
            }

            if attempt < policy.max_attempts {
                std::thread::sleep(policy.interval);
            }
        }

        Err(TerraformError::RetriesExhausted {
            op: op.into(),
            attempts: policy.max_attempts,
            stderr: last_stderr,
        })
    }
}

/// Interpret a `terraform output -json <name>` value as a string output.
fn parse_output_value(name: &str, value: &Value) -> Result<String, TerraformError> {
    match value {
        Value::Null => Err(TerraformError::OutputMissing { name: name.into() }),
        Value::String(s) => Ok(s.clone()),
        _ => Err(TerraformError::OutputNotString { name: name.into() }),
    }
}
