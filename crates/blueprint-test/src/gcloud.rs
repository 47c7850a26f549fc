//! `gcloud` CLI query wrapper.
//!
//! Issues `describe`/`list` style queries scoped to a project, parses the
//! JSON responses, and extracts fields by dotted path expressions such as
//! `metadata.labels.three-tier-app`.

use serde_json::Value;
use std::process::Command;
use thiserror::Error;

/// gcloud invocation errors.
#[derive(Debug, Error)]
pub enum GcloudError {
    #[error("failed to spawn gcloud: {0}")]
    Io(#[from] std::io::Error),

    #[error("gcloud {command:?} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("failed to parse gcloud output as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Location scope for a query.
///
/// `Default` queries resources that need no location flag (secrets, SQL
/// instances); `Global` adds `--global`, `Region` adds `--region <r>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Default,
    Global,
    Region(String),
}

impl Scope {
    /// Region scope from anything string-like.
    pub fn region(r: impl Into<String>) -> Self {
        Self::Region(r.into())
    }

    fn flags(&self) -> Vec<String> {
        match self {
            Scope::Default => vec![],
            Scope::Global => vec!["--global".into()],
            Scope::Region(r) => vec!["--region".into(), r.clone()],
        }
    }
}

/// A project-scoped gcloud invoker.
///
/// Every query carries `--project <p> --format json`.
#[derive(Debug, Clone)]
pub struct Gcloud {
    project: String,
}

impl Gcloud {
    /// Create an invoker scoped to `project`.
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
        }
    }

    /// Describe a single resource, e.g. `describe("run services", "todo-fe",
    /// &Scope::region("us-central1"))`.
    pub fn describe(
        &self,
        collection: &str,
        resource: &str,
        scope: &Scope,
    ) -> Result<Vec<Value>, GcloudError> {
        self.run(&self.query_args(collection, "describe", Some(resource), scope))
    }

    /// List a resource collection, e.g. `list("services", &Scope::Default)`.
    pub fn list(&self, collection: &str, scope: &Scope) -> Result<Vec<Value>, GcloudError> {
        self.run(&self.query_args(collection, "list", None, scope))
    }

    fn query_args(
        &self,
        collection: &str,
        verb: &str,
        resource: Option<&str>,
        scope: &Scope,
    ) -> Vec<String> {
        let mut args: Vec<String> = collection.split_whitespace().map(String::from).collect();
        args.push(verb.into());
        if let Some(resource) = resource {
            args.push(resource.into());
        }
        args.extend(["--project".into(), self.project.clone()]);
        args.extend(["--format".into(), "json".into()]);
        args.extend(scope.flags());
        args
    }

    /// Run gcloud with `args` and normalize the JSON response to an array.
    ///
    /// `describe` returns a single object, `list` returns an array; an object
    /// is wrapped as a one-element vector so callers see a uniform shape.
    fn run(&self, args: &[String]) -> Result<Vec<Value>, GcloudError> {
        tracing::debug!(?args, "running gcloud");

        let output = Command::new("gcloud").args(args).output()?;

        if !output.status.success() {
            return Err(GcloudError::CommandFailed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let value: Value = serde_json::from_slice(&output.stdout)?;
        Ok(normalize_to_array(value))
    }
}

fn normalize_to_array(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Traverse a dotted field path, e.g. `metadata.labels.three-tier-app`.
pub fn get_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(value, |v, key| v.get(key))
}

/// Render the value at a dotted field path as a string.
///
/// Strings are returned verbatim; other scalars render as their JSON text
/// (so a boolean label value still compares against `"true"`).
pub fn get_string(value: &Value, path: &str) -> Option<String> {
    match get_path(value, path)? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// First element of `results` whose `field` path renders to `expected`.
pub fn first_match<'v>(results: &'v [Value], field: &str, expected: &str) -> Option<&'v Value> {
    results
        .iter()
        .find(|r| get_string(r, field).as_deref() == Some(expected))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn describe_args_carry_project_and_format() {
        let gcloud = Gcloud::new("test-project");
        let args = gcloud.query_args("secrets", "describe", Some("sqlhost"), &Scope::Default);
        assert_eq!(
            args,
            vec!["secrets", "describe", "sqlhost", "--project", "test-project", "--format", "json"]
        );
    }

    #[test]
    fn multi_word_collections_split_into_command_groups() {
        let gcloud = Gcloud::new("test-project");
        let args = gcloud.query_args(
            "run services",
            "describe",
            Some("three-tier-app-fe"),
            &Scope::region("us-central1"),
        );
        assert_eq!(
            args,
            vec![
                "run",
                "services",
                "describe",
                "three-tier-app-fe",
                "--project",
                "test-project",
                "--format",
                "json",
                "--region",
                "us-central1",
            ]
        );
    }

    #[test]
    fn global_scope_adds_global_flag() {
        let gcloud = Gcloud::new("test-project");
        let args = gcloud.query_args(
            "compute addresses",
            "describe",
            Some("three-tier-app-vpc-address"),
            &Scope::Global,
        );
        assert!(args.contains(&"--global".to_string()));
        assert!(!args.contains(&"--region".to_string()));
    }

    #[test]
    fn list_args_have_no_resource_name() {
        let gcloud = Gcloud::new("test-project");
        let args = gcloud.query_args("services", "list", None, &Scope::Default);
        assert_eq!(
            args,
            vec!["services", "list", "--project", "test-project", "--format", "json"]
        );
    }

    #[test]
    fn objects_normalize_to_single_element_arrays() {
        let normalized = normalize_to_array(json!({"name": "sqlhost"}));
        assert_eq!(normalized, vec![json!({"name": "sqlhost"})]);
    }

    #[test]
    fn arrays_normalize_to_themselves() {
        let normalized = normalize_to_array(json!([{"a": 1}, {"b": 2}]));
        assert_eq!(normalized.len(), 2);
    }

    #[test]
    fn get_path_traverses_nested_objects() {
        let value = json!({"metadata": {"labels": {"three-tier-app": "true"}}});
        assert_eq!(
            get_path(&value, "metadata.labels.three-tier-app"),
            Some(&json!("true"))
        );
    }

    #[test]
    fn get_path_returns_none_for_missing_segments() {
        let value = json!({"metadata": {}});
        assert_eq!(get_path(&value, "metadata.labels.three-tier-app"), None);
    }

    #[test]
    fn get_string_renders_non_string_scalars() {
        let value = json!({"settings": {"userLabels": {"three-tier-app": true}}});
        assert_eq!(
            get_string(&value, "settings.userLabels.three-tier-app").as_deref(),
            Some("true")
        );
    }

    #[test]
    fn first_match_finds_by_field_path() {
        let services = vec![
            json!({"config": {"name": "compute.googleapis.com"}, "state": "ENABLED"}),
            json!({"config": {"name": "run.googleapis.com"}, "state": "ENABLED"}),
        ];
        let matched = first_match(&services, "config.name", "run.googleapis.com").unwrap();
        assert_eq!(get_string(matched, "state").as_deref(), Some("ENABLED"));
    }

    #[test]
    fn first_match_returns_none_when_absent() {
        let services = vec![json!({"config": {"name": "compute.googleapis.com"}})];
        assert!(first_match(&services, "config.name", "redis.googleapis.com").is_none());
    }
}
