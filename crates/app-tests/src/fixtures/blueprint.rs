//! Three-tier web app blueprint fixture.
//!
//! Knows where the blueprint lives, which errors are worth retrying during
//! apply/destroy, and which resources, labels, and services a successful
//! deployment is expected to produce.

use anyhow::Context;
use blueprint_test::expect::ResourceExpectation;
use blueprint_test::gcloud::Scope;
use blueprint_test::terraform::{RetryPolicy, RetryableError, Terraform};
use std::path::PathBuf;
use std::time::Duration;

/// Region the blueprint deploys into.
pub const REGION: &str = "us-central1";

/// Resource name prefix used by the blueprint.
pub const PREFIX: &str = "three-tier-app";

/// Text the deployed frontend is expected to serve.
pub const TODO_MARKER: &str = "<title>Todo</title>";

/// Services the blueprint enables on the project.
pub const ENABLED_SERVICES: &[&str] = &[
    "compute",
    "cloudapis",
    "vpcaccess",
    "servicenetworking",
    "cloudbuild",
    "sql-component",
    "sqladmin",
    "storage",
    "secretmanager",
    "run",
    "redis",
];

/// The blueprint under test.
#[derive(Debug)]
pub struct ThreeTierApp {
    tf_dir: PathBuf,
    setup_dir: Option<PathBuf>,
}

impl ThreeTierApp {
    /// Build the fixture from the environment.
    ///
    /// `THREE_TIER_APP_TF_DIR` is required; `THREE_TIER_APP_SETUP_DIR` is
    /// optional and only needed by tests reading setup outputs.
    pub fn from_env() -> anyhow::Result<Self> {
        let tf_dir = std::env::var("THREE_TIER_APP_TF_DIR")
            .context("THREE_TIER_APP_TF_DIR must point at the blueprint root")?;
        let setup_dir = std::env::var("THREE_TIER_APP_SETUP_DIR").ok();

        Ok(Self {
            tf_dir: PathBuf::from(tf_dir),
            setup_dir: setup_dir.map(PathBuf::from),
        })
    }

    /// A Terraform wrapper for the blueprint, no retry policy attached.
    pub fn terraform(&self) -> Terraform {
        let tf = Terraform::new(&self.tf_dir);
        match &self.setup_dir {
            Some(dir) => tf.with_setup_dir(dir),
            None => tf,
        }
    }

    /// A Terraform wrapper with the blueprint's retryable-error policy.
    pub fn terraform_with_retries(&self) -> anyhow::Result<Terraform> {
        Ok(self.terraform().with_retry_policy(Self::retry_policy()?))
    }

    /// The retryable-error policy for apply/destroy.
    ///
    /// Constructed fresh per call so each test owns its configuration.
    pub fn retry_policy() -> anyhow::Result<RetryPolicy> {
        Ok(RetryPolicy::new(
            vec![
                // Cloud SQL holds database connections open for a while after
                // the app stops using them.
                RetryableError::new(
                    ".*is being accessed by other users.*",
                    "Database will eventually let you delete it",
                )?,
                RetryableError::new(
                    ".*SERVICE_DISABLED.*",
                    "Service enablement is eventually consistent",
                )?,
            ],
            10,
            Duration::from_secs(60),
        ))
    }

    /// Label expectations: every blueprint resource carries the
    /// `three-tier-app` label.
    pub fn label_expectations(&self, sql_name: &str) -> Vec<ResourceExpectation> {
        let label = format!("labels.{PREFIX}");
        vec![
            ResourceExpectation::label_true(
                "Label: Secret SQLHost",
                "secrets",
                "sqlhost",
                Scope::Default,
                &label,
            ),
            ResourceExpectation::label_true(
                "Label: Secret RedisHost",
                "secrets",
                "redishost",
                Scope::Default,
                &label,
            ),
            ResourceExpectation::label_true(
                "Label: Secret todo_user",
                "secrets",
                "todo_user",
                Scope::Default,
                &label,
            ),
            ResourceExpectation::label_true(
                "Label: Secret todo_pass",
                "secrets",
                "todo_pass",
                Scope::Default,
                &label,
            ),
            ResourceExpectation::label_true(
                "Label: Service api",
                "run services",
                format!("{PREFIX}-api"),
                Scope::region(REGION),
                format!("metadata.{label}"),
            ),
            ResourceExpectation::label_true(
                "Label: Service fe",
                "run services",
                format!("{PREFIX}-fe"),
                Scope::region(REGION),
                format!("metadata.{label}"),
            ),
            ResourceExpectation::label_true(
                "Label: SQL",
                "sql instances",
                sql_name,
                Scope::Default,
                format!("settings.userLabels.{PREFIX}"),
            ),
            ResourceExpectation::label_true(
                "Label: Redis",
                "redis instances",
                format!("{PREFIX}-cache"),
                Scope::region(REGION),
                &label,
            ),
        ]
    }

    /// Existence expectations: every blueprint resource is queryable under
    /// its expected fully-qualified name.
    pub fn existence_expectations(
        &self,
        sql_name: &str,
        project_id: &str,
        project_number: &str,
    ) -> Vec<ResourceExpectation> {
        let secret = |case: &str, name: &str| {
            let expected = format!("projects/{project_number}/secrets/{name}");
            ResourceExpectation::field_equals(
                case,
                "secrets",
                expected.clone(),
                Scope::Default,
                "name",
                expected,
            )
        };

        vec![
            secret("Existence: Secret SQLHost", "sqlhost"),
            secret("Existence: Secret RedisHost", "redishost"),
            secret("Existence: Secret todo_user", "todo_user"),
            secret("Existence: Secret todo_pass", "todo_pass"),
            ResourceExpectation::field_equals(
                "Existence: Service todo-fe",
                "run services",
                format!("{PREFIX}-fe"),
                Scope::region(REGION),
                "metadata.name",
                format!("{PREFIX}-fe"),
            ),
            ResourceExpectation::field_equals(
                "Existence: Service todo-api",
                "run services",
                format!("{PREFIX}-api"),
                Scope::region(REGION),
                "metadata.name",
                format!("{PREFIX}-api"),
            ),
            ResourceExpectation::field_equals(
                "Existence: Redis",
                "redis instances",
                format!("projects/{project_id}/locations/{REGION}/instances/{PREFIX}-cache"),
                Scope::region(REGION),
                "name",
                format!("projects/{project_id}/locations/{REGION}/instances/{PREFIX}-cache"),
            ),
            ResourceExpectation::field_equals(
                "Existence: SQL",
                "sql instances",
                sql_name,
                Scope::Default,
                "name",
                sql_name,
            ),
            ResourceExpectation::field_equals(
                "Existence: VPC Connector",
                "compute networks vpc-access connectors",
                format!("projects/{project_id}/locations/{REGION}/connectors/{PREFIX}-vpc-cx"),
                Scope::region(REGION),
                "name",
                format!("projects/{project_id}/locations/{REGION}/connectors/{PREFIX}-vpc-cx"),
            ),
            ResourceExpectation::field_equals(
                "Existence: VPC Address",
                "compute addresses",
                format!("{PREFIX}-vpc-address"),
                Scope::Global,
                "name",
                format!("{PREFIX}-vpc-address"),
            ),
        ]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_builds_from_valid_patterns() {
        assert!(ThreeTierApp::retry_policy().is_ok());
    }

    #[test]
    fn label_table_covers_all_labeled_resources() {
        let app = ThreeTierApp {
            tf_dir: PathBuf::from("/tmp/blueprint"),
            setup_dir: None,
        };
        let labels = app.label_expectations("three-tier-app-db-75");
        assert_eq!(labels.len(), 8);
        assert!(labels.iter().all(|e| e.name.starts_with("Label: ")));
    }

    #[test]
    fn existence_table_uses_fully_qualified_names() {
        let app = ThreeTierApp {
            tf_dir: PathBuf::from("/tmp/blueprint"),
            setup_dir: None,
        };
        let existence = app.existence_expectations("three-tier-app-db-75", "proj", "123456");
        assert_eq!(existence.len(), 10);
        assert_eq!(existence[0].resource, "projects/123456/secrets/sqlhost");
    }

    #[test]
    fn eleven_services_are_expected_enabled() {
        assert_eq!(ENABLED_SERVICES.len(), 11);
    }
}
