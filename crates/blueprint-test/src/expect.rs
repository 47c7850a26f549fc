//! Declarative resource expectations.
//!
//! An expectation names a cloud resource, how to query it, and the check to
//! run against the query result. Tests build an ordered list of records and
//! hand them to one generic verify routine instead of duplicating
//! query-and-compare logic per resource type.

use crate::gcloud::{first_match, get_string, Gcloud, GcloudError, Scope};
use serde_json::Value;
use thiserror::Error;

/// Expectation failures.
#[derive(Debug, Error)]
pub enum ExpectError {
    #[error("{case}: {source}")]
    Gcloud {
        case: String,
        #[source]
        source: GcloudError,
    },

    #[error("{case}: query returned no results")]
    NoResults { case: String },

    #[error("{case}: field {field:?} missing from query result")]
    FieldMissing { case: String, field: String },

    #[error("{case}: expected {field:?} to be {expected:?}, got {actual:?}")]
    Mismatch {
        case: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("service {service:?} not found in enabled services listing")]
    ServiceNotFound { service: String },

    #[error("service {service:?} should be ENABLED, state is {state:?}")]
    ServiceNotEnabled { service: String, state: String },
}

/// The check applied to a resource query result.
#[derive(Debug, Clone)]
pub enum Check {
    /// The first matching result must render `field` to `expected`.
    ///
    /// Covers both label assertions (`labels.three-tier-app == "true"`) and
    /// existence assertions (`name == projects/…/secrets/sqlhost`).
    FieldEquals { field: String, expected: String },
}

impl Check {
    /// Evaluate against a normalized query result.
    pub fn evaluate(&self, case: &str, results: &[Value]) -> Result<(), ExpectError> {
        match self {
            Check::FieldEquals { field, expected } => {
                if first_match(results, field, expected).is_some() {
                    return Ok(());
                }

                let first = results.first().ok_or_else(|| ExpectError::NoResults {
                    case: case.to_string(),
                })?;

                let actual =
                    get_string(first, field).ok_or_else(|| ExpectError::FieldMissing {
                        case: case.to_string(),
                        field: field.clone(),
                    })?;

                Err(ExpectError::Mismatch {
                    case: case.to_string(),
                    field: field.clone(),
                    expected: expected.clone(),
                    actual,
                })
            }
        }
    }
}

/// One declarative expectation record.
#[derive(Debug, Clone)]
pub struct ResourceExpectation {
    /// Test-case label used in failure messages.
    pub name: String,
    /// gcloud collection, e.g. `"run services"` or `"secrets"`.
    pub collection: String,
    /// Resource name passed to `describe`.
    pub resource: String,
    /// Location scope for the query.
    pub scope: Scope,
    /// Check applied to the describe result.
    pub check: Check,
}

impl ResourceExpectation {
    /// Expect the resource to carry a label rendering to `"true"`.
    pub fn label_true(
        name: impl Into<String>,
        collection: impl Into<String>,
        resource: impl Into<String>,
        scope: Scope,
        label_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            resource: resource.into(),
            scope,
            check: Check::FieldEquals {
                field: label_path.into(),
                expected: "true".into(),
            },
        }
    }

    /// Expect a field of the resource to equal a value.
    pub fn field_equals(
        name: impl Into<String>,
        collection: impl Into<String>,
        resource: impl Into<String>,
        scope: Scope,
        field: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            resource: resource.into(),
            scope,
            check: Check::FieldEquals {
                field: field.into(),
                expected: expected.into(),
            },
        }
    }

    /// Describe the resource and evaluate the check.
    pub fn verify(&self, gcloud: &Gcloud) -> Result<(), ExpectError> {
        let results = gcloud
            .describe(&self.collection, &self.resource, &self.scope)
            .map_err(|source| ExpectError::Gcloud {
                case: self.name.clone(),
                source,
            })?;
        self.check.evaluate(&self.name, &results)
    }
}

/// Verify every expectation in order, collecting failures.
pub fn verify_all(gcloud: &Gcloud, expectations: &[ResourceExpectation]) -> Vec<ExpectError> {
    expectations
        .iter()
        .filter_map(|e| e.verify(gcloud).err())
        .collect()
}

/// Check one service against an enabled-services listing.
pub fn evaluate_service_enabled(services: &[Value], service: &str) -> Result<(), ExpectError> {
    let config_name = format!("{service}.googleapis.com");

    let Some(entry) = first_match(services, "config.name", &config_name) else {
        return Err(ExpectError::ServiceNotFound {
            service: service.to_string(),
        });
    };

    let state = get_string(entry, "state").unwrap_or_default();
    if state != "ENABLED" {
        return Err(ExpectError::ServiceNotEnabled {
            service: service.to_string(),
            state,
        });
    }

    Ok(())
}

/// List enabled services once and check each expected service against it.
pub fn verify_services_enabled(gcloud: &Gcloud, services: &[&str]) -> Vec<ExpectError> {
    let listing = match gcloud.list("services", &Scope::Default) {
        Ok(listing) => listing,
        Err(source) => {
            return vec![ExpectError::Gcloud {
                case: "services list".into(),
                source,
            }]
        }
    };

    services
        .iter()
        .filter_map(|s| evaluate_service_enabled(&listing, s).err())
        .collect()
}
