//! Blueprint Integration-Test Framework
//!
//! This crate provides the building blocks for integration tests that provision
//! real cloud infrastructure from a Terraform blueprint, assert on its resulting
//! state through the `gcloud` CLI, and check deployed HTTP endpoints for liveness.
//!
//! # Modules
//!
//! - [`terraform`]: Terraform invocation (init/apply/plan/destroy/output) with
//!   per-test retryable-error policies
//! - [`gcloud`]: `gcloud` describe/list queries returning JSON, with dotted
//!   field-path extraction
//! - [`expect`]: declarative resource expectation records and a generic verify
//!   routine
//! - [`health`]: bounded-retry HTTP liveness polling for deployment URLs
//!
//! # Prerequisites
//!
//! 1. `terraform` and `gcloud` in PATH, authenticated against the target project
//! 2. A blueprint root directory containing the Terraform configuration under test
//!
//! # Usage
//!
//! ```bash
//! # Framework unit tests only (no cloud access required)
//! cargo test -p blueprint-test
//! ```

pub mod expect;
pub mod gcloud;
pub mod health;
pub mod terraform;
