//! Three-Tier Web App Blueprint Tests
//!
//! This crate holds the integration tests for the three-tier web app
//! Terraform blueprint. The tests apply the blueprint against a real project,
//! assert on the resulting cloud resources through `gcloud`, poll the
//! deployed endpoint for liveness, and tear everything down.
//!
//! # Prerequisites
//!
//! 1. `terraform` and `gcloud` in PATH, authenticated against a test project
//! 2. `THREE_TIER_APP_TF_DIR` pointing at the blueprint root
//! 3. `THREE_TIER_APP_SETUP_DIR` pointing at the setup stack (provides
//!    `project_id` / `project_number` outputs)
//!
//! # Usage
//!
//! ```bash
//! # From repo root - runs 0 e2e tests (no default features)
//! cargo test -p app-tests
//!
//! # Full blueprint verification (provisions real infrastructure)
//! cargo test -p app-tests --features e2e -- --test-threads=1
//! ```

pub mod fixtures;

/// Initialize tracing for a test binary.
///
/// Respects `RUST_LOG`; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
