//! MySQL variant verification.
//!
//! Applies the blueprint with the retryable-error policy (Cloud SQL teardown
//! and service enablement are eventually consistent), verifies no drift, then
//! polls the deployed endpoint until it serves the Todo page.

#![cfg(feature = "e2e")]

use app_tests::fixtures::blueprint::TODO_MARKER;
use app_tests::fixtures::ThreeTierApp;
use blueprint_test::health::{poll_deployment_url, PollConfig};
use blueprint_test::terraform::Terraform;
use serial_test::serial;

async fn verify(tf: &Terraform) -> anyhow::Result<()> {
    tf.verify_no_drift()?;

    let endpoint = tf.output("endpoint")?;
    let client = reqwest::Client::new();
    poll_deployment_url(&client, &endpoint, TODO_MARKER, &PollConfig::default()).await?;

    Ok(())
}

#[tokio::test]
#[serial]
async fn mysql_deployment_serves_todo_page() {
    app_tests::init_tracing();

    let app = ThreeTierApp::from_env().expect("blueprint fixture env vars must be set");
    let tf = app
        .terraform_with_retries()
        .expect("retry policy should build");

    tf.init().expect("terraform init should succeed");
    tf.apply().expect("terraform apply should succeed");

    let verified = verify(&tf).await;

    tf.destroy().expect("terraform destroy should succeed");

    verified.expect("deployment URL should serve the Todo page");
}
