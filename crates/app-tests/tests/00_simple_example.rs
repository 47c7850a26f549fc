//! Simple example verification.
//!
//! Applies the blueprint, verifies a second apply would be a no-op, then
//! checks labels, resource existence, and enabled services through gcloud.

#![cfg(feature = "e2e")]

use app_tests::fixtures::blueprint::ENABLED_SERVICES;
use app_tests::fixtures::ThreeTierApp;
use blueprint_test::expect::{verify_all, verify_services_enabled};
use blueprint_test::gcloud::Gcloud;
use blueprint_test::terraform::Terraform;
use serial_test::serial;

/// Run all gcloud-backed assertions, collecting failures as strings so
/// teardown always happens before the test verdict.
fn verify(app: &ThreeTierApp, tf: &Terraform) -> anyhow::Result<Vec<String>> {
    tf.verify_no_drift()?;

    let sql_name = tf.output("sqlservername")?;
    let project_id = tf.setup_output("project_id")?;
    let project_number = tf.setup_output("project_number")?;

    let gcloud = Gcloud::new(&project_id);

    let mut failures: Vec<String> = Vec::new();
    failures.extend(
        verify_all(&gcloud, &app.label_expectations(&sql_name))
            .into_iter()
            .map(|e| e.to_string()),
    );
    failures.extend(
        verify_all(
            &gcloud,
            &app.existence_expectations(&sql_name, &project_id, &project_number),
        )
        .into_iter()
        .map(|e| e.to_string()),
    );
    failures.extend(
        verify_services_enabled(&gcloud, ENABLED_SERVICES)
            .into_iter()
            .map(|e| e.to_string()),
    );

    Ok(failures)
}

#[tokio::test]
#[serial]
async fn simple_example_provisions_expected_resources() {
    app_tests::init_tracing();

    let app = ThreeTierApp::from_env().expect("blueprint fixture env vars must be set");
    let tf = app.terraform();

    tf.init().expect("terraform init should succeed");
    tf.apply().expect("terraform apply should succeed");

    // Verify before teardown, assert after, so resources never leak on a
    // failed assertion.
    let verified = verify(&app, &tf);

    tf.destroy().expect("terraform destroy should succeed");

    let failures = verified.expect("verification queries should succeed");
    assert!(
        failures.is_empty(),
        "blueprint verification failed:\n{}",
        failures.join("\n")
    );
}
