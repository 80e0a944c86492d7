//! Tests for the process-backed transformation engine.
#![cfg(unix)]

use porter_core::{ChangeKind, Directive};
use porter_error::FailureKind;
use porter_interface::TransformationEngine;
use porter_platform::ProcessEngine;

fn script(body: &str) -> ProcessEngine {
    // `sh -c <body> porter-engine <checkout> <directives...>`
    ProcessEngine::new(
        "sh",
        vec!["-c".to_string(), body.to_string(), "porter-engine".to_string()],
    )
}

fn directives() -> Vec<Directive> {
    vec![Directive::new("org.openrewrite.java.migrate.UpgradeToJava17").unwrap()]
}

#[tokio::test]
async fn test_engine_output_is_parsed() {
    let checkout = tempfile::tempdir().unwrap();
    let engine = script(
        r#"printf '%s' '{"change_set":{"files":[{"path":"pom.xml","kind":"modified"}]},"report":{"directives_applied":["'"$2"'"],"files_modified":1,"issues_fixed":2}}'"#,
    );

    let output = engine.transform(checkout.path(), &directives()).await.unwrap();

    assert_eq!(output.change_set.len(), 1);
    assert_eq!(output.change_set.files[0].kind, ChangeKind::Modified);
    assert_eq!(output.report.issues_fixed, 2);
    assert_eq!(
        output.report.directives_applied,
        vec!["org.openrewrite.java.migrate.UpgradeToJava17"]
    );
}

#[tokio::test]
async fn test_nonzero_exit_carries_diagnostics() {
    let checkout = tempfile::tempdir().unwrap();
    let engine = script("echo 'App.java:3: cannot find symbol' >&2; echo '' >&2; exit 3");

    let err = engine
        .transform(checkout.path(), &directives())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::TransformationFailure);
    assert_eq!(err.diagnostics, vec!["App.java:3: cannot find symbol"]);
}

#[tokio::test]
async fn test_garbage_output_is_a_transformation_failure() {
    let checkout = tempfile::tempdir().unwrap();
    let engine = script("echo 'not json'");

    let err = engine
        .transform(checkout.path(), &directives())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::TransformationFailure);
    assert!(err.message.contains("unreadable engine output"));
}

#[tokio::test]
async fn test_missing_command_is_a_transformation_failure() {
    let checkout = tempfile::tempdir().unwrap();
    let engine = ProcessEngine::new("porter-no-such-engine", Vec::new());

    let err = engine
        .transform(checkout.path(), &directives())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::TransformationFailure);
}
