//! Tests for directive validation and upgrade paths.

use porter_core::{Directive, upgrade_directives, validate_directives};

fn ids(directives: &[Directive]) -> Vec<&str> {
    directives.iter().map(|d| d.as_str()).collect()
}

#[test]
fn test_upgrade_8_to_17() {
    let path = upgrade_directives(8, 17);
    assert_eq!(
        ids(&path),
        vec![
            "org.openrewrite.java.migrate.javax.AddJaxbDependencies",
            "org.openrewrite.java.migrate.javax.AddJaxwsDependencies",
            "org.openrewrite.java.migrate.UpgradeToJava17",
            "org.openrewrite.java.cleanup.CommonStaticAnalysis",
            "org.openrewrite.java.format.AutoFormat",
        ]
    );
}

#[test]
fn test_upgrade_7_to_21_is_cumulative() {
    let path = upgrade_directives(7, 21);
    assert_eq!(path.len(), 8);
    assert_eq!(path[0].as_str(), "org.openrewrite.java.migrate.Java8TypeAnnotations");
    assert!(ids(&path).contains(&"org.openrewrite.java.migrate.UpgradeToJava21"));
}

#[test]
fn test_upgrade_same_version_keeps_cleanup() {
    let path = upgrade_directives(17, 17);
    assert_eq!(
        ids(&path),
        vec![
            "org.openrewrite.java.cleanup.CommonStaticAnalysis",
            "org.openrewrite.java.format.AutoFormat",
        ]
    );
}

#[test]
fn test_upgrade_path_passes_validation() {
    let path: Vec<String> = upgrade_directives(7, 21)
        .iter()
        .map(|d| d.to_string())
        .collect();
    assert!(validate_directives(&path).is_ok());
}

#[test]
fn test_validation_rejects_bad_lists() {
    assert!(validate_directives(&[]).is_err());
    assert!(validate_directives(&["".to_string()]).is_err());
    assert!(validate_directives(&["rm -rf".to_string()]).is_err());
    assert!(
        validate_directives(&["java_version_upgrade".to_string(), "java_version_upgrade".to_string()])
            .is_err()
    );
}

#[test]
fn test_validation_preserves_order() {
    let list = vec!["b_second".to_string(), "a_first".to_string()];
    let validated = validate_directives(&list).unwrap();
    assert_eq!(ids(&validated), vec!["b_second", "a_first"]);
}
