//! Tests for the environment credential store.

use porter_core::CredentialRef;
use porter_interface::CredentialStore;
use porter_platform::EnvCredentials;

#[test]
fn test_unset_variable_does_not_resolve() {
    let store = EnvCredentials::new();
    assert!(
        store
            .resolve(&CredentialRef::new("PORTER_TEST_SURELY_UNSET_TOKEN"))
            .is_none()
    );
}

#[test]
fn test_set_variable_resolves() {
    // PATH is set in every test environment.
    let store = EnvCredentials::new();
    let token = store.resolve(&CredentialRef::new("PATH")).unwrap();
    assert!(!token.expose().is_empty());
    assert_eq!(format!("{:?}", token), "AccessToken(***)");
}
