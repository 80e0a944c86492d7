//! Transformation directive identifiers and the Java upgrade path.

use porter_error::JobError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

static DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("Valid directive regex"));

/// Identifier of one transformation the engine knows how to apply.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct Directive(String);

impl Directive {
    /// Validate and wrap a directive identifier.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidRequest` job error if the identifier is empty or
    /// contains characters outside `[A-Za-z0-9_.-]`.
    pub fn new(id: impl Into<String>) -> Result<Self, JobError> {
        let id = id.into();
        if !DIRECTIVE.is_match(&id) {
            return Err(JobError::invalid_request(format!(
                "invalid directive identifier '{}'",
                id
            )));
        }
        Ok(Self(id))
    }

    /// The identifier as passed to the engine.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Directive {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validate a directive list supplied with a migration request.
///
/// The list must be non-empty, every identifier well formed, and no
/// identifier repeated. Order is preserved.
///
/// # Examples
///
/// ```
/// use porter_core::validate_directives;
///
/// let ok = validate_directives(&["java_version_upgrade".to_string()]).unwrap();
/// assert_eq!(ok.len(), 1);
/// assert!(validate_directives(&[]).is_err());
/// ```
pub fn validate_directives(ids: &[String]) -> Result<Vec<Directive>, JobError> {
    if ids.is_empty() {
        return Err(JobError::invalid_request("directive list is empty"));
    }
    let mut seen = HashSet::new();
    ids.iter()
        .map(|id| {
            if !seen.insert(id.as_str()) {
                return Err(JobError::invalid_request(format!(
                    "directive '{}' listed more than once",
                    id
                )));
            }
            Directive::new(id.clone())
        })
        .collect()
}

const JAVA: &str = "org.openrewrite.java";

/// Directives that move a Java codebase from `source` to `target`.
///
/// Steps are cumulative: a 7 to 21 upgrade picks up every intermediate
/// step. Static analysis cleanup and formatting are always appended.
///
/// # Examples
///
/// ```
/// use porter_core::upgrade_directives;
///
/// let path = upgrade_directives(11, 17);
/// let ids: Vec<&str> = path.iter().map(|d| d.as_str()).collect();
/// assert_eq!(ids[0], "org.openrewrite.java.migrate.UpgradeToJava17");
/// assert!(ids.contains(&"org.openrewrite.java.format.AutoFormat"));
/// ```
pub fn upgrade_directives(source: u32, target: u32) -> Vec<Directive> {
    let mut ids: Vec<String> = Vec::new();

    if source <= 7 && target >= 8 {
        ids.push(format!("{}.migrate.Java8TypeAnnotations", JAVA));
        ids.push(format!("{}.migrate.cobertura.RemoveCoberturaMavenPlugin", JAVA));
    }
    if source <= 8 && target >= 11 {
        ids.push(format!("{}.migrate.javax.AddJaxbDependencies", JAVA));
        ids.push(format!("{}.migrate.javax.AddJaxwsDependencies", JAVA));
    }
    if source <= 11 && target >= 17 {
        ids.push(format!("{}.migrate.UpgradeToJava17", JAVA));
    }
    if target >= 21 {
        ids.push(format!("{}.migrate.UpgradeToJava21", JAVA));
    }
    ids.push(format!("{}.cleanup.CommonStaticAnalysis", JAVA));
    ids.push(format!("{}.format.AutoFormat", JAVA));

    ids.into_iter().map(Directive).collect()
}
