//! Build file recognition and Java version detection.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Build files read during analysis, in lookup order.
pub const BUILD_FILES: [&str; 3] = ["pom.xml", "build.gradle", "build.gradle.kts"];

static MAVEN_VERSION: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        "maven.compiler.release",
        "maven.compiler.source",
        "maven.compiler.target",
        "java.version",
        "release",
        "source",
    ]
    .iter()
    .map(|tag| {
        let tag = regex::escape(tag);
        Regex::new(&format!(r"<{tag}>\s*([0-9][0-9._]*)\s*</{tag}>"))
            .expect("Valid build file regex")
    })
    .collect()
});

static GRADLE_VERSION: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"JavaLanguageVersion\.of\(\s*(\d+)\s*\)",
        r"jvmToolchain\(\s*(\d+)\s*\)",
        r#"(?:sourceCompatibility|targetCompatibility)\s*=\s*['"]?([0-9][0-9._]*)['"]?"#,
        r"JavaVersion\.VERSION_([0-9_]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Valid build file regex"))
    .collect()
});

/// Build system a repository uses.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BuildTool {
    /// `pom.xml`
    Maven,
    /// `build.gradle` or `build.gradle.kts`
    Gradle,
}

impl BuildTool {
    /// The tool a build file name belongs to.
    pub fn for_file(name: &str) -> Option<Self> {
        match name {
            "pom.xml" => Some(BuildTool::Maven),
            "build.gradle" | "build.gradle.kts" => Some(BuildTool::Gradle),
            _ => None,
        }
    }

    /// The Java release a build file compiles for.
    ///
    /// Legacy `1.x` spellings are folded to `x`, so `1.8` and
    /// `VERSION_1_8` both read as 8. Returns `None` when no version is
    /// declared or it is only a property reference.
    pub fn detect_java_version(self, content: &str) -> Option<u32> {
        let patterns = match self {
            BuildTool::Maven => &*MAVEN_VERSION,
            BuildTool::Gradle => &*GRADLE_VERSION,
        };
        patterns
            .iter()
            .filter_map(|pattern| pattern.captures(content))
            .find_map(|captures| captures.get(1).and_then(|m| normalize(m.as_str())))
    }
}

/// `1.8` -> 8, `1_8` -> 8, `17.0.2` -> 17.
fn normalize(raw: &str) -> Option<u32> {
    let raw = raw.trim().replace('_', ".");
    let raw = match raw.strip_prefix("1.") {
        Some(rest) if !rest.is_empty() => rest,
        _ => raw.as_str(),
    };
    raw.split('.').next()?.parse().ok().filter(|version| *version > 0)
}
