//! Tests for build file recognition and Java version detection.

use porter_core::{BUILD_FILES, BuildTool};

#[test]
fn test_build_files_map_to_tools() {
    let tools: Vec<_> = BUILD_FILES
        .iter()
        .map(|name| BuildTool::for_file(name))
        .collect();
    assert_eq!(
        tools,
        vec![
            Some(BuildTool::Maven),
            Some(BuildTool::Gradle),
            Some(BuildTool::Gradle)
        ]
    );
    assert_eq!(BuildTool::for_file("Makefile"), None);
    assert_eq!(BuildTool::Maven.to_string(), "maven");
}

#[test]
fn test_maven_compiler_properties() {
    let pom = r#"
<project>
  <properties>
    <maven.compiler.source>1.8</maven.compiler.source>
    <maven.compiler.target>1.8</maven.compiler.target>
  </properties>
</project>
"#;
    assert_eq!(BuildTool::Maven.detect_java_version(pom), Some(8));
}

#[test]
fn test_maven_release_wins_over_source() {
    let pom = r#"
<properties>
  <maven.compiler.source>11</maven.compiler.source>
  <maven.compiler.release>17</maven.compiler.release>
</properties>
"#;
    assert_eq!(BuildTool::Maven.detect_java_version(pom), Some(17));
}

#[test]
fn test_maven_property_reference_falls_through() {
    let pom = r#"
<properties>
  <java.version>11</java.version>
</properties>
<plugin>
  <artifactId>maven-compiler-plugin</artifactId>
  <configuration>
    <source>${java.version}</source>
  </configuration>
</plugin>
"#;
    assert_eq!(BuildTool::Maven.detect_java_version(pom), Some(11));
}

#[test]
fn test_maven_compiler_plugin_source() {
    let pom = "<configuration><source>1.7</source><target>1.7</target></configuration>";
    assert_eq!(BuildTool::Maven.detect_java_version(pom), Some(7));
}

#[test]
fn test_gradle_spellings() {
    let cases = [
        ("sourceCompatibility = '1.8'", 8),
        ("sourceCompatibility = 11", 11),
        ("sourceCompatibility = JavaVersion.VERSION_1_8", 8),
        ("targetCompatibility = JavaVersion.VERSION_17", 17),
        (
            "java {\n    toolchain {\n        languageVersion = JavaLanguageVersion.of(21)\n    }\n}",
            21,
        ),
        (
            "java { toolchain { languageVersion.set(JavaLanguageVersion.of(17)) } }",
            17,
        ),
        ("kotlin { jvmToolchain(11) }", 11),
    ];
    for (content, expected) in cases {
        assert_eq!(
            BuildTool::Gradle.detect_java_version(content),
            Some(expected),
            "{}",
            content
        );
    }
}

#[test]
fn test_no_declared_version() {
    assert_eq!(BuildTool::Maven.detect_java_version("<project/>"), None);
    assert_eq!(
        BuildTool::Gradle.detect_java_version("plugins { id 'java' }"),
        None
    );
}
