//! Argument builder for the Maven CLI.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::command::{Charset, TextCommand};

const POM: &str = "pom.xml";

/// Fluent builder for a Maven invocation.
///
/// Argument order: `mvn`, `-B`, `-q`, `-f <dir>/pom.xml`, goals, parameters,
/// then `-Dkey=value` properties sorted by key.
#[derive(Debug, Clone)]
pub struct MavenCommandBuilder {
    binary: String,
    batch: bool,
    quiet: bool,
    directory: Option<PathBuf>,
    goals: Vec<String>,
    params: Vec<String>,
    properties: BTreeMap<String, String>,
    charset: Charset,
}

impl Default for MavenCommandBuilder {
    fn default() -> Self {
        Self {
            binary: "mvn".to_string(),
            batch: true,
            quiet: false,
            directory: None,
            goals: Vec::new(),
            params: Vec::new(),
            properties: BTreeMap::new(),
            charset: Charset::Utf8,
        }
    }
}

impl MavenCommandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the Maven executable, e.g. `./mvnw`.
    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Non-interactive mode (`-B`); on by default.
    pub fn batch(mut self, batch: bool) -> Self {
        self.batch = batch;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Project directory; its `pom.xml` is passed with `-f`.
    pub fn directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.directory = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Append a goal or phase, e.g. `verify` or `help:evaluate`.
    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goals.push(goal.into());
        self
    }

    /// Raw parameter placed after the goals, e.g. `-Pci`.
    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    /// System property, emitted as `-Dkey=value`.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn build(self) -> TextCommand {
        let mut argv = vec![self.binary];

        if self.batch {
            argv.push("-B".to_string());
        }
        if self.quiet {
            argv.push("-q".to_string());
        }
        if let Some(dir) = self.directory {
            argv.push("-f".to_string());
            argv.push(dir.join(POM).to_string_lossy().into_owned());
        }

        argv.extend(self.goals);
        argv.extend(self.params);

        for (key, value) in self.properties {
            argv.push(format!("-D{key}={value}"));
        }

        TextCommand::new(argv, self.charset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_batch_mode() {
        let cmd = MavenCommandBuilder::new().goal("verify").build();
        assert_eq!(cmd.argv(), ["mvn", "-B", "verify"]);
    }

    #[test]
    fn test_evaluate_expression_argv() {
        let cmd = MavenCommandBuilder::new()
            .property("forceStdout", "true")
            .property("expression", "project.version")
            .goal("help:evaluate")
            .directory("/work/app")
            .quiet(true)
            .build();
        assert_eq!(
            cmd.argv(),
            [
                "mvn",
                "-B",
                "-q",
                "-f",
                "/work/app/pom.xml",
                "help:evaluate",
                "-Dexpression=project.version",
                "-DforceStdout=true",
            ]
        );
    }

    #[test]
    fn test_params_follow_goals() {
        let cmd = MavenCommandBuilder::new()
            .binary("./mvnw")
            .batch(false)
            .param("-Pci")
            .goal("clean")
            .goal("install")
            .property("skipTests", "true")
            .build();
        assert_eq!(
            cmd.argv(),
            ["./mvnw", "clean", "install", "-Pci", "-DskipTests=true"]
        );
    }

    #[test]
    fn test_property_overrides_keep_last_value() {
        let cmd = MavenCommandBuilder::new()
            .property("lib.version", "1.0")
            .property("lib.version", "2.0")
            .build();
        assert_eq!(cmd.argv(), ["mvn", "-B", "-Dlib.version=2.0"]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let make = || {
            MavenCommandBuilder::new()
                .directory("/work/app")
                .goal("versions:set-property")
                .property("property", "lib.version")
                .property("newVersion", "2.3.4")
                .build()
        };
        assert_eq!(make().argv(), make().argv());
    }
}
