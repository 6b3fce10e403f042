//! Argument builder for the git CLI.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::command::{Charset, TextCommand};

/// Fluent builder for a git invocation.
///
/// Argument order: `git`, `-c key=value` globals, `-C <dir>`, subcommand tokens,
/// positional parameters, then options (`--quiet` first). git accepts options
/// after positionals for every subcommand used here.
#[derive(Debug, Clone)]
pub struct GitCommandBuilder {
    binary: String,
    config: BTreeMap<String, String>,
    directory: Option<PathBuf>,
    quiet: bool,
    command: Vec<String>,
    params: Vec<String>,
    options: Vec<(String, Option<String>)>,
    charset: Charset,
}

impl Default for GitCommandBuilder {
    fn default() -> Self {
        Self {
            binary: "git".to_string(),
            config: BTreeMap::new(),
            directory: None,
            quiet: false,
            command: Vec::new(),
            params: Vec::new(),
            options: Vec::new(),
            charset: Charset::Utf8,
        }
    }
}

impl GitCommandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the git executable.
    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Per-invocation configuration, emitted as `-c key=value`.
    pub fn config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Run as if started in `dir` (`-C <dir>`).
    pub fn directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.directory = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Append a subcommand token, e.g. `clone` or `for-each-ref`.
    pub fn command(mut self, token: impl Into<String>) -> Self {
        self.command.push(token.into());
        self
    }

    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Bare option, emitted as `--name`.
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.options.push((name.into(), None));
        self
    }

    /// Valued option, emitted as `--name=value`.
    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((name.into(), Some(value.into())));
        self
    }

    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn build(self) -> TextCommand {
        let mut argv = vec![self.binary];

        for (key, value) in self.config {
            argv.push("-c".to_string());
            argv.push(format!("{key}={value}"));
        }

        if let Some(dir) = self.directory {
            argv.push("-C".to_string());
            argv.push(dir.to_string_lossy().into_owned());
        }

        argv.extend(self.command);
        argv.extend(self.params);

        if self.quiet {
            argv.push("--quiet".to_string());
        }
        for (name, value) in self.options {
            match value {
                Some(value) => argv.push(format!("--{name}={value}")),
                None => argv.push(format!("--{name}")),
            }
        }

        TextCommand::new(argv, self.charset)
    }
}
