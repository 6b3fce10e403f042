//! Side-effect-free descriptions of external tool invocations.
//!
//! Builders assemble argument vectors in a fixed order:
//! binary, global flags, working-directory flag, command tokens,
//! positional parameters, then key/value properties. Nothing is executed here;
//! see [`crate::exec`] for that.

pub mod git;
pub mod maven;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use git::GitCommandBuilder;
pub use maven::MavenCommandBuilder;

/// Text encoding of a process's standard output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Charset {
    #[default]
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value.
    Latin1,
}

impl Charset {
    /// Decode one line of output, or `None` if it is not valid in this charset.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Charset::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            Charset::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Latin1 => "ISO-8859-1",
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully resolved subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextCommand {
    argv: Vec<String>,
    charset: Charset,
}

impl TextCommand {
    /// `argv[0]` is the program. Builders are the usual way to obtain one.
    pub fn new(argv: Vec<String>, charset: Charset) -> Self {
        Self { argv, charset }
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }
}

impl fmt::Display for TextCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv.join(" "))
    }
}
