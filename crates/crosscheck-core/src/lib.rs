//! crosscheck core library
//!
//! Runs a target project's historical tags against the current version of a
//! source artifact and reports which combinations still build and verify.

pub mod capability;
pub mod command;
pub mod error;
pub mod exec;
pub mod fakes;
pub mod model;
pub mod orchestrator;
pub mod project;
pub mod report;
pub mod telemetry;
pub mod versioning;

pub use capability::{
    BackendProvider, BackendRegistry, Build, Capability, MavenGit, MavenGitProvider,
    NoOpCapability, ToolConfig, Vcs,
};
pub use command::{Charset, GitCommandBuilder, MavenCommandBuilder, TextCommand};
pub use error::{CompatError, ExecError, ParseError, Result};
pub use exec::{LineReducer, ProcessExecutor};
pub use model::{
    local_path, parse_local_date, Filter, Job, Project, Source, Tag, Target, Version,
    VersionContext,
};
pub use orchestrator::{CompatibilityOrchestrator, JobEngine, NoOpJobEngine};
pub use project::ProjectContext;
pub use report::{ExitStatus, Report, ReportBuilder, ReportItem};
pub use telemetry::init_tracing;
pub use versioning::{
    LexicalVersioning, NoOpVersioning, SemverVersioning, Versioning, VersioningRegistry,
};
