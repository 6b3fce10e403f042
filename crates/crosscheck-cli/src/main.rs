//! crosscheck - cross-version compatibility testing
//!
//! Rebuilds each tagged release of downstream projects against the current
//! version of a library and reports which combinations still verify.
//!
//! ## Commands
//!
//! - `run`: Execute a job file and render its report
//! - `tags`: Show the (tag, version) pairs a filter selects from a repository
//! - `backends`: List build backends and whether their tooling is installed

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};

use crosscheck_core::{
    BackendRegistry, Capability, CompatibilityOrchestrator, Filter, Job, JobEngine, Project,
    ProjectContext, Source, ToolConfig, VersioningRegistry,
};
use crosscheck_report::{write_report, FormatterRegistry, MarkdownFormatter};

#[derive(Parser)]
#[command(name = "crosscheck")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cross-version compatibility test matrix", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    tools: ToolArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the external tools the backend shells out to.
#[derive(Args, Debug, Default)]
struct ToolArgs {
    /// git executable
    #[arg(long, env = "CROSSCHECK_GIT", global = true)]
    git: Option<String>,

    /// Maven executable, e.g. ./mvnw
    #[arg(long, env = "CROSSCHECK_MVN", global = true)]
    maven: Option<String>,

    /// Show full tool output instead of passing quiet flags
    #[arg(long, global = true)]
    loud: bool,
}

impl ToolArgs {
    fn config(&self) -> ToolConfig {
        let defaults = ToolConfig::default();
        ToolConfig {
            git: self.git.clone().unwrap_or(defaults.git),
            maven: self.maven.clone().unwrap_or(defaults.maven),
            quiet: !self.loud,
            charset: defaults.charset,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a compatibility job
    Run {
        /// Job file (JSON)
        #[arg(short, long)]
        job: PathBuf,

        /// Report format
        #[arg(short, long, default_value = "markdown")]
        format: String,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Scratch directory for clones (overrides the job file)
        #[arg(long, env = "CROSSCHECK_WORKDIR")]
        working_dir: Option<PathBuf>,

        /// Backend to use (overrides the job file)
        #[arg(long, env = "CROSSCHECK_BACKEND")]
        backend: Option<String>,

        /// Exit non-zero when any combination fails verification
        #[arg(long)]
        strict: bool,
    },

    /// List the tags a filter selects and the version at each
    Tags {
        /// Repository URI
        uri: String,

        /// Substring the tag name must contain
        #[arg(long)]
        name: Option<String>,

        /// Earliest tag date (YYYY, YYYY-MM or YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Latest tag date (YYYY, YYYY-MM or YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Keep only the most recent N matches
        #[arg(short, long)]
        limit: Option<usize>,

        /// Backend to use
        #[arg(long, env = "CROSSCHECK_BACKEND")]
        backend: Option<String>,
    },

    /// List registered backends and their availability
    Backends,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    crosscheck_core::init_tracing(cli.json, level);

    let backends = BackendRegistry::with_defaults(cli.tools.config());

    match cli.command {
        Commands::Run {
            job,
            format,
            output,
            working_dir,
            backend,
            strict,
        } => {
            cmd_run(
                &backends,
                &job,
                &format,
                output.as_deref(),
                working_dir,
                backend,
                strict,
            )
            .await
        }
        Commands::Tags {
            uri,
            name,
            from,
            to,
            limit,
            backend,
        } => {
            let filter = Filter::parse(name, from.as_deref(), to.as_deref(), limit)
                .context("Invalid tag filter")?;
            cmd_tags(&backends, &uri, filter, backend.as_deref()).await
        }
        Commands::Backends => cmd_backends(&backends).await,
    }
}

/// Read a job file; a relative `working_dir` is taken relative to the file.
fn load_job(path: &Path) -> Result<Job> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file {:?}", path))?;
    let mut job: Job = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse job file {:?}", path))?;

    if job.working_dir.is_relative() {
        if let Some(parent) = path.parent() {
            job.working_dir = parent.join(&job.working_dir);
        }
    }
    Ok(job)
}

/// Run a job and render its report
async fn cmd_run(
    backends: &BackendRegistry,
    job_path: &Path,
    format: &str,
    output: Option<&Path>,
    working_dir: Option<PathBuf>,
    backend: Option<String>,
    strict: bool,
) -> Result<()> {
    let mut job = load_job(job_path)?;
    if let Some(dir) = working_dir {
        job.working_dir = dir;
    }

    let versioning = VersioningRegistry::with_defaults();
    let formatters = FormatterRegistry::with_defaults()
        .register(Arc::new(MarkdownFormatter::for_job(&job, &versioning)));
    let formatter = formatters.get(format)?;

    let preferred = backend.or_else(|| job.backend.clone());
    let capability = backends.select_available(preferred.as_deref()).await?;
    info!(
        backend = capability.id(),
        pairs = job.pair_count(),
        working_dir = %job.working_dir.display(),
        "Running job"
    );

    let engine = CompatibilityOrchestrator::new(capability.clone()).with_versioning(versioning);
    let outcome = engine.run(&job).await;
    capability.close().await?;
    let report = outcome.context("Compatibility job failed")?;

    match output {
        Some(path) => {
            write_report(path, formatter.as_ref(), &report)?;
            println!(
                "Wrote {} report ({} combinations) to {}",
                formatter.id(),
                report.len(),
                path.display()
            );
        }
        None => print!("{}", formatter.render(&report)?),
    }

    if strict && report.failed() > 0 {
        bail!(
            "{} of {} combinations failed verification",
            report.failed(),
            report.len()
        );
    }
    Ok(())
}

/// Clone a repository and print the selected (tag, version) pairs
async fn cmd_tags(
    backends: &BackendRegistry,
    uri: &str,
    filter: Filter,
    backend: Option<&str>,
) -> Result<()> {
    let capability = backends.select_available(backend).await?;
    let scratch = tempfile::tempdir().context("Failed to create scratch directory")?;
    let lines = list_tags(capability.as_ref(), uri, filter, scratch.path()).await;
    capability.close().await?;

    let lines = lines?;
    if lines.is_empty() {
        println!("No tags selected in {}", uri);
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

async fn list_tags(
    capability: &dyn Capability,
    uri: &str,
    filter: Filter,
    scratch: &Path,
) -> Result<Vec<String>> {
    let source = Source {
        uri: uri.to_string(),
        versioning: String::new(),
        filter,
    };
    let context = ProjectContext::open_remote(Project::Source(&source), scratch, capability)
        .await
        .with_context(|| format!("Failed to resolve tags of {}", uri))?;

    let lines = context
        .versions()
        .iter()
        .map(|v| format!("{}\t{}", v.tag, v.version))
        .collect();
    context.clean().await?;
    Ok(lines)
}

/// List backends
async fn cmd_backends(backends: &BackendRegistry) -> Result<()> {
    for (id, available) in backends.probe_all().await {
        let status = if available { "available" } else { "unavailable" };
        println!("{:<12} {}", id, status);
    }
    Ok(())
}
