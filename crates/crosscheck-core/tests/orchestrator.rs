//! Matrix runs against the in-memory scripted capability.

use std::path::Path;
use std::sync::Arc;

use crosscheck_core::fakes::{Call, ScriptedCapability, ScriptedRepo, Snapshot, Verification};
use crosscheck_core::{
    CompatError, CompatibilityOrchestrator, ExitStatus, Filter, Job, JobEngine, ParseError, Source,
    Target, VersionContext,
};

const LIB_DIR: &str = "/work/lib";
const APP: &str = "mem://acme/app.git";
const PROPERTY: &str = "lib.version";

fn source(uri: &str) -> Source {
    Source {
        uri: uri.to_string(),
        versioning: "semver".to_string(),
        filter: Filter::new(),
    }
}

fn target(uri: &str) -> Target {
    Target {
        uri: uri.to_string(),
        property: PROPERTY.to_string(),
        filter: Filter::new(),
    }
}

fn release(version: &str, pinned: &str) -> Snapshot {
    Snapshot::new(version).with_property(PROPERTY, pinned)
}

/// Three releases of the downstream app, newest first, pinning older libs.
fn app_repo() -> ScriptedRepo {
    ScriptedRepo::new(release("1.1.0-SNAPSHOT", "2.3.0"))
        .with_tag("2024-03-01/v1.0.2", release("1.0.2", "2.3.0"))
        .with_tag("2024-02-01/v1.0.1", release("1.0.1", "2.0.0"))
        .with_tag("2024-01-01/v1.0.0", release("1.0.0", "1.5.0"))
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or_default()
}

/// Fails when the injected lib crosses a major version relative to the pin.
fn major_mismatch(v: &Verification) -> i32 {
    let injected = v.properties.get(PROPERTY).map(String::as_str).unwrap_or("");
    let pinned = v.committed.get(PROPERTY).map(String::as_str).unwrap_or("");
    if major(injected) == major(pinned) {
        0
    } else {
        1
    }
}

fn scratch_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn local_source_against_three_target_tags() {
    let work = tempfile::tempdir().unwrap();
    let cap = Arc::new(
        ScriptedCapability::new()
            .with_local(LIB_DIR, ScriptedRepo::new(Snapshot::new("2.3.4")))
            .with_repo(APP, app_repo())
            .with_verifier(major_mismatch),
    );
    let job = Job::new(work.path())
        .with_source(source(LIB_DIR))
        .with_target(target(APP));

    let report = CompatibilityOrchestrator::new(cap.clone())
        .run(&job)
        .await
        .unwrap();

    assert_eq!(report.len(), 3);
    let tags: Vec<_> = report.iter().map(|i| i.target_version.tag.name()).collect();
    assert_eq!(tags, vec!["v1.0.0", "v1.0.1", "v1.0.2"]);
    let versions: Vec<_> = report
        .iter()
        .map(|i| i.target_version.version.as_str())
        .collect();
    assert_eq!(versions, vec!["1.0.0", "1.0.1", "1.0.2"]);

    for item in &report {
        assert_eq!(item.source_version, VersionContext::working_copy("2.3.4".into()));
        assert_eq!(item.source_uri, LIB_DIR);
        assert_eq!(item.target_uri, APP);
        assert_eq!(item.property, PROPERTY);
    }
    let statuses: Vec<_> = report.iter().map(|i| i.exit_status).collect();
    assert_eq!(
        statuses,
        vec![
            ExitStatus::Failure { code: 1 },
            ExitStatus::Success,
            ExitStatus::Success
        ]
    );
    let baselines: Vec<_> = report.iter().map(|i| i.baseline.as_str()).collect();
    assert_eq!(baselines, vec!["1.5.0", "2.0.0", "2.3.0"]);

    assert_eq!(cap.installed(), vec![(LIB_DIR.to_string(), "2.3.4".to_string())]);
    assert_eq!(scratch_entries(work.path()), 0, "scratch clone should be removed");
}

#[tokio::test]
async fn each_injection_is_verified_then_restored() {
    let work = tempfile::tempdir().unwrap();
    let cap = Arc::new(
        ScriptedCapability::new()
            .with_local(LIB_DIR, ScriptedRepo::new(Snapshot::new("2.3.4")))
            .with_repo(
                APP,
                ScriptedRepo::new(release("1.1.0", "2.3.0"))
                    .with_tag("2024-01-01/v1.0.0", release("1.0.0", "1.5.0")),
            ),
    );
    let job = Job::new(work.path())
        .with_source(source(LIB_DIR))
        .with_target(target(APP));

    CompatibilityOrchestrator::new(cap.clone())
        .run(&job)
        .await
        .unwrap();

    assert_eq!(
        cap.call_names(),
        vec![
            // source
            "version",
            "install",
            // target resolution
            "clone",
            "tags",
            "checkout",
            "version",
            "clean",
            "restore",
            // substitution
            "checkout",
            "property",
            "set_property",
            "verify",
            "clean",
            "restore",
        ]
    );
    let injected = cap.calls().into_iter().find_map(|call| match call {
        Call::SetProperty(_, name, value) => Some((name, value)),
        _ => None,
    });
    assert_eq!(injected, Some((PROPERTY.to_string(), "2.3.4".to_string())));
}

#[tokio::test]
async fn remote_source_installs_each_tag_oldest_first() {
    let work = tempfile::tempdir().unwrap();
    let lib = ScriptedRepo::new(Snapshot::new("2.2.0-SNAPSHOT"))
        .with_tag("2024-04-01/v2.1.0", Snapshot::new("2.1.0"))
        .with_tag("2024-03-01/v2.0.0", Snapshot::new("2.0.0"))
        .with_tag("2023-01-01/v1.0.0", Snapshot::new("1.0.0"));
    let cap = Arc::new(
        ScriptedCapability::new()
            .with_repo("mem://acme/lib.git", lib)
            .with_repo(APP, app_repo()),
    );

    let mut lib_source = source("mem://acme/lib.git");
    lib_source.filter = Filter::new().with_name("v2");
    let mut app_target = target(APP);
    app_target.filter = Filter::new().with_limit(1);
    let job = Job::new(work.path())
        .with_source(lib_source)
        .with_target(app_target);

    let report = CompatibilityOrchestrator::new(cap.clone())
        .run(&job)
        .await
        .unwrap();

    let installed: Vec<_> = cap.installed().into_iter().map(|(_, v)| v).collect();
    assert_eq!(installed, vec!["2.0.0", "2.1.0"]);

    let pairs: Vec<_> = report
        .iter()
        .map(|i| {
            (
                i.source_version.version.as_str(),
                i.target_version.tag.name(),
            )
        })
        .collect();
    assert_eq!(pairs, vec![("2.0.0", "v1.0.2"), ("2.1.0", "v1.0.2")]);
    assert!(report.iter().all(|i| i.source_version.requires_checkout()));
    assert_eq!(scratch_entries(work.path()), 0);
}

#[tokio::test]
async fn multiple_targets_keep_list_order() {
    let work = tempfile::tempdir().unwrap();
    let other = "mem://acme/other.git";
    let cap = Arc::new(
        ScriptedCapability::new()
            .with_local(LIB_DIR, ScriptedRepo::new(Snapshot::new("2.3.4")))
            .with_repo(APP, app_repo())
            .with_repo(
                other,
                ScriptedRepo::new(release("0.2.0", "2.0.0"))
                    .with_tag("2024-06-01/r0.1", release("0.1.0", "2.1.0")),
            ),
    );
    let job = Job::new(work.path())
        .with_source(source(LIB_DIR))
        .with_target(target(other))
        .with_target(target(APP));

    let report = CompatibilityOrchestrator::new(cap).run(&job).await.unwrap();

    let targets: Vec<_> = report.iter().map(|i| i.target_uri.as_str()).collect();
    assert_eq!(targets, vec![other, APP, APP, APP]);
    assert_eq!(report.pairs(), vec![(LIB_DIR, other), (LIB_DIR, APP)]);
}

#[tokio::test]
async fn empty_job_yields_empty_report() {
    let work = tempfile::tempdir().unwrap();
    let cap = Arc::new(ScriptedCapability::new().with_repo(APP, app_repo()));
    let engine = CompatibilityOrchestrator::new(cap.clone());

    let no_sources = Job::new(work.path()).with_target(target(APP));
    assert!(engine.run(&no_sources).await.unwrap().is_empty());

    let no_targets = Job::new(work.path()).with_source(source(LIB_DIR));
    assert!(engine.run(&no_targets).await.unwrap().is_empty());

    assert!(cap.calls().is_empty());
}

#[tokio::test]
async fn checkout_failure_aborts_and_cleans_up() {
    let work = tempfile::tempdir().unwrap();
    let cap = Arc::new(
        ScriptedCapability::new()
            .with_local(LIB_DIR, ScriptedRepo::new(Snapshot::new("2.3.4")))
            .with_repo(APP, app_repo())
            .fail_when(|call| matches!(call, Call::Checkout(_, tag) if tag == "v1.0.1")),
    );
    let job = Job::new(work.path())
        .with_source(source(LIB_DIR))
        .with_target(target(APP));

    let err = CompatibilityOrchestrator::new(cap.clone())
        .run(&job)
        .await
        .unwrap_err();

    assert!(matches!(err, CompatError::Exec(_)), "got {err}");
    assert!(!cap.call_names().contains(&"verify"));
    assert_eq!(scratch_entries(work.path()), 0);
}

#[tokio::test]
async fn verify_transport_failure_is_fatal() {
    let work = tempfile::tempdir().unwrap();
    let cap = Arc::new(
        ScriptedCapability::new()
            .with_local(LIB_DIR, ScriptedRepo::new(Snapshot::new("2.3.4")))
            .with_repo(APP, app_repo())
            .fail_when(|call| matches!(call, Call::Verify(_))),
    );
    let job = Job::new(work.path())
        .with_source(source(LIB_DIR))
        .with_target(target(APP));

    assert!(CompatibilityOrchestrator::new(cap.clone())
        .run(&job)
        .await
        .is_err());
    let verifies = cap.call_names().iter().filter(|n| **n == "verify").count();
    assert_eq!(verifies, 1, "no further tags after a fatal error");
}

#[tokio::test]
async fn undefined_property_is_fatal() {
    let work = tempfile::tempdir().unwrap();
    let cap = Arc::new(
        ScriptedCapability::new()
            .with_local(LIB_DIR, ScriptedRepo::new(Snapshot::new("2.3.4")))
            .with_repo(
                APP,
                ScriptedRepo::new(Snapshot::new("1.0.0"))
                    .with_tag("2024-01-01/v1.0.0", Snapshot::new("1.0.0")),
            ),
    );
    let job = Job::new(work.path())
        .with_source(source(LIB_DIR))
        .with_target(target(APP));

    let err = CompatibilityOrchestrator::new(cap)
        .run(&job)
        .await
        .unwrap_err();
    match err {
        CompatError::PropertyUndefined { property, project } => {
            assert_eq!(property, PROPERTY);
            assert!(project.contains(APP));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(scratch_entries(work.path()), 0);
}

#[tokio::test]
async fn invalid_source_version_is_rejected_before_install() {
    let work = tempfile::tempdir().unwrap();
    let cap = Arc::new(
        ScriptedCapability::new()
            .with_local(LIB_DIR, ScriptedRepo::new(Snapshot::new("2.3")))
            .with_repo(APP, app_repo()),
    );
    let job = Job::new(work.path())
        .with_source(source(LIB_DIR))
        .with_target(target(APP));

    let err = CompatibilityOrchestrator::new(cap.clone())
        .run(&job)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CompatError::Parse(ParseError::InvalidVersion { .. })
    ));
    assert!(cap.installed().is_empty());
}

#[tokio::test]
async fn unknown_versioning_scheme_rejects_every_version() {
    let work = tempfile::tempdir().unwrap();
    let cap = Arc::new(
        ScriptedCapability::new()
            .with_local(LIB_DIR, ScriptedRepo::new(Snapshot::new("2.3.4")))
            .with_repo(APP, app_repo()),
    );
    let mut lib = source(LIB_DIR);
    lib.versioning = "calver".to_string();
    let job = Job::new(work.path()).with_source(lib).with_target(target(APP));

    assert!(CompatibilityOrchestrator::new(cap).run(&job).await.is_err());
}
