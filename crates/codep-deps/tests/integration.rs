//! Integration tests for codep-deps
//!
//! These tests drive whole reconciliation passes against in-memory manifests
//! and scripted registry tools.

use codep_config::{CodepConfig, Language, PythonBackend};
use codep_deps::python::requirements::{parse_requirements, render_requirements};
use codep_deps::{
    construct_deps_to_update_list, construct_permissive_deps_to_update_list, render_report,
    CommandOutput, DependencyMap, Error, ProviderContext, ProviderRegistry, ReconciliationEngine,
    RequestDeduplicator, ResponseCache, ScriptedCommandRunner, Verdict, VersionMap,
};
use codep_fs::{MemoryFileSystem, NativeFileSystem};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Harness {
    engine: ReconciliationEngine,
    fs: Arc<MemoryFileSystem>,
    runner: Arc<ScriptedCommandRunner>,
}

fn harness(config: CodepConfig, files: &[(&str, &str)], runner: ScriptedCommandRunner) -> Harness {
    let fs = Arc::new(MemoryFileSystem::empty("/repo").unwrap());
    for (path, contents) in files {
        fs.add_file(path, *contents).unwrap();
    }
    let runner = Arc::new(runner);
    let ctx = ProviderContext::new(fs.clone(), runner.clone(), config.testing);
    let registry = ProviderRegistry::with_defaults(
        ctx,
        config.yarn_config,
        config.python_backend.unwrap_or(PythonBackend::Pip),
    );
    let engine = ReconciliationEngine::new(
        config,
        registry,
        fs.clone(),
        Arc::new(ResponseCache::default()),
        Arc::new(RequestDeduplicator::new()),
    );
    Harness { engine, fs, runner }
}

fn pinned(items: &[&str]) -> CodepConfig {
    CodepConfig {
        codependencies: Some(items.iter().map(|i| (*i).into()).collect()),
        ..Default::default()
    }
}

fn deps(entries: &[(&str, &str)]) -> DependencyMap {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_scenario_a_caret_bump() {
    let section = deps(&[("foo", "^1.0.0")]);
    let version_map = VersionMap::from([("foo".to_string(), "2.0.0".to_string())]);

    let updates = construct_deps_to_update_list(&section, &version_map);

    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].name, "foo");
    assert_eq!(updates[0].actual, "^1.0.0");
    assert_eq!(updates[0].exact, "2.0.0");
    assert_eq!(updates[0].expected, "^2.0.0");
}

#[tokio::test]
async fn test_scenario_a_engine_needs_update() {
    let h = harness(
        pinned(&["foo"]),
        &[("package.json", r#"{"dependencies": {"foo": "^1.0.0"}}"#)],
        ScriptedCommandRunner::new()
            .respond("npm view foo version latest", CommandOutput::ok("2.0.0\n")),
    );

    let report = h.engine.reconcile().await.unwrap();

    assert_eq!(report.verdict, Verdict::Outdated);
    assert!(report.files[0].needs_update());
    assert_eq!(report.files[0].updates.dependencies[0].expected, "^2.0.0");
}

#[test]
fn test_scenario_b_permissive() {
    let section = deps(&[("foo", "1.0.0"), ("bar", "1.0.0")]);
    let pinned: BTreeSet<String> = ["foo".to_string()].into();

    let updates = construct_permissive_deps_to_update_list(&section, &pinned);

    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].name, "bar");
    assert_eq!(updates[0].expected, "latest");
}

#[tokio::test]
async fn test_scenario_c_go_require_fold() {
    let go_mod = "module example.com/app\n\ngo 1.21\n\nrequire (\n\texample.com/pkga v1.0.0\n)\n\nrequire example.com/pkgb v2.0.0\n";
    let config = CodepConfig {
        update: true,
        language: Some(Language::Go),
        ..pinned(&["example.com/pkga", "example.com/pkgb"])
    };
    let h = harness(
        config,
        &[("go.mod", go_mod)],
        ScriptedCommandRunner::new()
            .respond(
                "go list -m -versions example.com/pkga",
                CommandOutput::ok("example.com/pkga v1.0.0 v1.1.0\n"),
            )
            .respond(
                "go list -m -versions example.com/pkgb",
                CommandOutput::ok("example.com/pkgb v2.0.0 v2.3.1\n"),
            )
            .respond("go mod tidy", CommandOutput::ok("")),
    );

    let report = h.engine.reconcile().await.unwrap();

    assert_eq!(report.verdict, Verdict::Updated);
    assert_eq!(
        h.fs.contents("go.mod").unwrap(),
        "module example.com/app\n\ngo 1.21\n\nrequire (\n\texample.com/pkga v1.1.0\n\texample.com/pkgb v2.3.1\n)\n\n"
    );
    assert_eq!(h.runner.calls("go mod tidy"), 1);
}

#[test]
fn test_scenario_d_requirements_round_trip() {
    let content = "flask>=2.0.0\n";

    let parsed = parse_requirements(content);
    assert_eq!(parsed, deps(&[("flask", ">=2.0.0")]));
    assert_eq!(render_requirements(content, &parsed), "flask>=2.0.0\n");
}

#[tokio::test]
async fn test_scenario_d_requirements_update_keeps_operator() {
    let config = CodepConfig {
        update: true,
        language: Some(Language::Python),
        ..pinned(&["flask"])
    };
    let h = harness(
        config,
        &[("requirements.txt", "# web\nflask>=2.0.0\nrequests==2.31.0\n")],
        ScriptedCommandRunner::new().respond(
            "pip index versions flask",
            CommandOutput::ok("flask (3.0.0)\nAvailable versions: 3.0.0, 2.3.3, 2.0.0\n"),
        ),
    );

    h.engine.reconcile().await.unwrap();

    assert_eq!(
        h.fs.contents("requirements.txt").unwrap(),
        "# web\nflask>=3.0.0\nrequests==2.31.0\n"
    );
}

#[tokio::test]
async fn test_scenario_e_policy_error_before_io() {
    let h = harness(
        CodepConfig::default(),
        &[("package.json", r#"{"dependencies": {"foo": "1.0.0"}}"#)],
        ScriptedCommandRunner::new(),
    );

    assert!(matches!(h.engine.check_files().await, Err(Error::Policy(_))));
    assert!(matches!(h.engine.reconcile().await, Err(Error::Policy(_))));
    assert_eq!(h.runner.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dedupe_runs_once_for_concurrent_callers() {
    let dedupe = Arc::new(RequestDeduplicator::<Result<String, String>>::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let callers = (0..5).map(|_| {
        let dedupe = dedupe.clone();
        let calls = calls.clone();
        async move {
            dedupe
                .dedupe("npm:react", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok("18.2.0".to_string())
                })
                .await
        }
    });
    let results = futures::future::join_all(callers).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| r.as_deref() == Ok("18.2.0")));
    assert_eq!(dedupe.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cache_round_trip() {
    let cache = ResponseCache::new(Duration::from_secs(60));
    cache.set("npm:react", "18.2.0");

    assert_eq!(cache.get("npm:react").as_deref(), Some("18.2.0"));
    assert_eq!(cache.stats().hits, 1);

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(cache.get("npm:react"), None);
    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 0);
}

#[tokio::test]
async fn test_shared_cache_across_passes() {
    let fs = Arc::new(MemoryFileSystem::empty("/repo").unwrap());
    fs.add_file("package.json", r#"{"dependencies": {"react": "^18.2.0"}}"#)
        .unwrap();
    let runner = Arc::new(
        ScriptedCommandRunner::new()
            .respond("npm view react version latest", CommandOutput::ok("18.2.0")),
    );
    let ctx = ProviderContext::new(fs.clone(), runner.clone(), false);
    let cache = Arc::new(ResponseCache::default());
    let dedupe = Arc::new(RequestDeduplicator::new());

    for _ in 0..2 {
        let engine = ReconciliationEngine::new(
            pinned(&["react"]),
            ProviderRegistry::with_defaults(ctx.clone(), false, PythonBackend::Pip),
            fs.clone(),
            cache.clone(),
            dedupe.clone(),
        );
        let report = engine.reconcile().await.unwrap();
        assert_eq!(report.verdict, Verdict::UpToDate);
    }

    assert_eq!(runner.calls("npm view react version latest"), 1);
    assert_eq!(cache.stats().hits, 1);
}

#[tokio::test]
async fn test_resolution_failure_aborts_pass() {
    let h = harness(
        pinned(&["reactt"]),
        &[("package.json", r#"{"dependencies": {"reactt": "1.0.0"}}"#)],
        ScriptedCommandRunner::new().respond(
            "npm view reactt version latest",
            CommandOutput::failed(1, "npm ERR! code E404\nnpm ERR! 404 Not Found"),
        ),
    );

    match h.engine.reconcile().await {
        Err(Error::Resolution(failure)) => {
            assert_eq!(failure.name, "reactt");
            assert_eq!(failure.suggestion.as_deref(), Some("react"));
        }
        other => panic!("expected resolution failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_testing_mode_degrades_failures() {
    let config = CodepConfig {
        testing: true,
        update: true,
        ..pinned(&["react", "missing-pkg"])
    };
    let package = r#"{"dependencies": {"react": "^17.0.0", "missing-pkg": "1.0.0"}}"#;
    let h = harness(
        config,
        &[("package.json", package)],
        ScriptedCommandRunner::new()
            .respond("npm view react version latest", CommandOutput::ok("18.2.0"))
            .respond(
                "npm view missing-pkg version latest",
                CommandOutput::failed(1, "npm ERR! code E404"),
            ),
    );

    let report = h.engine.reconcile().await.unwrap();

    assert_eq!(report.version_map.len(), 1);
    assert_eq!(report.verdict, Verdict::Updated);
    assert!(!report.files[0].written);
    assert_eq!(h.fs.contents("package.json").unwrap(), package);
}

#[tokio::test]
async fn test_native_filesystem_pass() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir_all(temp_dir.path().join("web")).unwrap();
    std::fs::create_dir_all(temp_dir.path().join("node_modules/dep")).unwrap();
    let manifest = temp_dir.path().join("web/package.json");
    std::fs::write(
        &manifest,
        "{\n  \"name\": \"web\",\n  \"dependencies\": {\n    \"react\": \"~17.0.2\"\n  }\n}\n",
    )
    .unwrap();
    std::fs::write(
        temp_dir.path().join("node_modules/dep/package.json"),
        r#"{"dependencies": {"react": "16.0.0"}}"#,
    )
    .unwrap();

    let fs = Arc::new(NativeFileSystem::new(temp_dir.path()).unwrap());
    let runner = Arc::new(
        ScriptedCommandRunner::new()
            .respond("npm view react version latest", CommandOutput::ok("18.2.0")),
    );
    let ctx = ProviderContext::new(fs.clone(), runner, false);
    let config = CodepConfig {
        update: true,
        files: Some(vec!["**/package.json".to_string()]),
        ..pinned(&["react"])
    };
    let engine = ReconciliationEngine::new(
        config.clone(),
        ProviderRegistry::with_defaults(ctx, false, PythonBackend::Pip),
        fs,
        Arc::new(ResponseCache::default()),
        Arc::new(RequestDeduplicator::new()),
    );

    let report = engine.reconcile().await.unwrap();

    assert_eq!(report.files.len(), 1);
    assert_eq!(
        std::fs::read_to_string(&manifest).unwrap(),
        "{\n  \"name\": \"web\",\n  \"dependencies\": {\n    \"react\": \"~18.2.0\"\n  }\n}\n"
    );

    let json = render_report(codep_config::OutputFormat::Json, &report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["status"], "updated");
    assert_eq!(value["dependencies"][0]["severity"], "major");
}
