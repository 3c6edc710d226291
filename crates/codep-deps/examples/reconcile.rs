//! Example: check codependencies in a directory without writing anything
//!
//! Run with: cargo run --package codep-deps --example reconcile -- <dir> <package>...

use codep_config::{CodepConfig, OutputFormat, PythonBackend};
use codep_deps::{
    render_report, ProviderContext, ProviderRegistry, ReconciliationEngine, RequestDeduplicator,
    ResponseCache, TokioCommandRunner,
};
use codep_fs::NativeFileSystem;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let root = args.next().unwrap_or_else(|| ".".to_string());
    let packages: Vec<String> = args.collect();
    if packages.is_empty() {
        anyhow::bail!("usage: reconcile <dir> <package>...");
    }

    println!("=== codep-deps: Reconcile {} ===\n", root);

    let config = CodepConfig {
        codependencies: Some(packages.iter().map(|p| p.as_str().into()).collect()),
        ..Default::default()
    };
    let fs = Arc::new(NativeFileSystem::new(&root)?);
    let runner = Arc::new(TokioCommandRunner::new(config.timeout()));
    let ctx = ProviderContext::new(fs.clone(), runner, false);
    let registry = ProviderRegistry::with_defaults(ctx, false, PythonBackend::Pip);

    let engine = ReconciliationEngine::new(
        config,
        registry,
        fs,
        Arc::new(ResponseCache::default()),
        Arc::new(RequestDeduplicator::new()),
    )
    .with_progress(Arc::new(|done: usize, total: usize, name: &str| {
        println!("  [{}/{}] {}", done, total, name);
    }));

    let report = engine.reconcile().await?;
    println!();
    print!("{}", render_report(OutputFormat::Table, &report)?);

    for file in report.outdated_files() {
        println!("  {} needs {} change(s)", file.path.display(), file.updates.len());
    }

    Ok(())
}
