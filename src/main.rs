use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bytesize::ByteSize;
use clap::Parser;

use filescope::actions::DeletionExecutor;
use filescope::cli::{Cli, Command};
use filescope::config::EngineConfig;
use filescope::duplicates::{DeepScanConfig, DeepScanner, DuplicateFile, DuplicateGroup, FastScanConfig, FastScanner};
use filescope::events::{ConsoleSink, MemorySink};
use filescope::index::{search_snapshot, IndexSnapshot, Indexer, SearchQuery};
use filescope::logging::init_logging;
use filescope::signal::{cancel_flag, install_handler, CancelFlag};
use filescope::store::MetadataStore;
use filescope::task::TaskHandle;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let mut config = EngineConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db.clone() {
        config.db_path = Some(db);
    }
    let db_path = config.resolve_db_path();
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let cancel = install_handler().unwrap_or_else(|err| {
        log::warn!("Ctrl-C handler unavailable: {err}");
        cancel_flag()
    });

    match cli.command {
        Command::Index { full, root } => run_index(&config, db_path, full, root, cancel, cli.quiet),
        Command::Search { query, folder } => {
            run_search(&config, &db_path, &query, &folder, &cancel)
        }
        Command::Fast { root, match_size } => run_fast(root, match_size, cancel, cli.quiet),
        Command::Deep { root, algo } => {
            let scan_config = DeepScanConfig {
                algorithm: algo,
                io_threads: config.io_threads,
                ..Default::default()
            };
            run_deep(root, scan_config, cancel, cli.quiet)
        }
        Command::Delete { paths } => run_delete(paths, cancel, cli.quiet),
        Command::Stats => run_stats(&db_path),
    }
}

fn run_index(
    config: &EngineConfig,
    db_path: PathBuf,
    full: bool,
    roots: Vec<PathBuf>,
    cancel: CancelFlag,
    quiet: bool,
) -> Result<()> {
    let roots = (!roots.is_empty()).then_some(roots);
    let indexer_config = config.indexer_config(full, roots);
    let sink = Arc::new(ConsoleSink::new(quiet));

    let task_sink = Arc::clone(&sink);
    let handle = TaskHandle::spawn_with_flag(cancel, move |flag| {
        Indexer::new(db_path)
            .with_config(indexer_config)
            .with_cancel_flag(flag)
            .run(task_sink.as_ref())
    });
    let outcome = handle.join();
    sink.finish();

    let outcome = outcome.context("indexing failed")?;
    println!(
        "Indexed {} files ({:?}: {} added, {} updated, {} pruned)",
        outcome.total(),
        outcome.mode,
        outcome.added,
        outcome.updated,
        outcome.pruned
    );
    Ok(())
}

fn run_search(
    config: &EngineConfig,
    db_path: &Path,
    query: &str,
    folder: &str,
    cancel: &CancelFlag,
) -> Result<()> {
    let store = MetadataStore::open(db_path)
        .with_context(|| format!("opening index {}", db_path.display()))?;
    let records = store.load_all().context("loading index")?;
    if records.is_empty() {
        println!("Index is empty; run `filescope index` first.");
        return Ok(());
    }
    let snapshot = IndexSnapshot::from_records(records);

    let mut request = SearchQuery::new(query).with_folder(folder);
    request.batch_size = config.search_batch_size;

    let sink = MemorySink::new();
    let summary = search_snapshot(&snapshot, &request, &sink, Some(cancel))?;

    for record in sink.batched_records() {
        println!("{}  {}", ByteSize(record.size), record.path.display());
    }
    println!("{} matches", summary.total);
    Ok(())
}

fn run_fast(root: PathBuf, match_size: bool, cancel: CancelFlag, quiet: bool) -> Result<()> {
    let sink = Arc::new(ConsoleSink::new(quiet));
    let scan_config = FastScanConfig {
        match_size,
        ..Default::default()
    };

    let task_sink = Arc::clone(&sink);
    let handle = TaskHandle::spawn_with_flag(cancel, move |flag| {
        FastScanner::new(root)
            .with_config(scan_config)
            .with_cancel_flag(flag)
            .run(task_sink.as_ref())
    });
    let groups = handle.join();
    sink.finish();

    print_groups(&groups.context("fast scan failed")?);
    Ok(())
}

fn run_deep(
    root: PathBuf,
    scan_config: DeepScanConfig,
    cancel: CancelFlag,
    quiet: bool,
) -> Result<()> {
    let sink = Arc::new(ConsoleSink::new(quiet));

    let task_sink = Arc::clone(&sink);
    let handle = TaskHandle::spawn_with_flag(cancel, move |flag| {
        DeepScanner::new(root)
            .with_config(scan_config)
            .with_cancel_flag(flag)
            .run(task_sink.as_ref())
    });
    let groups = handle.join();
    sink.finish();

    print_groups(&groups.context("deep scan failed")?);
    Ok(())
}

fn print_groups(groups: &[DuplicateGroup]) {
    if groups.is_empty() {
        println!("No duplicates found.");
        return;
    }
    let mut sorted: Vec<&DuplicateGroup> = groups.iter().collect();
    sorted.sort_by_key(|g| std::cmp::Reverse(g.wasted_space()));

    let wasted: u64 = sorted.iter().map(|g| g.wasted_space()).sum();
    for group in &sorted {
        println!(
            "{} ({} files, {} wasted)",
            group.key,
            group.count(),
            ByteSize(group.wasted_space())
        );
        for file in &group.files {
            println!("  {}  {}", ByteSize(file.size), file.path.display());
        }
    }
    println!(
        "{} groups, {} reclaimable",
        sorted.len(),
        ByteSize(wasted)
    );
}

fn run_delete(paths: Vec<PathBuf>, cancel: CancelFlag, quiet: bool) -> Result<()> {
    let selection: Vec<DuplicateFile> = paths
        .into_iter()
        .map(|path| {
            let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            DuplicateFile {
                path,
                name,
                size,
                modified: 0.0,
                hash: None,
            }
        })
        .collect();

    let sink = ConsoleSink::new(quiet);
    let report = DeletionExecutor::new(selection)
        .with_cancel_flag(cancel)
        .run(&sink);
    sink.finish();

    let report = report.context("deletion failed")?;
    println!("Deleted {}, failed {}", report.deleted, report.failed);
    Ok(())
}

fn run_stats(db_path: &Path) -> Result<()> {
    let store = MetadataStore::open(db_path)
        .with_context(|| format!("opening index {}", db_path.display()))?;
    let stats = store.stats().context("reading statistics")?;
    println!("Files:      {}", stats.total_files);
    println!("Extensions: {}", stats.total_extensions);
    println!("Total size: {}", ByteSize(stats.total_size));
    Ok(())
}
