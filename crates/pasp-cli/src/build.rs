//! `pasp build`: bring translated scripts up to date.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use pasp_build::{Preprocessor, ProcessOutput, ProcessStatus, RootMapper};
use pasp_coalesce::RequestTable;
use pasp_config::{log_cli_debug, log_cli_info, Config};
use rayon::prelude::*;
use walkdir::WalkDir;

/// Source file extension picked up by `--recursive`.
const SOURCE_EXTENSION: &str = "pasp";

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Sources to process, relative to the document root
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<String>,

    /// Document root (defaults to the configured root, then the current directory)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Walk directories for *.pasp files
    #[arg(short, long)]
    pub recursive: bool,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,
}

pub fn run(args: BuildArgs, config: &Config) -> Result<()> {
    let configured = config.build.document_root().map(Path::to_path_buf);
    let root = match args.root.clone().or(configured) {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let sources = collect_sources(&root, &args.paths, args.recursive)?;
    if sources.is_empty() {
        println!("Nothing to build under {}", root.display());
        return Ok(());
    }

    let table =
        RequestTable::from_config(&config.table).context("Invalid [table] configuration")?;
    let preprocessor = Preprocessor::new(table)
        .with_mapper(RootMapper::new(&root))
        .with_sync_output(config.build.sync_output);

    let threads = args.jobs.unwrap_or_else(num_cpus::get).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("pasp-build-{}", i))
        .build()
        .context("Failed to create build thread pool")?;
    log_cli_info!(
        "Building",
        sources = sources.len(),
        threads = threads,
    );

    let results: Vec<_> = pool.install(|| {
        sources
            .par_iter()
            .map(|source| (source, preprocessor.process(source)))
            .collect()
    });

    let mut failed = 0usize;
    for (source, result) in &results {
        match result {
            Ok(output) => println!("{}", describe(output)),
            Err(e) => {
                failed += 1;
                eprintln!("error      {}: {}", source, e);
            }
        }
    }

    let stats = preprocessor.stats();
    println!(
        "\n{} sources: {} rebuilt, {} up to date, {} joined, {} failed",
        stats.requests, stats.translations, stats.up_to_date, stats.joins, stats.failures
    );

    if failed > 0 {
        anyhow::bail!("{} of {} sources failed", failed, results.len());
    }
    Ok(())
}

fn describe(output: &ProcessOutput) -> String {
    let status = match output.status {
        ProcessStatus::Rebuilt => "rebuilt",
        ProcessStatus::UpToDate => "up-to-date",
        ProcessStatus::Joined => "joined",
    };
    format!("{:<10} {}", status, output.target)
}

/// Expand command-line paths into logical source paths under `root`.
fn collect_sources(root: &Path, paths: &[String], recursive: bool) -> Result<Vec<String>> {
    let mut sources = Vec::new();
    for path in paths {
        let relative = path.trim_start_matches('/');
        let local = root.join(relative);

        if recursive && local.is_dir() {
            for entry in WalkDir::new(&local)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == SOURCE_EXTENSION))
            {
                let found = entry
                    .path()
                    .strip_prefix(root)
                    .with_context(|| format!("{} is outside the root", entry.path().display()))?;
                sources.push(logical_path(found));
            }
        } else {
            sources.push(logical_path(Path::new(relative)));
        }
    }
    log_cli_debug!("Collected sources", count = sources.len());
    Ok(sources)
}

/// `site/a.pasp` -> `/site/a.pasp`
fn logical_path(relative: &Path) -> String {
    let mut logical = String::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            logical.push('/');
            logical.push_str(&part.to_string_lossy());
        } else if component == Component::ParentDir {
            logical.push_str("/..");
        }
    }
    logical
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_logical_path() {
        assert_eq!(logical_path(Path::new("site/a.pasp")), "/site/a.pasp");
        assert_eq!(logical_path(Path::new("./a.pasp")), "/a.pasp");
        assert_eq!(logical_path(Path::new("../a.pasp")), "/../a.pasp");
    }

    #[test]
    fn test_collect_recursive() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("site/sub")).unwrap();
        std::fs::write(root.join("site/a.pasp"), b"a").unwrap();
        std::fs::write(root.join("site/sub/b.pasp"), b"b").unwrap();
        std::fs::write(root.join("site/__a.asp"), b"out").unwrap();

        let sources = collect_sources(root, &["site".to_string()], true).unwrap();
        assert_eq!(sources, vec!["/site/a.pasp", "/site/sub/b.pasp"]);
    }

    #[test]
    fn test_collect_plain_paths_are_kept() {
        let dir = tempdir().unwrap();
        let sources =
            collect_sources(dir.path(), &["/x/a.pasp".to_string(), "b.pasp".to_string()], false)
                .unwrap();
        assert_eq!(sources, vec!["/x/a.pasp", "/b.pasp"]);
    }
}
