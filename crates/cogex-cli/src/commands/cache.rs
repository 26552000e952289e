//! `cogex cache` command implementation
//!
//! Builds, inspects and removes the persisted gene-set cache file.

use crate::commands::Context;
use crate::error::Result;
use crate::output::{self, OutputFormat};
use crate::CacheCommand;
use cogex_enrichment::gene_sets::{build_sqlite_cache, BuildOptions, CacheEntryStatus, SqliteGeneSetStore};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Machine-readable cache status
#[derive(Debug, Serialize)]
struct StatusReport {
    path: PathBuf,
    exists: bool,
    datasets: Vec<CacheEntryStatus>,
}

pub async fn run(ctx: &Context, command: &CacheCommand) -> Result<()> {
    let path = ctx.config.enrichment.cache.sqlite_path.clone();
    match command {
        CacheCommand::Build {
            force,
            limit,
            datasets,
        } => build(ctx, &path, *force, *limit, datasets.clone()).await,
        CacheCommand::Status => status(ctx, &path),
        CacheCommand::Clear => clear(ctx, &path),
    }
}

async fn build(
    ctx: &Context,
    path: &Path,
    force: bool,
    limit: Option<usize>,
    datasets: Vec<cogex_enrichment::gene_sets::Dataset>,
) -> Result<()> {
    let store = ctx.config.graph_store()?;
    let options = BuildOptions {
        force,
        limit,
        datasets,
    };

    let spinner = crate::progress::create_spinner("Building gene-set cache", ctx.quiet);
    let report = build_sqlite_cache(store.as_ref(), path, &options).await;
    spinner.finish_and_clear();
    let report = report?;

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        format => {
            if report.skipped {
                eprintln!(
                    "Cache already exists at {}. Use --force to rebuild it.",
                    report.path.display()
                );
            } else if !ctx.quiet {
                eprintln!("{} Built cache at {}", "✓".green(), report.path.display());
            }
            print!("{}", output::format_rows(&report.datasets, format));
        },
    }
    Ok(())
}

fn status(ctx: &Context, path: &Path) -> Result<()> {
    let datasets = if path.is_file() {
        SqliteGeneSetStore::open(path)?.status()?
    } else {
        Vec::new()
    };
    let report = StatusReport {
        path: path.to_path_buf(),
        exists: path.is_file(),
        datasets,
    };

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        _ if !report.exists => {
            println!("No gene-set cache at {}.", path.display());
            println!("Run 'cogex cache build' to create it.");
        },
        format => {
            if format == OutputFormat::Table {
                println!("{} {}", "Cache:".cyan().bold(), path.display());
            }
            print!("{}", output::format_rows(&report.datasets, format));
            let stale = report.datasets.iter().filter(|d| !d.fresh).count();
            if stale > 0 {
                eprintln!(
                    "{} {} dataset(s) are stale and will be queried from the graph. Run 'cogex cache build --force' to refresh.",
                    "warning:".yellow().bold(),
                    stale
                );
            }
        },
    }
    Ok(())
}

fn clear(ctx: &Context, path: &Path) -> Result<()> {
    let removed = if path.is_file() {
        std::fs::remove_file(path)?;
        info!(path = %path.display(), "Removed gene-set cache");
        true
    } else {
        false
    };

    match ctx.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "path": path,
                "removed": removed,
            }))?
        ),
        _ if removed => println!("Removed gene-set cache at {}", path.display()),
        _ => println!("No gene-set cache at {}", path.display()),
    }
    Ok(())
}
