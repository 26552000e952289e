//! `cogex continuous` command implementation
//!
//! GSEA of a scored gene table against one reference dataset.

use crate::commands::Context;
use crate::error::Result;
use crate::output::{self, OutputFormat};
use crate::ContinuousArgs;
use cogex_enrichment::analysis::{ContinuousOptions, GeneAnalysis, ScoreColumns, ScoreTable};
use cogex_enrichment::gsea::{GseaOptions, GseaRow};
use colored::Colorize;
use tracing::info;

fn options(args: &ContinuousArgs) -> Result<ContinuousOptions> {
    Ok(ContinuousOptions {
        gsea: GseaOptions {
            permutation_num: args.permutations,
            seed: args.seed,
            min_size: args.min_size,
            max_size: args.max_size,
            weight: args.weight,
            alpha: args.alpha,
            keep_insignificant: !args.significant_only,
            directory: args.output_dir.clone(),
            plot_count: args.plots,
        },
        thresholds: args.thresholds.thresholds()?,
    })
}

pub async fn run(ctx: &Context, args: &ContinuousArgs) -> Result<()> {
    let options = options(args)?;
    let columns = ScoreColumns {
        id_column: args.id_column.clone(),
        score_column: args.score_column.clone(),
    };
    let render = |rows: &Vec<GseaRow>, format: OutputFormat| output::format_rows(rows, format);

    let resolver = ctx.config.resolver()?;
    let table = match ScoreTable::from_path(&args.input, &columns, resolver.as_deref()).await {
        Ok(table) => table,
        Err(e) => return output::emit(ctx.format, Err::<Vec<GseaRow>, _>(e), Vec::new(), render),
    };
    info!(
        path = %args.input.display(),
        scores = table.len(),
        unresolved = table.unresolved.len(),
        "Read score table"
    );

    let analysis = GeneAnalysis::new(ctx.config.gene_set_cache()?);
    let spinner = crate::progress::create_spinner(
        &format!("Running GSEA against {}", args.source),
        ctx.quiet,
    );
    let result = analysis.continuous(&table.scores, args.source, &options).await;
    spinner.finish_and_clear();

    output::emit(ctx.format, result, table.unresolved, render)?;

    if let Some(dir) = args.output_dir.as_ref().filter(|_| !ctx.quiet) {
        eprintln!("{} Report written to {}", "✓".green(), dir.display());
    }
    Ok(())
}
