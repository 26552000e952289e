//! `cogex discrete` command implementation
//!
//! Over-representation analysis of a gene list against every reference dataset.

use crate::commands::{read_ids, Context};
use crate::error::Result;
use crate::output::{self, OutputFormat};
use crate::DiscreteArgs;
use cogex_enrichment::analysis::{DiscreteOptions, DiscreteResults};
use colored::Colorize;
use tracing::info;

pub async fn run(ctx: &Context, args: &DiscreteArgs) -> Result<()> {
    let field = read_ids(&args.genes, args.input.as_deref(), "gene list")?;
    let options = DiscreteOptions {
        method: args.method.0,
        alpha: args.alpha,
        keep_insignificant: !args.significant_only,
        thresholds: args.thresholds.thresholds()?,
        extend_ontologies: args.extend_ontologies,
    };

    let analysis = ctx.config.analysis()?;
    let parsed = match analysis.parse_genes(&field).await {
        Ok(parsed) => parsed,
        Err(e) => return output::emit(ctx.format, Err::<DiscreteResults, _>(e), Vec::new(), render),
    };
    info!(
        resolved = parsed.resolved.len(),
        unresolved = parsed.unresolved.len(),
        "Parsed gene list"
    );

    let spinner = crate::progress::create_spinner("Running discrete analysis", ctx.quiet);
    let result = analysis.discrete(&parsed.local_ids(), &options).await;
    spinner.finish_and_clear();

    output::emit(ctx.format, result, parsed.unresolved, render)
}

fn render(results: &DiscreteResults, format: OutputFormat) -> String {
    let mut out = String::new();
    let mut first = true;
    for (dataset, rows) in results {
        let name = dataset.to_string();
        match format {
            OutputFormat::Tsv => {
                out.push_str(&output::format_as_tsv(rows, &[("dataset", &name)], first));
            },
            _ => {
                out.push_str(&format!("{}\n", name.cyan().bold()));
                out.push_str(&output::format_rows(rows, format));
                out.push('\n');
            },
        }
        first = false;
    }
    out
}
