//! `cogex signed` command implementation
//!
//! Reverse causal reasoning: which regulators explain the up- and
//! down-regulated genes.

use crate::commands::{read_ids, Context};
use crate::error::Result;
use crate::output::{self, OutputFormat};
use crate::SignedArgs;
use cogex_enrichment::analysis::SignedOptions;
use cogex_enrichment::rcr::RcrRow;
use tracing::info;

pub async fn run(ctx: &Context, args: &SignedArgs) -> Result<()> {
    let up_field = read_ids(&args.up, None, "up-regulated gene list")?;
    let down_field = read_ids(&args.down, None, "down-regulated gene list")?;
    let options = SignedOptions {
        minimum_size: args.minimum_size,
        alpha: args.alpha,
        keep_insignificant: !args.significant_only,
        thresholds: args.thresholds.thresholds()?,
    };
    let render = |rows: &Vec<RcrRow>, format: OutputFormat| output::format_rows(rows, format);

    let analysis = ctx.config.analysis()?;
    let parsed = tokio::try_join!(analysis.parse_genes(&up_field), analysis.parse_genes(&down_field));
    let (up, down) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return output::emit(ctx.format, Err::<Vec<RcrRow>, _>(e), Vec::new(), render),
    };
    info!(
        up = up.resolved.len(),
        down = down.resolved.len(),
        "Parsed signed gene lists"
    );

    let mut unresolved = up.unresolved.clone();
    unresolved.extend(down.unresolved.iter().cloned());

    let spinner = crate::progress::create_spinner("Running reverse causal reasoning", ctx.quiet);
    let result = analysis
        .signed(&up.local_ids(), &down.local_ids(), &options)
        .await;
    spinner.finish_and_clear();

    output::emit(ctx.format, result, unresolved, render)
}
