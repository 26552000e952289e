//! `cogex metabolite` command implementation

use crate::commands::{read_ids, Context};
use crate::error::Result;
use crate::output::{self, OutputFormat};
use crate::MetaboliteArgs;
use cogex_enrichment::analysis::{DiscreteOptions, GeneAnalysis};
use cogex_enrichment::ora::OraRow;

pub async fn run(ctx: &Context, args: &MetaboliteArgs) -> Result<()> {
    let field = read_ids(&args.metabolites, args.input.as_deref(), "metabolite list")?;
    let options = DiscreteOptions {
        method: args.method.0,
        alpha: args.alpha,
        keep_insignificant: !args.significant_only,
        thresholds: args.thresholds.thresholds()?,
        ..DiscreteOptions::metabolite()
    };
    let render = |rows: &Vec<OraRow>, format: OutputFormat| output::format_rows(rows, format);

    let mut analysis = GeneAnalysis::new(ctx.config.gene_set_cache()?);
    if let Some(resolver) = ctx.config.metabolite_resolver()? {
        analysis = analysis.with_metabolite_resolver(resolver);
    }
    let parsed = match analysis.parse_metabolites(&field).await {
        Ok(parsed) => parsed,
        Err(e) => return output::emit(ctx.format, Err::<Vec<OraRow>, _>(e), Vec::new(), render),
    };

    let spinner = crate::progress::create_spinner("Running metabolite analysis", ctx.quiet);
    let result = analysis
        .metabolite_discrete(&parsed.local_ids(), &options)
        .await;
    spinner.finish_and_clear();

    output::emit(ctx.format, result, parsed.unresolved, render)
}
