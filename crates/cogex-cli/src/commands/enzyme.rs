//! `cogex enzyme` command implementation

use crate::commands::Context;
use crate::error::{CliError, Result};
use crate::output::{self, OutputFormat};
use crate::EnzymeArgs;
use cogex_common::{EntityId, Namespace};
use cogex_enrichment::analysis::GeneAnalysis;
use cogex_enrichment::gene_sets::queries::EnzymeStatement;
use std::collections::BTreeSet;

/// `1.1.1.1` and `EC:1.1.1.1` both name `eccode:1.1.1.1`
fn parse_ec_code(raw: &str) -> Result<EntityId> {
    let raw = raw.trim();
    let id = match raw.split_once(':') {
        Some(_) => raw.parse()?,
        None => EntityId::new(Namespace::EcCode, raw),
    };
    if !id.is_in(&Namespace::EcCode) || id.local_id.is_empty() {
        return Err(CliError::config(format!("'{}' is not an EC code", raw)));
    }
    Ok(id)
}

pub async fn run(ctx: &Context, args: &EnzymeArgs) -> Result<()> {
    let ec_code = parse_ec_code(&args.ec_code)?;
    let thresholds = args.thresholds.thresholds()?;
    let render =
        |rows: &Vec<EnzymeStatement>, format: OutputFormat| output::format_rows(rows, format);

    let mut analysis = GeneAnalysis::new(ctx.config.gene_set_cache()?);
    if let Some(resolver) = ctx.config.metabolite_resolver()? {
        analysis = analysis.with_metabolite_resolver(resolver);
    }

    let mut unresolved = Vec::new();
    let mut chebi_ids = BTreeSet::new();
    if !args.metabolites.is_empty() {
        let parsed = match analysis.parse_metabolites(&args.metabolites.join(",")).await {
            Ok(parsed) => parsed,
            Err(e) => {
                return output::emit(ctx.format, Err::<Vec<EnzymeStatement>, _>(e), Vec::new(), render)
            },
        };
        chebi_ids.extend(parsed.resolved.into_keys());
        unresolved = parsed.unresolved;
    }

    let spinner = crate::progress::create_spinner("Collecting enzyme statements", ctx.quiet);
    let result = analysis.enzyme_analysis(&ec_code, &chebi_ids, &thresholds).await;
    spinner.finish_and_clear();

    output::emit(ctx.format, result, unresolved, render)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ec_code_forms() {
        assert_eq!(parse_ec_code("1.1.1.1").unwrap().curie(), "eccode:1.1.1.1");
        assert_eq!(parse_ec_code("EC:1.1.1.1").unwrap().curie(), "eccode:1.1.1.1");
        assert!(parse_ec_code("hgnc:1100").is_err());
    }
}
