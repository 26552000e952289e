//! Result rendering
//!
//! Tables for the terminal, tab-separated text for pipelines and the JSON
//! response envelope for programmatic callers.

use crate::error::{CliError, Result};
use clap::ValueEnum;
use cogex_enrichment::analysis::AnalysisResponse;
use cogex_enrichment::gene_sets::queries::EnzymeStatement;
use cogex_enrichment::gene_sets::CacheEntryStatus;
use cogex_enrichment::gsea::GseaRow;
use cogex_enrichment::ora::OraRow;
use cogex_enrichment::rcr::RcrRow;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Tsv,
}

/// A result row with a fixed set of columns
pub trait Tabular {
    fn headers() -> Vec<&'static str>;
    fn cells(&self) -> Vec<String>;
}

/// p-values and scores: scientific notation below 1e-3
pub fn format_float(value: f64) -> String {
    if value != 0.0 && value.abs() < 1e-3 {
        format!("{:.3e}", value)
    } else {
        format!("{:.4}", value)
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map(format_float).unwrap_or_else(|| "NA".to_string())
}

impl Tabular for OraRow {
    fn headers() -> Vec<&'static str> {
        vec!["curie", "name", "overlap", "set_size", "p", "q", "mlp", "mlq"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.curie.to_string(),
            self.name.clone(),
            self.overlap.to_string(),
            self.set_size.to_string(),
            format_float(self.p),
            format_float(self.q),
            format!("{:.3}", self.mlp),
            format!("{:.3}", self.mlq),
        ]
    }
}

impl Tabular for RcrRow {
    fn headers() -> Vec<&'static str> {
        vec![
            "curie",
            "name",
            "correct",
            "incorrect",
            "ambiguous",
            "binom_pvalue",
            "binom_ambig_pvalue",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.curie.to_string(),
            self.name.clone(),
            self.correct.to_string(),
            self.incorrect.to_string(),
            self.ambiguous.to_string(),
            format_optional(self.binom_pvalue),
            format_optional(self.binom_ambig_pvalue),
        ]
    }
}

impl Tabular for GseaRow {
    fn headers() -> Vec<&'static str> {
        vec!["curie", "name", "es", "nes", "pval", "fdr", "geneset_size", "matched_size"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.curie.to_string(),
            self.name.clone(),
            format_float(self.es),
            format_float(self.nes),
            format_float(self.pval),
            format_float(self.fdr),
            self.geneset_size.to_string(),
            self.matched_size.to_string(),
        ]
    }
}

impl Tabular for EnzymeStatement {
    fn headers() -> Vec<&'static str> {
        vec!["family", "metabolite", "stmt_type", "stmt_hash", "evidence_count", "belief"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.family.to_string(),
            self.metabolite.to_string(),
            self.stmt_type.clone(),
            self.stmt_hash.to_string(),
            self.evidence_count.to_string(),
            format!("{:.3}", self.belief),
        ]
    }
}

impl Tabular for CacheEntryStatus {
    fn headers() -> Vec<&'static str> {
        vec!["dataset", "rows", "built_at", "fresh"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.dataset.clone(),
            self.rows.to_string(),
            self.built_at.clone(),
            if self.fresh { "yes" } else { "stale" }.to_string(),
        ]
    }
}

pub fn format_as_table<T: Tabular>(rows: &[T]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(T::headers());

    for row in rows {
        table.add_row(row.cells());
    }

    format!("{}\n", table)
}

/// Tab-separated rows, each prefixed with `prefix` cells when given
pub fn format_as_tsv<T: Tabular>(rows: &[T], prefix: &[(&str, &str)], header: bool) -> String {
    let mut output = String::new();

    if header {
        let mut columns: Vec<&str> = prefix.iter().map(|(name, _)| *name).collect();
        columns.extend(T::headers());
        output.push_str(&columns.join("\t"));
        output.push('\n');
    }

    for row in rows {
        let mut cells: Vec<String> = prefix.iter().map(|(_, value)| value.to_string()).collect();
        cells.extend(row.cells().into_iter().map(|cell| cell.replace(['\t', '\n'], " ")));
        output.push_str(&cells.join("\t"));
        output.push('\n');
    }

    output
}

/// Table or TSV rendering of one result list
pub fn format_rows<T: Tabular>(rows: &[T], format: OutputFormat) -> String {
    match format {
        OutputFormat::Tsv => format_as_tsv(rows, &[], true),
        _ if rows.is_empty() => "No results.\n".to_string(),
        _ => format_as_table(rows),
    }
}

/// Warn on stderr about tokens that were not resolved
pub fn report_unresolved(unresolved: &[String]) {
    if unresolved.is_empty() {
        return;
    }
    eprintln!(
        "{} Could not resolve {} identifier(s): {}",
        "warning:".yellow().bold(),
        unresolved.len(),
        unresolved.join(", ")
    );
}

/// Print an analysis outcome in `format`.
///
/// JSON output always carries the full envelope, including failures; the
/// error is still returned so the process exits non-zero.
pub fn emit<T, F>(
    format: OutputFormat,
    result: cogex_enrichment::Result<T>,
    unresolved: Vec<String>,
    render: F,
) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T, OutputFormat) -> String,
{
    match format {
        OutputFormat::Json => {
            let response = AnalysisResponse::from_result(result, unresolved);
            println!("{}", serde_json::to_string_pretty(&response)?);
            match response {
                AnalysisResponse::Ok { .. } => Ok(()),
                AnalysisResponse::Error { error, .. } => Err(CliError::analysis(error.message)),
            }
        },
        OutputFormat::Table | OutputFormat::Tsv => {
            report_unresolved(&unresolved);
            let results = result?;
            print!("{}", render(&results, format));
            Ok(())
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn row(curie: &str, p: f64) -> OraRow {
        OraRow {
            curie: curie.parse().unwrap(),
            name: "term\twith tab".to_string(),
            overlap: 2,
            set_size: 10,
            p,
            q: p * 2.0,
            mlp: -p.log10(),
            mlq: -(p * 2.0).log10(),
        }
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(0.5), "0.5000");
        assert_eq!(format_float(0.0), "0.0000");
        assert_eq!(format_float(0.00012), "1.200e-4");
        assert_eq!(format_float(-2.25), "-2.2500");
    }

    #[test]
    fn test_tsv_has_header_and_prefix() {
        let tsv = format_as_tsv(&[row("go:0000001", 0.01)], &[("dataset", "go")], true);
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "dataset\tcurie\tname\toverlap\tset_size\tp\tq\tmlp\tmlq");
        assert!(lines[1].starts_with("go\tgo:0000001\tterm with tab\t2\t10\t0.0100\t0.0200"));
    }

    #[test]
    fn test_table_contains_rows() {
        let table = format_rows(&[row("go:0000001", 0.01)], OutputFormat::Table);
        assert!(table.contains("go:0000001"));
        assert!(table.contains("set_size"));
        assert_eq!(format_rows::<OraRow>(&[], OutputFormat::Table), "No results.\n");
    }

    #[test]
    fn test_missing_pvalue_renders_na() {
        let row = RcrRow {
            curie: "fplx:AKT".parse().unwrap(),
            name: "AKT".to_string(),
            correct: 0,
            incorrect: 0,
            ambiguous: 3,
            binom_pvalue: None,
            binom_ambig_pvalue: Some(1.0),
        };
        let cells = row.cells();
        assert_eq!(cells[5], "NA");
        assert_eq!(cells[6], "1.0000");
    }
}
