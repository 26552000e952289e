//! On-disk GSEA output: the result table and running-score plots

use super::{running_enrichment, EnrichmentRecord, GseaOptions, GseaRow, Ranking};
use crate::error::Result;
use plotly::common::{Mode, Title};
use plotly::layout::Axis;
use plotly::{Layout, Plot, Scatter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const REPORT_FILE_NAME: &str = "gsea_report.tsv";

/// Write `gsea_report.tsv` and one HTML plot for each of the best
/// `options.plot_count` records into `directory`, creating it if needed
pub fn write_report(
    directory: &Path,
    ranking: &Ranking,
    records: &[EnrichmentRecord],
    options: &GseaOptions,
) -> Result<()> {
    fs::create_dir_all(directory)?;

    let report_path = directory.join(REPORT_FILE_NAME);
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_path(&report_path)?;
    for record in records {
        writer.serialize(GseaRow::from(record))?;
    }
    writer.flush()?;

    let mut plots = 0usize;
    for record in records.iter().take(options.plot_count) {
        let path = plot_path(directory, record);
        fs::write(&path, running_score_plot(ranking, record, options.weight).to_html())?;
        debug!(path = %path.display(), "Wrote enrichment plot");
        plots += 1;
    }

    info!(
        directory = %directory.display(),
        rows = records.len(),
        plots,
        "Wrote GSEA report"
    );
    Ok(())
}

/// `<term>.html` with characters unsafe in file names replaced
pub fn plot_path(directory: &Path, record: &EnrichmentRecord) -> PathBuf {
    let stem: String = record
        .term
        .id
        .curie()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    directory.join(format!("{}.html", stem))
}

fn running_score_plot(ranking: &Ranking, record: &EnrichmentRecord, weight: f64) -> Plot {
    let running = running_enrichment(ranking.scores(), &record.hits, weight);
    let ranks: Vec<usize> = (0..running.len()).collect();

    let mut plot = Plot::new();
    plot.add_trace(
        Scatter::new(ranks, running)
            .mode(Mode::Lines)
            .name("Enrichment score"),
    );
    let hit_scores = vec![0.0; record.hits.len()];
    let hit_labels: Vec<String> = record.hits.iter().map(|&i| ranking.genes()[i].clone()).collect();
    plot.add_trace(
        Scatter::new(record.hits.clone(), hit_scores)
            .mode(Mode::Markers)
            .name("Hits")
            .text_array(hit_labels),
    );

    plot.set_layout(
        Layout::new()
            .title(Title::with_text(format!(
                "{} ({}) NES={:.3} p={:.3}",
                record.term.name, record.term.id, record.nes, record.pval
            )))
            .x_axis(Axis::new().title(Title::with_text("Rank in ordered gene list")))
            .y_axis(Axis::new().title(Title::with_text("Running enrichment score"))),
    );
    plot
}
