//! Build automation tasks for CoGEx
//!
//! - Generating the CLI reference from the clap definitions

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for CoGEx", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<cogex_cli::Cli>();

    let content = format!(
        r#"# CoGEx CLI Reference

Generated from the CLI source on {}.

## Overview

`cogex` runs enrichment analyses against an INDRA CoGEx Neo4j graph:

- `cogex discrete` - over-representation analysis of a gene list against GO, Reactome,
  WikiPathways, HPO phenotypes and INDRA upstream/downstream sets
- `cogex signed` - reverse causal reasoning over up- and down-regulated genes
- `cogex continuous` - GSEA of a scored gene table
- `cogex metabolite` - over-representation analysis of ChEBI metabolites against enzyme sets
- `cogex cache` - build, inspect and clear the persisted gene-set cache

## Quick Start

```bash
export COGEX_NEO4J_URL=http://localhost:7474
export COGEX_NEO4J_USER=neo4j
export COGEX_NEO4J_PASSWORD=...

# Warm the persisted cache once; later runs read it with --sqlite-cache
cogex cache build

cogex --sqlite-cache discrete TP53 MDM2 CDKN1A BAX
cogex --sqlite-cache signed --up TP53 MDM2 --down CDKN1A
cogex --sqlite-cache continuous results.csv --source reactome --seed 42 -o gsea/
cogex --format json metabolite CHEBI:15377 ethanol
cogex enzyme 1.1.1.1 CHEBI:16236
```

## Environment Variables

- `COGEX_NEO4J_URL`, `COGEX_NEO4J_USER`, `COGEX_NEO4J_PASSWORD`, `COGEX_NEO4J_DATABASE` - graph connection
- `COGEX_QUERY_TIMEOUT_SECS` - per-query timeout (default: 600)
- `COGEX_CACHE_PATH` - persisted cache file
- `COGEX_USE_SQLITE_CACHE` - read through the persisted cache (`true`/`false`)
- `COGEX_HGNC_URL` - HGNC REST endpoint used for symbol lookup
- `COGEX_CHEBI_URL` - EBI Ontology Lookup Service used for metabolite names
- `COGEX_LOG_LEVEL`, `COGEX_LOG_OUTPUT`, `COGEX_LOG_FORMAT`, `COGEX_LOG_DIR` - logging

## Commands

{}

---

*Regenerate with `cargo run -p xtask -- generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
