//! Analysis entry points over the fixture graph

mod common;

use common::{fixture_store, local_ids, shared, MockGraphStore};
use cogex_enrichment::analysis::{
    AnalysisResponse, ContinuousOptions, DiscreteOptions, GeneAnalysis, ScoreColumns, ScoreTable,
    DISCRETE_DATASETS,
};
use cogex_enrichment::gene_sets::{queries, Dataset, Thresholds};
use cogex_enrichment::gsea::GseaOptions;
use cogex_enrichment::rcr::RcrOptions;
use cogex_enrichment::resolver::{HgncTable, NameResolver};
use cogex_enrichment::stats::CorrectionMethod;
use cogex_enrichment::{EnrichmentError, ErrorKind, GeneSetCache};
use async_trait::async_trait;
use cogex_common::EntityId;
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::sync::Arc;

fn analysis(store: MockGraphStore) -> (Arc<MockGraphStore>, GeneAnalysis) {
    let store = shared(store);
    let cache = Arc::new(GeneSetCache::new(store.clone()));
    (store, GeneAnalysis::new(cache))
}

#[tokio::test]
async fn test_discrete_returns_every_dataset() {
    let (store, analysis) = analysis(fixture_store());
    let results = analysis
        .discrete(&local_ids(&["1", "2", "3"]), &DiscreteOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), DISCRETE_DATASETS.len());
    let reactome = &results[&Dataset::Reactome];
    assert_eq!(reactome[0].overlap, 3);
    assert_eq!(reactome[0].set_size, 4);
    // one universe count plus one query per dataset
    assert_eq!(store.calls(), 1 + DISCRETE_DATASETS.len());

    let json = serde_json::to_value(&results).unwrap();
    assert!(json.get("indra-upstream").is_some());
    assert!(json.get("wikipathways").is_some());
}

#[tokio::test]
async fn test_discrete_with_ontology_extension() {
    let (_, analysis) = analysis(fixture_store());
    let options = DiscreteOptions {
        extend_ontologies: true,
        ..DiscreteOptions::default()
    };
    let results = analysis.discrete(&local_ids(&["3", "4", "5"]), &options).await.unwrap();

    let parent = results[&Dataset::Go]
        .iter()
        .find(|row| row.curie.curie() == "go:0000001")
        .unwrap();
    assert_eq!(parent.set_size, 5);
    assert_eq!(parent.overlap, 3);
}

#[tokio::test]
async fn test_signed_analysis() {
    let (_, analysis) = analysis(fixture_store().with_gene_sets(
        Dataset::PositiveStatements,
        &[("fplx:AKT", "AKT", &["hgnc:1", "hgnc:2", "hgnc:3", "hgnc:4"])],
    ));
    let rows = analysis
        .signed(&local_ids(&["1", "2"]), &local_ids(&["3"]), &RcrOptions::default())
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!((rows[0].correct, rows[0].incorrect, rows[0].ambiguous), (2, 1, 0));
}

#[tokio::test]
async fn test_continuous_requires_two_scores() {
    let (store, analysis) = analysis(fixture_store());
    let scores = HashMap::from([("1".to_string(), 1.0)]);
    let err = analysis
        .continuous(&scores, Dataset::Go, &ContinuousOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, EnrichmentError::InsufficientData(_)));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_continuous_rejects_statement_datasets() {
    let (_, analysis) = analysis(fixture_store());
    let scores: HashMap<String, f64> = (1..10).map(|i| (i.to_string(), i as f64)).collect();
    let err = analysis
        .continuous(&scores, Dataset::PositiveStatements, &ContinuousOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn test_continuous_over_go() {
    let (_, analysis) = analysis(fixture_store());
    let scores: HashMap<String, f64> = (1..=60).map(|i| (i.to_string(), 30.0 - i as f64)).collect();
    let options = ContinuousOptions {
        gsea: GseaOptions {
            min_size: 2,
            seed: Some(7),
            ..GseaOptions::default()
        },
        ..ContinuousOptions::default()
    };

    let rows = analysis.continuous(&scores, Dataset::Go, &options).await.unwrap();
    assert_eq!(rows.len(), 3);
    let parent = rows.iter().find(|r| r.curie.curie() == "go:0000001").unwrap();
    assert!(parent.es > 0.0);
}

#[tokio::test]
async fn test_metabolite_discrete_uses_metabolite_universe() {
    let (store, analysis) = analysis(fixture_store());
    let options = DiscreteOptions::metabolite();
    assert_eq!(options.method, Some(CorrectionMethod::Bonferroni));

    let rows = analysis
        .metabolite_discrete(&local_ids(&["15377"]), &options)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].overlap, 1);
    assert_eq!(rows[0].set_size, 2);
    // a single draw lands in a 2-member set out of 50
    assert!((rows[0].p - 2.0 / 50.0).abs() < 1e-12);
    assert_eq!(store.calls(), 2);
}

/// Metabolite names known to the test
struct MetaboliteNames;

#[async_trait]
impl NameResolver for MetaboliteNames {
    async fn resolve_symbol(&self, name: &str) -> cogex_enrichment::Result<Option<EntityId>> {
        Ok(match name.to_lowercase().as_str() {
            "water" => Some(EntityId::chebi("15377")),
            "ethanol" => Some(EntityId::chebi("16236")),
            _ => None,
        })
    }

    async fn name_for(&self, _id: &EntityId) -> cogex_enrichment::Result<Option<String>> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_metabolite_names_need_a_resolver() {
    let (_, plain) = analysis(fixture_store());
    let parsed = plain.parse_metabolites("Water, ethanol").await.unwrap();
    assert!(parsed.resolved.is_empty());
    assert_eq!(parsed.unresolved, vec!["Water", "ethanol"]);

    let (_, named) = analysis(fixture_store());
    let named = named.with_metabolite_resolver(Arc::new(MetaboliteNames));
    let parsed = named.parse_metabolites("Water, ethanol, kryptonite").await.unwrap();
    assert_eq!(parsed.local_ids(), local_ids(&["15377", "16236"]));
    assert_eq!(parsed.unresolved, vec!["kryptonite"]);

    let rows = named
        .metabolite_discrete(&parsed.local_ids(), &DiscreteOptions::metabolite())
        .await
        .unwrap();
    assert_eq!(rows[0].overlap, 2);
}

#[tokio::test]
async fn test_enzyme_analysis_explains_metabolites() {
    let ec: EntityId = "eccode:1.1.1.1".parse().unwrap();
    let chebi: BTreeSet<EntityId> = [EntityId::chebi("15377"), EntityId::chebi("16236")].into();
    let query = queries::enzyme_statement_query(&ec, &chebi, &Thresholds::default());
    let store = fixture_store().route(
        &query,
        vec![
            vec![json!("fplx:ADH"), json!("chebi:16236"), json!("IncreaseAmount"), json!(11), json!(1), json!(0.4)],
            vec![json!("fplx:ADH"), json!("chebi:15377"), json!("Activation"), json!(12), json!(6), json!(0.9)],
        ],
    );
    let (store, analysis) = analysis(store);

    let statements = analysis
        .enzyme_analysis(&ec, &chebi, &Thresholds::default())
        .await
        .unwrap();
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0].metabolite, EntityId::chebi("15377"));
    assert_eq!(statements[0].evidence_count, 6);
    assert_eq!(statements[1].stmt_type, "IncreaseAmount");

    let (text, params) = &store.queries()[0];
    assert!(text.contains("enzyme.id = $ec_code"));
    assert_eq!(params["chebi_ids"], json!(["chebi:15377", "chebi:16236"]));

    // other metabolites bind other parameters and find nothing here
    let other: BTreeSet<EntityId> = [EntityId::chebi("17234")].into();
    let none = analysis
        .enzyme_analysis(&ec, &other, &Thresholds::default())
        .await
        .unwrap();
    assert!(none.is_empty());
    assert_eq!(store.calls(), 2);
}

#[tokio::test]
async fn test_enzyme_analysis_rejects_foreign_ids() {
    let (store, analysis) = analysis(fixture_store());
    let gene = EntityId::hgnc("1100");
    let err = analysis
        .enzyme_analysis(&gene, &BTreeSet::new(), &Thresholds::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EnrichmentError::Config(_)));

    let ec: EntityId = "eccode:1.1.1.1".parse().unwrap();
    let genes: BTreeSet<EntityId> = [gene].into();
    assert!(analysis
        .enzyme_analysis(&ec, &genes, &Thresholds::default())
        .await
        .is_err());
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_parse_then_respond() {
    let table = HgncTable::from_reader("hgnc_id\tsymbol\nHGNC:1\tA1BG\nHGNC:2\tA2M\n".as_bytes()).unwrap();
    let (_, analysis) = analysis(fixture_store());
    let analysis = analysis.with_resolver(Arc::new(table));

    let parsed = analysis.parse_genes("A1BG, a2m, 3, NOPE").await.unwrap();
    assert_eq!(parsed.resolved.len(), 3);
    assert_eq!(parsed.unresolved, vec!["NOPE"]);

    let result = analysis.discrete(&parsed.local_ids(), &DiscreteOptions::default()).await;
    let response = AnalysisResponse::from_result(result, parsed.unresolved.clone());
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["unresolved"][0], "NOPE");
    assert!(json["results"]["go"].is_array());
}

#[tokio::test]
async fn test_failed_analysis_response() {
    let (_, analysis) = analysis(fixture_store());
    let result = analysis
        .continuous(&HashMap::new(), Dataset::Go, &ContinuousOptions::default())
        .await;
    let response = AnalysisResponse::from_result(result, vec![]);
    assert!(!response.is_ok());

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["kind"], "insufficient_data");
}

#[tokio::test]
async fn test_score_table_from_csv_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scores.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "gene_name,log2FoldChange,padj").unwrap();
    writeln!(file, "HGNC:1,2.0,0.01").unwrap();
    writeln!(file, "2,-1.5,0.2").unwrap();
    writeln!(file, "A1BG,NA,1").unwrap();

    let table = ScoreTable::from_path(&path, &ScoreColumns::default(), None).await.unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.scores["1"], 2.0);
    assert!(table.unresolved.is_empty());
}
