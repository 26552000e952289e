//! Reverse causal reasoning scenarios and properties

mod common;

use common::{local_ids, shared, MockGraphStore};
use cogex_common::Term;
use cogex_enrichment::gene_sets::{Dataset, GeneSetMapping, Thresholds};
use cogex_enrichment::rcr::{score_hypotheses, RcrEngine, RcrOptions};
use cogex_enrichment::GeneSetCache;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

fn targets(sets: &[(&str, &[&str])]) -> GeneSetMapping {
    sets.iter()
        .map(|(curie, members)| (Term::new(curie.parse().unwrap(), *curie), local_ids(members)))
        .collect()
}

fn small_options() -> RcrOptions {
    RcrOptions {
        minimum_size: 1,
        ..RcrOptions::default()
    }
}

#[test]
fn test_two_correct_predictions() {
    let positive = targets(&[("fplx:X", &["g1", "g2"])]);
    let negative = GeneSetMapping::new();

    let rows = score_hypotheses(
        &local_ids(&["g1", "g2"]),
        &BTreeSet::new(),
        &positive,
        &negative,
        &small_options(),
    )
    .unwrap();

    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!((row.correct, row.incorrect, row.ambiguous), (2, 0, 0));
    assert!((row.binom_pvalue.unwrap() - 0.25).abs() < 1e-12);
    assert!((row.binom_ambig_pvalue.unwrap() - 0.25).abs() < 1e-12);
}

#[test]
fn test_candidate_below_minimum_size_is_excluded() {
    let positive = targets(&[("fplx:Y", &["g1", "g2"]), ("fplx:Z", &["g1", "g2", "g3"])]);
    let negative = targets(&[("fplx:Y", &["g3"]), ("fplx:Z", &["g4"])]);

    let options = RcrOptions::default();
    let rows = score_hypotheses(
        &local_ids(&["g1", "g2"]),
        &local_ids(&["g3"]),
        &positive,
        &negative,
        &options,
    )
    .unwrap();

    assert_eq!(options.minimum_size, 4);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].curie.curie(), "fplx:Z");
}

#[test]
fn test_opposite_regulation_is_incorrect() {
    let positive = targets(&[("hgnc:10", &["down1", "down2"])]);
    let negative = targets(&[("hgnc:10", &["up1", "up2"])]);

    let rows = score_hypotheses(
        &local_ids(&["up1", "up2"]),
        &local_ids(&["down1", "down2"]),
        &positive,
        &negative,
        &small_options(),
    )
    .unwrap();

    assert_eq!((rows[0].correct, rows[0].incorrect, rows[0].ambiguous), (0, 4, 0));
    assert!((rows[0].binom_pvalue.unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn test_no_decided_predictions_gives_undefined_p_values() {
    let positive = targets(&[("fplx:A", &["g1"]), ("fplx:B", &["u1", "u2"])]);
    let negative = targets(&[("fplx:A", &["g1"])]);

    let rows = score_hypotheses(
        &local_ids(&["u1", "u2"]),
        &BTreeSet::new(),
        &positive,
        &negative,
        &small_options(),
    )
    .unwrap();

    // B first; A has only an ambiguous overlap and sorts last
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].curie.curie(), "fplx:B");
    assert_eq!(rows[1].curie.curie(), "fplx:A");
    assert_eq!(rows[1].binom_pvalue, None);
    assert_eq!(rows[1].binom_ambig_pvalue, None);
}

#[test]
fn test_keep_insignificant_false_drops_weak_and_undefined_rows() {
    let up: Vec<String> = (0..8).map(|i| format!("u{}", i)).collect();
    let up_refs: Vec<&str> = up.iter().map(String::as_str).collect();
    let positive = targets(&[("fplx:STRONG", up_refs.as_slice()), ("fplx:WEAK", &["u0"]), ("fplx:NONE", &["x"])]);

    let options = RcrOptions {
        keep_insignificant: false,
        ..small_options()
    };
    let rows = score_hypotheses(
        &local_ids(&up_refs),
        &BTreeSet::new(),
        &positive,
        &GeneSetMapping::new(),
        &options,
    )
    .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].curie.curie(), "fplx:STRONG");
    assert!(rows[0].binom_pvalue.unwrap() < 0.05);
}

#[tokio::test]
async fn test_engine_reads_statement_datasets_through_cache() {
    let store = shared(
        MockGraphStore::new()
            .with_gene_sets(
                Dataset::PositiveStatements,
                &[("fplx:MAPK", "MAPK", &["hgnc:1", "hgnc:2", "hgnc:3"])],
            )
            .with_gene_sets(
                Dataset::NegativeStatements,
                &[("fplx:MAPK", "MAPK", &["hgnc:4"]), ("hgnc:9", "SMALL", &["hgnc:1"])],
            ),
    );
    let cache = Arc::new(GeneSetCache::new(store.clone()));
    let engine = RcrEngine::new(Arc::clone(&cache));

    let rows = engine
        .reverse_causal_reasoning(
            &local_ids(&["1", "2", "3"]),
            &local_ids(&["4"]),
            &RcrOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "MAPK");
    assert_eq!(rows[0].correct, 4);
    assert!((rows[0].binom_pvalue.unwrap() - 0.0625).abs() < 1e-12);
    assert_eq!(store.calls(), 2);
    assert!(cache.is_cached(Dataset::PositiveStatements, &Thresholds::default()));
}

fn gene_subset() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set((0u8..20).prop_map(|i| format!("g{}", i)), 0..12)
}

proptest! {
    #[test]
    fn prop_every_signed_gene_classified_once(
        positive_ids in gene_subset(),
        negative_ids in gene_subset(),
        candidates in prop::collection::vec((gene_subset(), gene_subset()), 1..6),
        minimum_size in 0usize..8,
    ) {
        let mut positive = GeneSetMapping::new();
        let mut negative = GeneSetMapping::new();
        for (i, (pos, neg)) in candidates.iter().enumerate() {
            let term = Term::new(format!("fplx:C{}", i).parse().unwrap(), format!("C{}", i));
            positive.insert(term.clone(), pos.clone());
            negative.insert(term, neg.clone());
        }
        let options = RcrOptions { minimum_size, ..RcrOptions::default() };

        let rows = score_hypotheses(&positive_ids, &negative_ids, &positive, &negative, &options).unwrap();
        let total = positive_ids.len() + negative_ids.len();
        for row in &rows {
            prop_assert_eq!(row.correct + row.incorrect + row.ambiguous, total);
        }

        let expected = candidates
            .iter()
            .filter(|(pos, neg)| pos.len() + neg.len() >= minimum_size)
            .count();
        prop_assert_eq!(rows.len(), expected);
    }
}
