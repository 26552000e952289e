//! Ontology extension properties

use cogex_common::{EntityId, Namespace, Term};
use cogex_enrichment::gene_sets::GeneSetMapping;
use cogex_enrichment::ontology::{extend_by_ontology, Ontology};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn go(i: u8) -> EntityId {
    EntityId::new(Namespace::Go, format!("{:07}", i))
}

fn arbitrary_case() -> impl Strategy<Value = (GeneSetMapping, Ontology)> {
    let mapping = prop::collection::btree_map(
        0u8..15,
        prop::collection::btree_set((0u8..30).prop_map(|g| g.to_string()), 0..6),
        0..12,
    )
    .prop_map(|sets| {
        sets.into_iter()
            .map(|(i, members)| (Term::new(go(i), format!("term {}", i)), members))
            .collect::<GeneSetMapping>()
    });
    // arbitrary edges, cycles included
    let edges = prop::collection::vec((0u8..15, 0u8..15), 0..30)
        .prop_map(|edges| Ontology::from_edges(edges.into_iter().map(|(c, p)| (go(c), go(p)))));
    (mapping, edges)
}

proptest! {
    #[test]
    fn prop_extension_is_idempotent((mapping, ontology) in arbitrary_case()) {
        let mut once = mapping;
        extend_by_ontology(&mut once, &ontology);
        let mut twice = once.clone();
        extend_by_ontology(&mut twice, &ontology);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_extension_only_widens((mapping, ontology) in arbitrary_case()) {
        let mut extended = mapping.clone();
        extend_by_ontology(&mut extended, &ontology);

        prop_assert_eq!(
            extended.keys().collect::<Vec<_>>(),
            mapping.keys().collect::<Vec<_>>()
        );
        for (term, members) in &mapping {
            prop_assert!(extended[term].is_superset(members));
        }
    }
}

#[test]
fn test_obo_hierarchy_extends_mapping() {
    let obo = "\
format-version: 1.2

[Term]
id: GO:0000001
name: root

[Term]
id: GO:0000002
name: middle
is_a: GO:0000001 ! root

[Term]
id: GO:0000003
name: leaf
relationship: part_of GO:0000002 ! middle
";
    let ontology = Ontology::from_obo(obo).unwrap();
    assert_eq!(ontology.edge_count(), 2);

    let root = Term::new(go(1), "root");
    let leaf = Term::new(go(3), "leaf");
    let mut mapping = GeneSetMapping::new();
    mapping.insert(root.clone(), BTreeSet::from(["a".to_string()]));
    mapping.insert(leaf, BTreeSet::from(["b".to_string(), "c".to_string()]));

    extend_by_ontology(&mut mapping, &ontology);
    assert_eq!(mapping[&root].len(), 3);
}
