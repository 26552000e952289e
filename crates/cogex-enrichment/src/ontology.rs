//! Ontology hierarchy and gene-set extension
//!
//! Annotations are usually made to the most specific term that applies.
//! Extending a mapping credits every ancestor term with the genes of its
//! descendants, so enrichment against a broad term sees the whole subtree.

use crate::error::{EnrichmentError, Result};
use crate::gene_sets::{queries, GeneSetMapping};
use crate::graph::GraphStore;
use cogex_common::{EntityId, Namespace, Term};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, info};

/// Parent/child hierarchy over `isa` and `partof` edges
#[derive(Debug, Clone, Default)]
pub struct Ontology {
    children: HashMap<EntityId, Vec<EntityId>>,
    edges: usize,
}

impl Ontology {
    /// Build from `(child, parent)` pairs. Duplicate edges are kept once.
    pub fn from_edges(edges: impl IntoIterator<Item = (EntityId, EntityId)>) -> Self {
        let mut children: HashMap<EntityId, Vec<EntityId>> = HashMap::new();
        let mut seen = HashSet::new();
        for (child, parent) in edges {
            if seen.insert((child.clone(), parent.clone())) {
                children.entry(parent).or_default().push(child);
            }
        }
        Self {
            children,
            edges: seen.len(),
        }
    }

    /// Parse the `[Term]` stanzas of an OBO file, keeping `is_a` and
    /// `relationship: part_of` edges
    pub fn from_obo(content: &str) -> Result<Self> {
        let mut edges = Vec::new();
        let mut current: Option<EntityId> = None;
        let mut in_term = false;

        for line in content.lines() {
            let line = line.trim();

            if line.starts_with('[') {
                in_term = line == "[Term]";
                current = None;
                continue;
            }
            if !in_term || line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim() {
                "id" => current = Some(value.parse()?),
                "is_a" => {
                    // "GO:0008150 ! biological_process"
                    let (Some(child), Some(parent)) = (&current, value.split_whitespace().next())
                    else {
                        continue;
                    };
                    edges.push((child.clone(), parent.parse()?));
                },
                "relationship" => {
                    let mut parts = value.split_whitespace();
                    let (Some("part_of"), Some(parent), Some(child)) =
                        (parts.next(), parts.next(), &current)
                    else {
                        continue;
                    };
                    edges.push((child.clone(), parent.parse()?));
                },
                _ => {},
            }
        }

        if edges.is_empty() {
            return Err(EnrichmentError::insufficient_data(
                "OBO content has no is_a or part_of edges",
            ));
        }

        Ok(Self::from_edges(edges))
    }

    /// Load the hierarchy of `namespace` from the graph
    pub async fn load(store: &dyn GraphStore, namespace: &Namespace) -> Result<Self> {
        let query = queries::ontology_query(namespace);
        let records = store.query(&query.text, &query.params).await?;

        let mut edges = Vec::with_capacity(records.len());
        for record in &records {
            let child = record
                .str_at(0)
                .map_err(|reason| EnrichmentError::malformed(&query.text, reason))?;
            let parent = record
                .str_at(1)
                .map_err(|reason| EnrichmentError::malformed(&query.text, reason))?;
            edges.push((child.parse()?, parent.parse()?));
        }

        let ontology = Self::from_edges(edges);
        info!(namespace = %namespace, edges = ontology.edges, "Loaded ontology");
        Ok(ontology)
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.edges == 0
    }

    pub fn children(&self, id: &EntityId) -> &[EntityId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All transitive descendants of `id`, excluding `id` itself even when
    /// a cycle leads back to it
    pub fn descendants(&self, id: &EntityId) -> HashSet<EntityId> {
        let mut visited: HashSet<EntityId> = HashSet::new();
        let mut stack: Vec<&EntityId> = self.children(id).iter().collect();

        while let Some(next) = stack.pop() {
            if next == id || !visited.insert(next.clone()) {
                continue;
            }
            stack.extend(self.children(next));
        }

        visited
    }
}

/// Members found at or below each node, computed once per node
///
/// A depth-first pass in Tarjan's order finalizes every strongly connected
/// component as a whole, so terms on a cycle share one set and the pass
/// terminates.
struct SubtreeMembers<'a> {
    ontology: &'a Ontology,
    own: HashMap<&'a EntityId, &'a BTreeSet<String>>,
    done: HashMap<&'a EntityId, Rc<BTreeSet<String>>>,
    order: HashMap<&'a EntityId, usize>,
    low: HashMap<&'a EntityId, usize>,
    stack: Vec<&'a EntityId>,
    on_stack: HashSet<&'a EntityId>,
}

impl<'a> SubtreeMembers<'a> {
    fn new(ontology: &'a Ontology, mapping: &'a GeneSetMapping) -> Self {
        Self {
            ontology,
            own: mapping.iter().map(|(term, members)| (&term.id, members)).collect(),
            done: HashMap::new(),
            order: HashMap::new(),
            low: HashMap::new(),
            stack: Vec::new(),
            on_stack: HashSet::new(),
        }
    }

    /// Union of the members of every strict descendant of `id`
    fn below(&mut self, id: &EntityId) -> BTreeSet<String> {
        let ontology = self.ontology;
        let mut members = BTreeSet::new();
        for child in ontology.children(id) {
            if !self.order.contains_key(child) {
                self.visit(child);
            }
            if let Some(set) = self.done.get(child) {
                members.extend(set.iter().cloned());
            }
        }
        members
    }

    fn visit(&mut self, node: &'a EntityId) {
        let ontology = self.ontology;
        let index = self.order.len();
        self.order.insert(node, index);
        self.low.insert(node, index);
        self.stack.push(node);
        self.on_stack.insert(node);

        for child in ontology.children(node) {
            let reached = if !self.order.contains_key(child) {
                self.visit(child);
                self.low.get(child).copied()
            } else if self.on_stack.contains(child) {
                self.order.get(child).copied()
            } else {
                None
            };
            if let (Some(reached), Some(low)) = (reached, self.low.get_mut(node)) {
                *low = (*low).min(reached);
            }
        }

        if self.low.get(node) != Some(&index) {
            return;
        }

        let mut component = Vec::new();
        while let Some(member) = self.stack.pop() {
            self.on_stack.remove(member);
            component.push(member);
            if member == node {
                break;
            }
        }

        // children inside the component are not finalized yet and are
        // covered through their own members
        let mut members = BTreeSet::new();
        for id in &component {
            if let Some(own) = self.own.get(id) {
                members.extend(own.iter().cloned());
            }
            for child in ontology.children(id) {
                if let Some(set) = self.done.get(child) {
                    members.extend(set.iter().cloned());
                }
            }
        }
        let members = Rc::new(members);
        for id in component {
            self.done.insert(id, Rc::clone(&members));
        }
    }
}

/// Union the members of every descendant term into each term of `mapping`.
///
/// Only terms already present gain members; no term is added and no member
/// removed. Descendant sets are read from the mapping as it was on entry,
/// so the result does not depend on iteration order and a second call
/// changes nothing. Each node's subtree is collected once per call.
pub fn extend_by_ontology(mapping: &mut GeneSetMapping, ontology: &Ontology) {
    if ontology.is_empty() || mapping.is_empty() {
        return;
    }

    let additions: Vec<(Term, BTreeSet<String>)> = {
        let mut subtree = SubtreeMembers::new(ontology, mapping);
        mapping
            .iter()
            .filter_map(|(term, members)| {
                let extra: BTreeSet<String> = subtree
                    .below(&term.id)
                    .into_iter()
                    .filter(|member| !members.contains(member))
                    .collect();
                (!extra.is_empty()).then(|| (term.clone(), extra))
            })
            .collect()
    };

    let mut added = 0usize;
    for (term, extra) in additions {
        if let Some(members) = mapping.get_mut(&term) {
            added += extra.len();
            members.extend(extra);
        }
    }

    debug!(terms = mapping.len(), added, "Extended gene sets by ontology");
}
