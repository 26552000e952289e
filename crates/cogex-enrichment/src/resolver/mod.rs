//! Free-text identifier lists to canonical entity ids
//!
//! A field such as `"[HGNC:1100, 7157 'TP53']"` is split into tokens and
//! each token resolved within one namespace: prefixed ids and bare numbers
//! are accepted directly, anything else goes through a [`NameResolver`].

mod chebi;
mod genenames;
mod hgnc;

pub use chebi::ChebiClient;
pub use genenames::GeneNamesClient;
pub use hgnc::HgncTable;

use crate::error::Result;
use async_trait::async_trait;
use cogex_common::{EntityId, Namespace};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

/// Symbol and name lookup for one identifier namespace
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Current id for a symbol, following previous symbols and aliases
    async fn resolve_symbol(&self, symbol: &str) -> Result<Option<EntityId>>;

    /// Display name of an id
    async fn name_for(&self, id: &EntityId) -> Result<Option<String>>;
}

/// Outcome of parsing one identifier field
///
/// Every distinct token lands in exactly one of `resolved`, `unresolved` or
/// `collapsed`, so `resolved.len() + unresolved.len() + collapsed` is the
/// number of distinct tokens in the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedIds {
    /// Resolved id to display name
    pub resolved: BTreeMap<EntityId, String>,
    /// Tokens that could not be resolved, in input order
    pub unresolved: Vec<String>,
    /// Tokens naming an entity an earlier token already resolved to, such
    /// as `HGNC:1100` followed by `1100`
    #[serde(default)]
    pub collapsed: usize,
}

impl ParsedIds {
    /// Local ids of resolved entities, the form gene-set members are stored in
    pub fn local_ids(&self) -> BTreeSet<String> {
        self.resolved.keys().map(|id| id.local_id.clone()).collect()
    }
}

/// Split a field on whitespace and commas, trimming brackets and quotes.
/// Empty tokens are dropped and repeats keep their first position.
pub fn tokenize(raw: &str) -> Vec<String> {
    let body = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let mut seen = HashSet::new();
    body.split(|c: char| c.is_whitespace() || c == ',')
        .map(|token| token.trim().trim_matches(|c: char| c == '"' || c == '\'').trim())
        .filter(|token| !token.is_empty())
        .filter(|token| seen.insert(token.to_string()))
        .map(str::to_string)
        .collect()
}

fn direct_id(token: &str, namespace: &Namespace) -> Option<EntityId> {
    if let Some((prefix, rest)) = token.split_once(':') {
        if Namespace::from_prefix(prefix) == *namespace {
            let id = EntityId::new(namespace.clone(), rest);
            return (!id.local_id.is_empty()).then_some(id);
        }
        return None;
    }
    token
        .chars()
        .all(|c| c.is_ascii_digit())
        .then(|| EntityId::new(namespace.clone(), token))
}

/// Resolve one token to an id of `namespace`
pub async fn resolve_token(
    token: &str,
    namespace: &Namespace,
    resolver: Option<&dyn NameResolver>,
) -> Result<Option<EntityId>> {
    if let Some(id) = direct_id(token, namespace) {
        return Ok(Some(id));
    }
    match resolver {
        Some(resolver) => Ok(resolver
            .resolve_symbol(token)
            .await?
            .filter(|id| id.is_in(namespace))),
        None => Ok(None),
    }
}

/// Parse `raw` into ids of `namespace`.
///
/// Without a resolver only prefixed and numeric tokens resolve. Resolver
/// failures are returned as errors rather than counted as unresolved. Two
/// tokens that resolve to the same entity keep the first token's entry and
/// count the second in [`ParsedIds::collapsed`].
pub async fn parse_id_field(
    raw: &str,
    namespace: &Namespace,
    resolver: Option<&dyn NameResolver>,
) -> Result<ParsedIds> {
    let mut found: Vec<(EntityId, String)> = Vec::new();
    let mut unresolved = Vec::new();

    for token in tokenize(raw) {
        match resolve_token(&token, namespace, resolver).await? {
            Some(id) => found.push((id, token)),
            None => unresolved.push(token),
        }
    }

    let mut resolved = BTreeMap::new();
    let mut collapsed = 0;
    for (id, token) in found {
        if resolved.contains_key(&id) {
            collapsed += 1;
            continue;
        }
        let name = match resolver {
            Some(resolver) => resolver.name_for(&id).await?.unwrap_or(token),
            None => token,
        };
        resolved.insert(id, name);
    }

    debug!(
        namespace = %namespace,
        resolved = resolved.len(),
        unresolved = unresolved.len(),
        collapsed,
        "Parsed identifier field"
    );
    Ok(ParsedIds {
        resolved,
        unresolved,
        collapsed,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_brackets_quotes_and_repeats() {
        let tokens = tokenize("['TP53', \"EGFR\",\n 7157  TP53,,]");
        assert_eq!(tokens, vec!["TP53", "EGFR", "7157"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("  [ ] ").is_empty());
    }

    #[test]
    fn test_direct_ids() {
        let hgnc = Namespace::Hgnc;
        assert_eq!(direct_id("HGNC:1100", &hgnc), Some(EntityId::hgnc("1100")));
        assert_eq!(direct_id("1100", &hgnc), Some(EntityId::hgnc("1100")));
        assert_eq!(direct_id("hgnc:", &hgnc), None);
        assert_eq!(direct_id("CHEBI:15377", &hgnc), None);
        assert_eq!(direct_id("TP53", &hgnc), None);
        assert_eq!(
            direct_id("chebi:CHEBI:15377", &Namespace::Chebi),
            Some(EntityId::chebi("15377"))
        );
    }

    #[tokio::test]
    async fn test_parse_without_resolver() {
        let parsed = parse_id_field("HGNC:1100, 7157, TP53", &Namespace::Hgnc, None)
            .await
            .unwrap();
        assert_eq!(parsed.resolved.len(), 2);
        assert_eq!(parsed.resolved[&EntityId::hgnc("7157")], "7157");
        assert_eq!(parsed.unresolved, vec!["TP53"]);
    }

    #[tokio::test]
    async fn test_same_entity_twice_collapses() {
        let parsed = parse_id_field("HGNC:1100 1100", &Namespace::Hgnc, None).await.unwrap();
        assert_eq!(parsed.resolved.len(), 1);
        assert!(parsed.unresolved.is_empty());
        assert_eq!(parsed.collapsed, 1);
        assert_eq!(parsed.resolved[&EntityId::hgnc("1100")], "HGNC:1100");
    }

    #[tokio::test]
    async fn test_every_distinct_token_is_accounted_for() {
        let raw = "HGNC:1100, 1100, hgnc:1100, 7157, TP53, 7157";
        let parsed = parse_id_field(raw, &Namespace::Hgnc, None).await.unwrap();

        assert_eq!(parsed.resolved.len(), 2);
        assert_eq!(parsed.unresolved, vec!["TP53"]);
        assert_eq!(parsed.collapsed, 2);
        assert_eq!(
            parsed.resolved.len() + parsed.unresolved.len() + parsed.collapsed,
            tokenize(raw).len()
        );
    }
}
