use crate::index::InvertedIndex;
use crate::tokenizer::tokenize;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Upper bound on results returned per query, before any caller-side limit.
pub const MAX_RESULTS: usize = 5;

const RANK_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RelevanceResult {
    pub doc_id: DocId,
    pub rank: f32, // absolute relevance / best absolute relevance for the query
}

impl PartialEq for RelevanceResult {
    fn eq(&self, other: &Self) -> bool {
        self.doc_id == other.doc_id && (self.rank - other.rank).abs() < RANK_EPSILON
    }
}

/// Rank every query against `index`, one result list per query in input order.
pub fn rank<S: AsRef<str>>(index: &InvertedIndex, queries: &[S]) -> Vec<Vec<RelevanceResult>> {
    queries.iter().map(|q| rank_query(index, q.as_ref())).collect()
}

/// Rank a single query by summed term frequency.
///
/// Documents that contain none of the query terms are left out entirely. The
/// best document gets rank 1.0; ties are ordered by ascending doc id and at
/// most [`MAX_RESULTS`] entries are kept.
pub fn rank_query(index: &InvertedIndex, query: &str) -> Vec<RelevanceResult> {
    let mut totals: HashMap<DocId, u64> = HashMap::new();
    for term in tokenize(query) {
        for p in index.lookup(&term) {
            *totals.entry(p.doc_id).or_insert(0) += u64::from(p.count);
        }
    }

    let Some(&max_abs) = totals.values().max() else {
        return Vec::new();
    };

    let mut scored: Vec<(DocId, u64)> = totals.into_iter().collect();
    scored.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut ranked: Vec<RelevanceResult> = scored
        .into_iter()
        .map(|(doc_id, abs)| RelevanceResult { doc_id, rank: abs as f32 / max_abs as f32 })
        .collect();
    order_ties_by_doc_id(&mut ranked);
    ranked.truncate(MAX_RESULTS);
    ranked
}

/// Ranks closer than [`RANK_EPSILON`] to the first rank of their run count as
/// tied and are reordered by ascending doc id. `ranked` must already be
/// sorted by descending rank.
fn order_ties_by_doc_id(ranked: &mut [RelevanceResult]) {
    let mut start = 0;
    while start < ranked.len() {
        let head = ranked[start].rank;
        let end = ranked[start..]
            .iter()
            .position(|r| head - r.rank >= RANK_EPSILON)
            .map_or(ranked.len(), |n| start + n);
        ranked[start..end].sort_unstable_by_key(|r| r.doc_id);
        start = end;
    }
}
