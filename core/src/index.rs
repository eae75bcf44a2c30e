use crate::tokenizer::{fold_term, tokenize};
use crate::DocId;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub count: u32, // occurrences of the term in doc_id
}

/// Term -> postings map built from one corpus snapshot.
///
/// The index is never updated in place: rebuilding means calling
/// [`InvertedIndex::build`] again and replacing the old value.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: HashMap<String, Vec<Posting>>, // postings sorted by doc_id
    num_docs: u32,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Build the index from `docs`, where a document's position is its id.
    ///
    /// Documents are tokenized and counted in parallel on the rayon pool; each
    /// one then merges its local counts under a single lock.
    pub fn build<S: AsRef<str> + Sync>(docs: &[S]) -> Self {
        let docs = within_id_space(docs, DocId::MAX as usize);
        let merged: Mutex<HashMap<String, Vec<Posting>>> = Mutex::new(HashMap::new());

        docs.par_iter().enumerate().for_each(|(i, text)| {
            let doc_id = i as DocId;
            let local = term_counts(text.as_ref());
            let mut postings = merged.lock();
            for (term, count) in local {
                postings.entry(term).or_default().push(Posting { doc_id, count });
            }
        });

        let mut postings = merged.into_inner();
        // Completion order of the workers is arbitrary.
        for plist in postings.values_mut() {
            plist.sort_unstable_by_key(|p| p.doc_id);
        }

        let num_docs = docs.len() as u32;
        tracing::debug!(num_docs, num_terms = postings.len(), "built inverted index");
        Self { postings, num_docs }
    }

    /// Postings for `term`, sorted by doc id. Unknown terms give an empty slice.
    pub fn lookup(&self, term: &str) -> &[Posting] {
        self.postings
            .get(&fold_term(term))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> + '_ {
        self.postings.keys().map(String::as_str)
    }

    pub fn num_docs(&self) -> u32 { self.num_docs }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }
}

/// Keep only the first `limit` documents so every position fits in a `DocId`.
fn within_id_space<S>(docs: &[S], limit: usize) -> &[S] {
    if docs.len() <= limit {
        return docs;
    }
    tracing::warn!(num_docs = docs.len(), limit, "corpus exceeds doc id space, extra documents ignored");
    &docs[..limit]
}

/// Count term occurrences within a single document.
///
/// Counts saturate at `u32::MAX`.
pub fn term_counts(text: &str) -> HashMap<String, u32> {
    let mut tf: HashMap<String, u32> = HashMap::new();
    for term in tokenize(text) {
        let count = tf.entry(term).or_insert(0);
        *count = count.saturating_add(1);
    }
    tf
}
