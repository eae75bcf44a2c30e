/// Fold a single token the way every indexed term is folded.
pub fn fold_term(term: &str) -> String {
    term.to_lowercase()
}

/// Tokenize text into lowercase terms, splitting on whitespace only.
///
/// Punctuation is kept as part of the token, so `"water,"` and `"water"` are
/// different terms.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(fold_term).collect()
}
