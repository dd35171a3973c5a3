//! Token-count gate for short documents

/// Number of whitespace-delimited tokens in `text`
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// True when no minimum is configured or `text` has at least `min_tokens` tokens
pub fn passes_filter(text: &str, min_tokens: Option<usize>) -> bool {
    match min_tokens {
        None => true,
        Some(min) => count_tokens(text) >= min,
    }
}
