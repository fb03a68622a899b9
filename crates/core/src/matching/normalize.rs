use std::collections::HashSet;

/// Function words dropped from query tokens for fallback-index matching.
pub const STOP_WORDS: &[&str] = &["a", "an", "my", "of", "the", "to"];

/// Characters replaced by a space during normalization.
const PUNCTUATION: &[char] = &[
    '-', '_', ':', ';', ',', '.', '!', '?', '\'', '"', '\u{2018}', '\u{2019}', '\u{201C}',
    '\u{201D}', '(', ')', '[', ']', '{', '}', '/', '\\', '|', '&', '+', '*', '~', '#', '@',
    '\u{2013}', '\u{2014}', '\u{2026}', '\u{00B7}',
];

/// Lowercase, replace punctuation with spaces, collapse whitespace, trim.
///
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .map(|c| if PUNCTUATION.contains(&c) { ' ' } else { c })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace split with order-preserving de-duplication.
pub fn tokenize(normalized: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    normalized
        .split_whitespace()
        .filter(|t| seen.insert(*t))
        .map(str::to_string)
        .collect()
}

/// Remove [`STOP_WORDS`] from a token list.
pub fn filter_stop_words(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .cloned()
        .collect()
}

/// Substring match on the whole query, or AND-over-tokens containment.
///
/// This is containment, not fuzzy matching: every token must appear
/// somewhere in the normalized candidate.
pub fn matches(candidate: &str, normalized_query: &str, query_tokens: &[String]) -> bool {
    let candidate = normalize(candidate);
    if candidate.contains(normalized_query) {
        return true;
    }
    !query_tokens.is_empty() && query_tokens.iter().all(|t| candidate.contains(t.as_str()))
}

/// A query prepared once and matched against many candidates.
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    normalized: String,
    tokens: Vec<String>,
    content_tokens: Vec<String>,
}

impl QueryMatcher {
    pub fn new(query: &str) -> Self {
        let normalized = normalize(query);
        let tokens = tokenize(&normalized);
        let content_tokens = filter_stop_words(&tokens);
        Self {
            normalized,
            tokens,
            content_tokens,
        }
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Query tokens with stop words removed.
    pub fn content_tokens(&self) -> &[String] {
        &self.content_tokens
    }

    pub fn matches(&self, candidate: &str) -> bool {
        matches(candidate, &self.normalized, &self.tokens)
    }

    /// Match with stop words ignored. Used only once the full token list
    /// has failed.
    pub fn matches_relaxed(&self, candidate: &str) -> bool {
        if self.matches(candidate) {
            return true;
        }
        !self.content_tokens.is_empty()
            && self.content_tokens.len() < self.tokens.len()
            && matches(candidate, &self.normalized, &self.content_tokens)
    }

    /// Match against a title and its aliases.
    pub fn matches_any<I, S>(&self, titles: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        titles.into_iter().any(|t| self.matches(t.as_ref()))
    }
}

/// Set keyed by normalized form.
#[derive(Debug, Default, Clone)]
pub struct NormalizedSet {
    keys: HashSet<String>,
}

impl NormalizedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `text`. Returns false if an equivalent entry exists or the
    /// text normalizes to nothing.
    pub fn insert(&mut self, text: &str) -> bool {
        let key = normalize(text);
        if key.is_empty() {
            return false;
        }
        self.keys.insert(key)
    }

    pub fn contains(&self, text: &str) -> bool {
        self.keys.contains(&normalize(text))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
