//! Text normalization and matching.
//!
//! Pure utilities used for query matching, duplicate suppression and alias
//! filtering. Identity everywhere is the normalized form, never raw string
//! equality.

mod aliases;
mod latin;
mod normalize;

pub use aliases::{extract_json_aliases, extract_labeled_aliases, split_alias_list, AliasCollector};
pub use latin::is_latin_alphabet_name;
pub use normalize::{
    filter_stop_words, matches, normalize, tokenize, NormalizedSet, QueryMatcher, STOP_WORDS,
};
