//! Primary title extraction.

use super::locator::{LocatorChain, Page};
use super::text::collapse_whitespace;

/// Where a site keeps its title and the boilerplate wrapped around it.
#[derive(Debug, Clone)]
pub struct TitleRules {
    pub chain: LocatorChain,
    /// Trailing boilerplate removed case-insensitively, e.g. ` - MangaGeko`.
    pub suffixes: Vec<String>,
    /// Leading boilerplate removed case-insensitively, e.g. `Read `.
    pub prefixes: Vec<String>,
}

impl TitleRules {
    pub fn new(chain: LocatorChain) -> Self {
        Self {
            chain,
            suffixes: Vec::new(),
            prefixes: Vec::new(),
        }
    }

    pub fn with_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suffixes.extend(suffixes.into_iter().map(Into::into));
        self
    }

    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes.extend(prefixes.into_iter().map(Into::into));
        self
    }

    /// First located title that survives cleaning. Callers fall back to
    /// the prettified identifier on `None`.
    pub fn find(&self, page: &Page) -> Option<String> {
        self.chain
            .all(page)
            .iter()
            .map(|raw| self.clean(raw))
            .find(|t| !t.is_empty())
    }

    /// Strip configured boilerplate until nothing more comes off.
    pub fn clean(&self, raw: &str) -> String {
        let mut title = collapse_whitespace(raw);
        loop {
            let before = title.len();
            for suffix in &self.suffixes {
                if title.eq_ignore_ascii_case(suffix.trim()) {
                    title.clear();
                }
                if let Some(stripped) = strip_suffix_ignore_case(&title, suffix) {
                    title = stripped.trim_end().to_string();
                }
            }
            for prefix in &self.prefixes {
                if let Some(stripped) = strip_prefix_ignore_case(&title, prefix) {
                    title = stripped.trim_start().to_string();
                }
            }
            if title.len() == before {
                break;
            }
        }
        title.trim().to_string()
    }
}

fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let cut = text.len().checked_sub(suffix.len())?;
    let tail = text.get(cut..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &text[..cut])
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}
