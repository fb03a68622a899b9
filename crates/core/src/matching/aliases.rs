//! Alias discovery from labeled text blocks and embedded JSON.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::Value;

use super::latin::is_latin_alphabet_name;
use super::normalize::NormalizedSet;

static LABELED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:alternative(?:\s+(?:names?|titles?))?|alt(?:ernate)?\.?\s+(?:names?|titles?)|other\s+names?|associated\s+names?|also\s+known\s+as|synonyms?)\s*:\s*([^\n]+)",
    )
    .expect("labeled alias pattern")
});

static JSON_ALIAS_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#""(?:alternativeTitles|alternative_titles|altTitles|alt_titles|alternativeNames|alternative_names|alternative|aliases|synonyms|otherNames|other_names)"\s*:\s*(\[[^\[\]]*\]|"(?:[^"\\]|\\.)*")"#,
    )
    .expect("json alias pattern")
});

/// Delimiters that always separate aliases.
const PRIMARY_DELIMITERS: &[char] = &[';', '|', '\n', '\u{3001}'];

/// Split a delimiter-separated alias list.
///
/// Semicolons, pipes, newlines, ideographic commas and ` / ` always split.
/// Plain commas split only when none of those are present, since commas
/// also occur inside titles.
pub fn split_alias_list(text: &str) -> Vec<String> {
    let has_primary = text.contains(PRIMARY_DELIMITERS) || text.contains(" / ");
    let pieces: Vec<&str> = if has_primary {
        text.split(PRIMARY_DELIMITERS)
            .flat_map(|p| p.split(" / "))
            .collect()
    } else {
        text.split(',').collect()
    };

    pieces
        .into_iter()
        .map(|p| {
            p.trim()
                .trim_matches(|c: char| c == '"' || c == '\u{2022}' || c == '*')
                .trim()
                .to_string()
        })
        .filter(|p| !p.is_empty())
        .collect()
}

/// Aliases listed after labels such as `Alternative Names:` in plain text.
pub fn extract_labeled_aliases(text: &str) -> Vec<String> {
    LABELED_BLOCK
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .flat_map(|m| split_alias_list(m.as_str()))
        .collect()
}

/// Aliases held in alias-like JSON fields embedded in a page.
///
/// Handles both raw JSON and the backslash-escaped JSON found inside
/// streamed script payloads.
pub fn extract_json_aliases(raw: &str) -> Vec<String> {
    let mut out = collect_json_aliases(raw);
    if raw.contains("\\\"") {
        out.extend(collect_json_aliases(&raw.replace("\\\"", "\"")));
    }
    out
}

fn collect_json_aliases(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    for caps in JSON_ALIAS_FIELD.captures_iter(raw) {
        let Some(m) = caps.get(1) else { continue };
        match serde_json::from_str::<Value>(m.as_str()) {
            Ok(Value::String(s)) => out.extend(split_alias_list(&s)),
            Ok(Value::Array(items)) => {
                for item in items {
                    match item {
                        Value::String(s) => out.extend(split_alias_list(&s)),
                        Value::Object(map) => {
                            if let Some(Value::String(s)) =
                                map.get("title").or_else(|| map.get("name"))
                            {
                                out.push(s.trim().to_string());
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    out
}

/// Accumulates related titles for one item.
///
/// Candidates must pass the Latin-alphabet filter, must not normalize to
/// the primary title, and are deduplicated by normalized key in offer
/// order.
#[derive(Debug)]
pub struct AliasCollector {
    seen: NormalizedSet,
    aliases: Vec<String>,
}

impl AliasCollector {
    pub fn new(primary_title: &str) -> Self {
        let mut seen = NormalizedSet::new();
        seen.insert(primary_title);
        Self {
            seen,
            aliases: Vec::new(),
        }
    }

    /// Offer one candidate. Returns true if it was kept.
    pub fn offer(&mut self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        if candidate.is_empty() || !is_latin_alphabet_name(candidate) {
            return false;
        }
        if !self.seen.insert(candidate) {
            return false;
        }
        self.aliases.push(candidate.to_string());
        true
    }

    pub fn extend<I, S>(&mut self, candidates: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for c in candidates {
            self.offer(c.as_ref());
        }
    }

    pub fn finish(self) -> Vec<String> {
        self.aliases
    }
}
