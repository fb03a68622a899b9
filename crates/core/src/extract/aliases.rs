//! Related-title discovery on an item page.

use super::locator::{LocatorChain, Page};
use crate::matching::{extract_json_aliases, extract_labeled_aliases, split_alias_list, AliasCollector};

/// Which alias sources a site exposes.
#[derive(Debug, Clone, Default)]
pub struct AliasRules {
    /// Scan visible text for `Alternative Names:` style labels.
    pub labeled: bool,
    /// Scan raw markup for alias-like JSON fields.
    pub embedded_json: bool,
    /// Unlabeled, delimiter-separated lists next to headings.
    pub adjacent: LocatorChain,
}

impl AliasRules {
    /// Related titles for `title`, filtered and deduplicated.
    pub fn extract(&self, page: &Page, title: &str) -> Vec<String> {
        let mut collector = AliasCollector::new(title);
        if self.labeled {
            collector.extend(extract_labeled_aliases(&page.text()));
        }
        if self.embedded_json {
            collector.extend(extract_json_aliases(page.raw()));
        }
        for block in self.adjacent.all(page) {
            collector.extend(split_alias_list(&block));
        }
        collector.finish()
    }
}
