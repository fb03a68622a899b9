//! Ordered, named locator rules applied to a fetched page.

use regex_lite::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::text::{clean_fragment, collapse_whitespace, decode_entities, html_to_text};

/// How one locator step finds a value.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// `<meta property=..>` or `<meta name=..>` content.
    Meta(&'static str),
    /// First matching element with a non-empty value: the attribute if
    /// given, else the element's text.
    Css {
        selector: &'static str,
        attr: Option<&'static str>,
    },
    /// First capture group of a pattern over the raw markup.
    Pattern(&'static Regex),
}

/// A named rule, so logs can say which step produced a value.
#[derive(Debug, Clone, Copy)]
pub struct LocatorStep {
    pub name: &'static str,
    pub rule: Rule,
}

/// Steps tried in order; the first non-empty value wins.
#[derive(Debug, Clone, Default)]
pub struct LocatorChain {
    steps: Vec<LocatorStep>,
}

impl LocatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn meta(mut self, name: &'static str, property: &'static str) -> Self {
        self.steps.push(LocatorStep {
            name,
            rule: Rule::Meta(property),
        });
        self
    }

    pub fn text(mut self, name: &'static str, selector: &'static str) -> Self {
        self.steps.push(LocatorStep {
            name,
            rule: Rule::Css {
                selector,
                attr: None,
            },
        });
        self
    }

    pub fn attr(mut self, name: &'static str, selector: &'static str, attr: &'static str) -> Self {
        self.steps.push(LocatorStep {
            name,
            rule: Rule::Css {
                selector,
                attr: Some(attr),
            },
        });
        self
    }

    pub fn pattern(mut self, name: &'static str, pattern: &'static Regex) -> Self {
        self.steps.push(LocatorStep {
            name,
            rule: Rule::Pattern(pattern),
        });
        self
    }

    pub fn steps(&self) -> &[LocatorStep] {
        &self.steps
    }

    /// Value of the first step that yields anything.
    pub fn first(&self, page: &Page) -> Option<String> {
        self.steps.iter().find_map(|step| {
            let value = page.apply(&step.rule).into_iter().next()?;
            debug!(step = step.name, "Locator matched");
            Some(value)
        })
    }

    /// Values from every step, in step order.
    pub fn all(&self, page: &Page) -> Vec<String> {
        self.steps.iter().flat_map(|s| page.apply(&s.rule)).collect()
    }
}

/// A parsed HTML page plus its raw markup.
///
/// Not `Send`; parse, extract and drop it without crossing an `.await`.
pub struct Page<'a> {
    raw: &'a str,
    doc: Html,
}

impl<'a> Page<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self {
            raw,
            doc: Html::parse_document(raw),
        }
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn document(&self) -> &Html {
        &self.doc
    }

    /// Visible text with one line per block element.
    pub fn text(&self) -> String {
        html_to_text(self.raw)
    }

    /// All non-empty values a rule yields, in document order.
    pub fn apply(&self, rule: &Rule) -> Vec<String> {
        match rule {
            Rule::Meta(property) => {
                let css = format!(r#"meta[property="{0}"], meta[name="{0}"]"#, property);
                self.select_values(&css, Some("content"))
            }
            Rule::Css { selector, attr } => self.select_values(selector, *attr),
            Rule::Pattern(re) => re
                .captures_iter(self.raw)
                .filter_map(|c| c.get(1))
                .map(|m| clean_fragment(m.as_str()))
                .filter(|v| !v.is_empty())
                .collect(),
        }
    }

    /// Elements matching `css`; an unparsable selector matches nothing.
    pub fn select(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(selector) => self.doc.select(&selector).collect(),
            Err(e) => {
                debug!(selector = css, error = %e, "Invalid selector");
                Vec::new()
            }
        }
    }

    fn select_values(&self, css: &str, attr: Option<&str>) -> Vec<String> {
        self.select(css)
            .into_iter()
            .filter_map(|el| match attr {
                Some(attr) => el.value().attr(attr).map(|v| decode_entities(v.trim())),
                None => Some(element_text(&el)),
            })
            .filter(|v| !v.is_empty())
            .collect()
    }
}

/// Collapsed text content of an element.
pub fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    static H1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<h1[^>]*>(.*?)</h1>").unwrap());

    const HTML: &str = r#"<html><head>
        <meta property="og:title" content="Solo Leveling &amp; Friends">
        <meta name="description" content="">
        <title>Solo Leveling - Example</title>
        </head><body>
        <h1 class="t"> <span>Solo</span> Leveling </h1>
        <img class="cover" data-src="/covers/solo.jpg">
        </body></html>"#;

    #[test]
    fn test_first_non_empty_wins() {
        let page = Page::parse(HTML);
        let chain = LocatorChain::new()
            .meta("description", "description")
            .meta("og-title", "og:title")
            .text("document-title", "title");
        assert_eq!(chain.first(&page).as_deref(), Some("Solo Leveling & Friends"));
    }

    #[test]
    fn test_css_text_and_attr() {
        let page = Page::parse(HTML);
        let title = LocatorChain::new().text("heading", "h1.t");
        assert_eq!(title.first(&page).as_deref(), Some("Solo Leveling"));

        let cover = LocatorChain::new()
            .attr("cover-src", "img.cover", "src")
            .attr("cover-lazy", "img.cover", "data-src");
        assert_eq!(cover.first(&page).as_deref(), Some("/covers/solo.jpg"));
    }

    #[test]
    fn test_pattern_rule_cleans_markup() {
        let page = Page::parse(HTML);
        let chain = LocatorChain::new().pattern("h1-pattern", &H1);
        assert_eq!(chain.first(&page).as_deref(), Some("Solo Leveling"));
    }

    #[test]
    fn test_nothing_found() {
        let page = Page::parse("<html></html>");
        let chain = LocatorChain::new().meta("og-image", "og:image");
        assert!(chain.first(&page).is_none());
        assert!(chain.all(&page).is_empty());
    }
}
