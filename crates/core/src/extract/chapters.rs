//! Chapter anchors, latest-chapter selection and chapter URL lookup.

use std::ops::Range;

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use reqwest::Url;

use super::dates::find_dates;
use super::text::{ceil_boundary, decode_entities, floor_boundary};

/// Tolerance when comparing a requested chapter number with a parsed one.
pub const CHAPTER_TOLERANCE: f64 = 1e-9;

/// Parse a chapter token: `244`, `67.5`, or the URL form `67-5`.
///
/// Anything else (including negatives) yields `None`.
pub fn parse_chapter_token(token: &str) -> Option<f64> {
    let token = token.trim().trim_end_matches('/');
    if token.is_empty() {
        return None;
    }

    let normalized = match token.split_once(['-', '_']) {
        Some((whole, frac)) => {
            if whole.is_empty()
                || frac.is_empty()
                || !whole.chars().all(|c| c.is_ascii_digit())
                || !frac.chars().all(|c| c.is_ascii_digit())
            {
                return None;
            }
            format!("{}.{}", whole, frac)
        }
        None => {
            if !token.chars().all(|c| c.is_ascii_digit() || c == '.') {
                return None;
            }
            token.to_string()
        }
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
}

/// One chapter link found in raw markup.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterAnchor {
    pub number: f64,
    pub href: Option<String>,
    /// Byte range of the whole match in the scanned markup.
    pub start: usize,
    pub end: usize,
}

/// Scan `raw` for chapter anchors.
///
/// `pattern` must have a named group `num` holding the chapter token and
/// may have a named group `href`. Unparsable tokens are skipped.
pub fn scan_anchors(raw: &str, pattern: &Regex) -> Vec<ChapterAnchor> {
    pattern
        .captures_iter(raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = parse_chapter_token(caps.name("num")?.as_str())?;
            Some(ChapterAnchor {
                number,
                href: caps.name("href").map(|m| decode_entities(m.as_str())),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// How far around an anchor to look for its date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub before: usize,
    pub after: usize,
}

impl Default for DateWindow {
    fn default() -> Self {
        Self {
            before: 400,
            after: 800,
        }
    }
}

/// Date belonging to the anchor spanning `start..end`.
///
/// Candidates are only taken from `limits` (the stretch between the
/// neighbouring anchors) intersected with `window`. The nearer of the
/// first date after the link and the last date before it wins; distance
/// after the link counts from its closing `</a>`. Ties go to the date
/// after.
pub fn date_near(
    raw: &str,
    start: usize,
    end: usize,
    limits: Range<usize>,
    window: DateWindow,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let after_start = ceil_boundary(raw, end);
    let after_end = floor_boundary(raw, end.saturating_add(window.after).min(limits.end));
    let after = if after_start < after_end {
        let region = &raw[after_start..after_end];
        let origin = region.find("</a>").map_or(0, |i| i + "</a>".len());
        find_dates(region, now)
            .first()
            .map(|m| (m.start.saturating_sub(origin), m.at))
    } else {
        None
    };

    let before_end = floor_boundary(raw, start);
    let before_start = ceil_boundary(raw, start.saturating_sub(window.before).max(limits.start));
    let before = if before_start < before_end {
        let region = &raw[before_start..before_end];
        find_dates(region, now)
            .last()
            .map(|m| (region.len() - m.end, m.at))
    } else {
        None
    };

    match (after, before) {
        (Some((a, at)), Some((b, bt))) => Some(if b < a { bt } else { at }),
        (Some((_, at)), None) => Some(at),
        (None, Some((_, bt))) => Some(bt),
        (None, None) => None,
    }
}

/// Highest chapter on a page with its best-effort update time.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestChapter {
    pub number: f64,
    pub updated_at: Option<DateTime<Utc>>,
    pub href: Option<String>,
}

/// Pick the maximum chapter among `anchors`.
///
/// When several anchors share the maximum, the one with the latest
/// resolvable date wins over one without.
pub fn latest_chapter(
    raw: &str,
    anchors: &[ChapterAnchor],
    window: DateWindow,
    now: DateTime<Utc>,
) -> Option<LatestChapter> {
    let max = anchors
        .iter()
        .map(|a| a.number)
        .fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |m| m.max(n))))?;

    let mut best: Option<LatestChapter> = None;
    for (i, anchor) in anchors.iter().enumerate().filter(|(_, a)| a.number == max) {
        let lower = i.checked_sub(1).map_or(0, |p| anchors[p].end);
        let upper = anchors.get(i + 1).map_or(raw.len(), |n| n.start);
        let updated_at = date_near(raw, anchor.start, anchor.end, lower..upper, window, now);
        let better = match &best {
            None => true,
            Some(current) => match (current.updated_at, updated_at) {
                (None, Some(_)) => true,
                (Some(old), Some(new)) => new > old,
                _ => false,
            },
        };
        if better {
            best = Some(LatestChapter {
                number: max,
                updated_at,
                href: anchor.href.clone(),
            });
        }
    }
    best
}

/// Href of the anchor whose number equals `chapter`, resolved against
/// `base`.
pub fn find_chapter_href(anchors: &[ChapterAnchor], chapter: f64, base: &Url) -> Option<String> {
    anchors
        .iter()
        .filter(|a| (a.number - chapter).abs() < CHAPTER_TOLERANCE)
        .find_map(|a| a.href.as_deref())
        .and_then(|href| base.join(href).ok())
        .map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use once_cell::sync::Lazy;

    static ANCHOR: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"<a href="(?P<href>[^"]*/chapter-(?P<num>[0-9]+(?:[-.][0-9]+)?)/?)""#).unwrap()
    });

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_chapter_token() {
        assert_eq!(parse_chapter_token("67-5"), Some(67.5));
        assert_eq!(parse_chapter_token("244"), Some(244.0));
        assert_eq!(parse_chapter_token("12.5"), Some(12.5));
        assert_eq!(parse_chapter_token("12/"), Some(12.0));
        assert_eq!(parse_chapter_token("abc"), None);
        assert_eq!(parse_chapter_token("-3"), None);
        assert_eq!(parse_chapter_token(""), None);
        assert_eq!(parse_chapter_token("1.2.3"), None);
    }

    #[test]
    fn test_latest_prefers_highest_with_adjacent_relative_date() {
        let raw = r#"<ul>
            <li><a href="/manga/x/chapter-299/">Chapter 299</a><span class="date">31 minutes ago</span></li>
            <li><a href="/manga/x/chapter-298/">Chapter 298</a><span class="date">March 3, 2024</span></li>
            <li><a href="/manga/x/chapter-297-5/">Chapter 297.5</a><span class="date">March 1, 2024</span></li>
        </ul>"#;
        let anchors = scan_anchors(raw, &ANCHOR);
        assert_eq!(anchors.len(), 3);
        assert_eq!(anchors[2].number, 297.5);

        let latest = latest_chapter(raw, &anchors, DateWindow::default(), now()).unwrap();
        assert_eq!(latest.number, 299.0);
        let at = latest.updated_at.unwrap();
        assert!(at <= now() - Duration::minutes(30));
        assert!(at >= now() - Duration::minutes(32));
        assert_eq!(latest.href.as_deref(), Some("/manga/x/chapter-299/"));
    }

    #[test]
    fn test_tie_prefers_dated_occurrence() {
        let raw = r#"<div><a href="/c/chapter-50">Latest</a></div>
            <p>filler</p>
            <li><a href="/c/chapter-50">Chapter 50</a> <i>2 days ago</i></li>"#;
        let anchors = scan_anchors(raw, &ANCHOR);
        let window = DateWindow {
            before: 10,
            after: 40,
        };
        let latest = latest_chapter(raw, &anchors, window, now()).unwrap();
        assert_eq!(latest.number, 50.0);
        assert_eq!(latest.updated_at, Some(now() - Duration::days(2)));
    }

    #[test]
    fn test_date_before_anchor_is_used_when_none_after() {
        let raw = r#"<span>Jan 2, 2024</span><a href="/chapter-7">7</a>"#;
        let anchors = scan_anchors(raw, &ANCHOR);
        let latest = latest_chapter(raw, &anchors, DateWindow::default(), now()).unwrap();
        assert_eq!(
            latest.updated_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_latest_with_dates_preceding_links() {
        let raw = r#"<ul>
            <li><span>31 minutes ago</span> <a href="/manga/x/chapter-299/">Chapter 299</a></li>
            <li><span>March 3, 2024</span> <a href="/manga/x/chapter-298/">Chapter 298</a></li>
            <li><span>March 1, 2024</span> <a href="/manga/x/chapter-297/">Chapter 297</a></li>
        </ul>"#;
        let anchors = scan_anchors(raw, &ANCHOR);
        let latest = latest_chapter(raw, &anchors, DateWindow::default(), now()).unwrap();
        assert_eq!(latest.number, 299.0);
        let at = latest.updated_at.unwrap();
        assert!(at <= now() - Duration::minutes(30));
        assert!(at >= now() - Duration::minutes(32));
    }

    #[test]
    fn test_date_window_stops_at_neighbouring_anchor() {
        let raw = r#"<a href="/chapter-9">9</a> <a href="/chapter-8">8</a> <i>May 1, 2024</i>"#;
        let anchors = scan_anchors(raw, &ANCHOR);
        let latest = latest_chapter(raw, &anchors, DateWindow::default(), now()).unwrap();
        assert_eq!(latest.number, 9.0);
        assert_eq!(latest.updated_at, None);
    }

    #[test]
    fn test_no_anchors() {
        assert!(latest_chapter("<p></p>", &[], DateWindow::default(), now()).is_none());
    }

    #[test]
    fn test_find_chapter_href() {
        let raw = r#"<a href="/manga/x/chapter-10/"></a><a href="/manga/x/chapter-10-5/"></a>"#;
        let anchors = scan_anchors(raw, &ANCHOR);
        let base = Url::parse("https://www.mgeko.cc/").unwrap();
        assert_eq!(
            find_chapter_href(&anchors, 10.5, &base).as_deref(),
            Some("https://www.mgeko.cc/manga/x/chapter-10-5/")
        );
        assert!(find_chapter_href(&anchors, 11.0, &base).is_none());
    }
}
