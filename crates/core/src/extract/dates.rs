//! Absolute and relative date expressions in scraped text.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};

static ABSOLUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})(?:,?\s+(?:at\s+)?(\d{1,2}):(\d{2})(?:\s*(am|pm))?)?",
    )
    .expect("absolute date pattern")
});

static ISO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})(?:[T ](\d{2}):(\d{2})(?::(\d{2}))?(?:\.\d+)?(Z|[+-]\d{2}:\d{2})?)?")
        .expect("iso date pattern")
});

static RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d+|an?)\s+(seconds?|secs?|minutes?|mins?|hours?|hrs?|days?|weeks?|months?|years?)\s+ago\b",
    )
    .expect("relative date pattern")
});

static KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(just now|today|yesterday)\b").expect("keyword date pattern"));

/// A date expression found in text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateMatch {
    pub start: usize,
    pub end: usize,
    pub at: DateTime<Utc>,
}

/// Every resolvable date expression in `text`, ordered by position.
///
/// Relative expressions are resolved against `now`.
pub fn find_dates(text: &str, now: DateTime<Utc>) -> Vec<DateMatch> {
    let mut found = Vec::new();
    collect(&mut found, &ABSOLUTE, text, absolute);
    collect(&mut found, &ISO, text, iso);
    collect(&mut found, &RELATIVE, text, |c| relative(c, now));
    collect(&mut found, &KEYWORD, text, |c| keyword(c, now));
    found.sort_by_key(|m| m.start);
    found
}

/// Parse the first date expression in `text`.
pub fn parse_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    find_dates(text, now).first().map(|m| m.at)
}

fn collect<F>(out: &mut Vec<DateMatch>, re: &Regex, text: &str, resolve: F)
where
    F: Fn(&Captures<'_>) -> Option<DateTime<Utc>>,
{
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if let Some(at) = resolve(&caps) {
            out.push(DateMatch {
                start: whole.start(),
                end: whole.end(),
                at,
            });
        }
    }
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn absolute(caps: &Captures<'_>) -> Option<DateTime<Utc>> {
    let month = month_number(caps.get(1)?.as_str())?;
    let day: u32 = caps.get(2)?.as_str().parse().ok()?;
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let (mut hour, minute) = match (caps.get(4), caps.get(5)) {
        (Some(h), Some(m)) => (h.as_str().parse::<u32>().ok()?, m.as_str().parse::<u32>().ok()?),
        _ => (0, 0),
    };
    if let Some(meridiem) = caps.get(6) {
        let pm = meridiem.as_str().eq_ignore_ascii_case("pm");
        hour %= 12;
        if pm {
            hour += 12;
        }
    }

    let naive = date.and_hms_opt(hour, minute, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}

fn iso(caps: &Captures<'_>) -> Option<DateTime<Utc>> {
    let whole = caps.get(0)?.as_str();
    if let Ok(dt) = DateTime::parse_from_rfc3339(whole) {
        return Some(dt.with_timezone(&Utc));
    }

    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let day: u32 = caps.get(3)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let hour = caps.get(4).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
    let minute = caps.get(5).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
    let second = caps.get(6).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
    let naive: NaiveDateTime = date.and_hms_opt(hour, minute, second)?;
    Some(Utc.from_utc_datetime(&naive))
}

fn relative(caps: &Captures<'_>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let amount = caps.get(1)?.as_str();
    let amount: i64 = if amount.eq_ignore_ascii_case("a") || amount.eq_ignore_ascii_case("an") {
        1
    } else {
        amount.parse().ok()?
    };

    let unit = caps.get(2)?.as_str().to_ascii_lowercase();
    let unit = unit.trim_end_matches('s');
    let span = match unit {
        "second" | "sec" => Duration::try_seconds(amount)?,
        "minute" | "min" => Duration::try_minutes(amount)?,
        "hour" | "hr" => Duration::try_hours(amount)?,
        "day" => Duration::try_days(amount)?,
        "week" => Duration::try_weeks(amount)?,
        "month" => Duration::try_days(amount.checked_mul(30)?)?,
        "year" => Duration::try_days(amount.checked_mul(365)?)?,
        _ => return None,
    };
    now.checked_sub_signed(span)
}

fn keyword(caps: &Captures<'_>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match caps.get(1)?.as_str().to_ascii_lowercase().as_str() {
        "just now" | "today" => Some(now),
        "yesterday" => now.checked_sub_signed(Duration::try_days(1)?),
        _ => None,
    }
}
