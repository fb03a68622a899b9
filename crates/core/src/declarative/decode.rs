//! Tolerant field decoding for declarative API responses.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::Url;
use serde_json::Value;

use super::config::ResponseShape;
use super::json_path::walk;
use crate::connector::{ConnectorError, MangaResult};
use crate::matching::{split_alias_list, AliasCollector};

/// Epoch values above this are taken as milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e12;

/// Map one JSON item onto a `MangaResult`.
///
/// Identifier, title and URL are required. Chapter, update time, cover and
/// aliases are optional and left empty when absent or unreadable.
pub fn decode_item(
    item: &Value,
    shape: &ResponseShape,
    source_key: &str,
    base: &Url,
) -> Result<MangaResult, ConnectorError> {
    let id = walk(item, &shape.id_field)
        .and_then(identifier)
        .ok_or_else(|| missing(&shape.id_field))?;
    let title = walk(item, &shape.title_field)
        .and_then(non_empty_string)
        .ok_or_else(|| missing(&shape.title_field))?;
    let url = walk(item, &shape.url_field)
        .and_then(non_empty_string)
        .ok_or_else(|| missing(&shape.url_field))?;
    let url = base.join(&url).map(|u| u.to_string()).unwrap_or(url);

    let mut result = MangaResult::new(source_key, id, title, url);

    result.latest_chapter = walk(item, &shape.latest_chapter_field).and_then(chapter_number);
    result.last_updated_at = shape
        .last_updated_field
        .as_deref()
        .and_then(|f| walk(item, f))
        .and_then(timestamp);

    if let Some(cover) = shape
        .cover_image_field
        .as_deref()
        .and_then(|f| walk(item, f))
        .and_then(non_empty_string)
    {
        result.cover_image_url = base.join(&cover).map(|u| u.to_string()).unwrap_or(cover);
    }

    if let Some(related) = shape
        .related_titles_field
        .as_deref()
        .and_then(|f| walk(item, f))
    {
        let mut aliases = AliasCollector::new(&result.title);
        aliases.extend(string_list(related));
        result.related_titles = aliases.finish();
    }

    Ok(result)
}

fn missing(field: &str) -> ConnectorError {
    ConnectorError::Decode(format!("missing or empty required field {:?}", field))
}

fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty_string(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Numeric or numeric-string chapter; negatives and non-finite values are
/// treated as absent.
pub fn chapter_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n.is_finite() && n >= 0.0).then_some(n)
}

/// RFC 3339 string, or Unix epoch in seconds or milliseconds (number or
/// numeric string).
pub fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => from_epoch(n.as_f64()?),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            from_epoch(s.parse::<f64>().ok()?)
        }
        _ => None,
    }
}

fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let millis = if value > EPOCH_MILLIS_THRESHOLD {
        value
    } else {
        value * 1000.0
    };
    Utc.timestamp_millis_opt(millis as i64).single()
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(map) => map
                    .get("title")
                    .or_else(|| map.get("name"))
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => split_alias_list(s),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shape() -> ResponseShape {
        ResponseShape {
            last_updated_field: Some("updatedAt".to_string()),
            cover_image_field: Some("cover".to_string()),
            related_titles_field: Some("aliases".to_string()),
            ..ResponseShape::default()
        }
    }

    fn base() -> Url {
        Url::parse("https://api.example.test/").unwrap()
    }

    #[test]
    fn test_decode_full_item() {
        let item = json!({
            "id": 42,
            "title": "Nano Machine",
            "url": "/comic/nano-machine",
            "latestChapter": "198.5",
            "updatedAt": "2024-05-01T10:00:00+02:00",
            "cover": "https://cdn.example.test/nano.jpg",
            "aliases": ["Nanomachine", "nano machine", {"title": "NM"}, "나노 마신", "Нано машина"]
        });
        let result = decode_item(&item, &shape(), "api", &base()).unwrap();
        assert_eq!(result.source_item_id, "42");
        assert_eq!(result.url, "https://api.example.test/comic/nano-machine");
        assert_eq!(result.latest_chapter, Some(198.5));
        assert_eq!(
            result.last_updated_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap())
        );
        assert_eq!(result.cover_image_url, "https://cdn.example.test/nano.jpg");
        assert_eq!(result.related_titles, vec!["Nanomachine", "NM"]);
    }

    #[test]
    fn test_required_fields() {
        let err = decode_item(&json!({"id": "x", "url": "/x"}), &shape(), "api", &base())
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Decode(_)));

        let err = decode_item(
            &json!({"id": "", "title": "T", "url": "/x"}),
            &shape(),
            "api",
            &base(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("\"id\""));
    }

    #[test]
    fn test_optional_fields_tolerate_bad_values() {
        let item = json!({
            "id": "abc",
            "title": "T",
            "url": "https://other.test/t",
            "latestChapter": "soon",
            "updatedAt": {"nested": true}
        });
        let result = decode_item(&item, &shape(), "api", &base()).unwrap();
        assert_eq!(result.latest_chapter, None);
        assert_eq!(result.last_updated_at, None);
        assert_eq!(result.url, "https://other.test/t");
    }

    #[test]
    fn test_timestamp_encodings() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(timestamp(&json!(1704067200)), Some(expected));
        assert_eq!(timestamp(&json!(1704067200000i64)), Some(expected));
        assert_eq!(timestamp(&json!("1704067200")), Some(expected));
        assert_eq!(timestamp(&json!("2024-01-01T00:00:00Z")), Some(expected));
        assert_eq!(timestamp(&json!("yesterday-ish")), None);
    }

    #[test]
    fn test_chapter_number_encodings() {
        assert_eq!(chapter_number(&json!(12)), Some(12.0));
        assert_eq!(chapter_number(&json!(67.5)), Some(67.5));
        assert_eq!(chapter_number(&json!(" 100 ")), Some(100.0));
        assert_eq!(chapter_number(&json!(-1)), None);
        assert_eq!(chapter_number(&json!(null)), None);
    }
}
