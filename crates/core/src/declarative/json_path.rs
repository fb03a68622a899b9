//! Dot-path lookup into JSON values.

use serde_json::Value;

/// Walk `path` (e.g. `data.results.0.title`) from `root`.
///
/// An empty path or `.` is the root itself. Numeric segments index
/// arrays; on objects they are ordinary keys.
pub fn walk<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() || path == "." {
        return Some(root);
    }

    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(root, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_walk() {
        let doc = json!({
            "data": { "results": [ { "title": "A" }, { "title": "B" } ], "0": "zero" },
            "count": 2
        });
        assert_eq!(walk(&doc, ""), Some(&doc));
        assert_eq!(walk(&doc, "."), Some(&doc));
        assert_eq!(walk(&doc, "count"), Some(&json!(2)));
        assert_eq!(walk(&doc, "data.results.1.title"), Some(&json!("B")));
        assert_eq!(walk(&doc, "data.0"), Some(&json!("zero")));
        assert_eq!(walk(&doc, "data.results.7"), None);
        assert_eq!(walk(&doc, "count.value"), None);
        assert_eq!(walk(&doc, "missing"), None);
    }
}
