//! Item URL validation ahead of any network call.

use regex_lite::Regex;
use reqwest::Url;

use crate::connector::ConnectorError;

/// Hosts a connector serves. A host matches exactly or as a subdomain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAllowList {
    hosts: Vec<String>,
}

impl HostAllowList {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().trim().trim_start_matches("www.").to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn allows(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.hosts.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Parse `raw` and check its host against `allowed`.
pub fn parse_site_url(
    connector: &str,
    raw: &str,
    allowed: &HostAllowList,
) -> Result<Url, ConnectorError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConnectorError::InvalidInput("empty URL".to_string()));
    }

    let url = Url::parse(raw)
        .map_err(|e| ConnectorError::InvalidInput(format!("invalid URL {:?}: {}", raw, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConnectorError::InvalidInput(format!(
            "unsupported URL scheme {:?}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| ConnectorError::InvalidInput(format!("URL has no host: {}", raw)))?;
    if !allowed.allows(host) {
        return Err(ConnectorError::HostMismatch {
            host: host.to_string(),
            connector: connector.to_string(),
        });
    }

    Ok(url)
}

/// Validate an item URL and pull the identifier out of its path.
///
/// `path_pattern` must match the whole path with the identifier in its
/// first capture group.
pub fn parse_item_url(
    connector: &str,
    raw: &str,
    allowed: &HostAllowList,
    path_pattern: &Regex,
) -> Result<(Url, String), ConnectorError> {
    let url = parse_site_url(connector, raw, allowed)?;
    let id = path_pattern
        .captures(url.path())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ConnectorError::FormatMismatch(raw.trim().to_string()))?;
    Ok((url, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> Regex {
        Regex::new(r"^/manga/([a-z0-9-]+)/?$").unwrap()
    }

    #[test]
    fn test_allow_list_exact_and_subdomain() {
        let allowed = HostAllowList::new(["www.mgeko.cc"]);
        assert!(allowed.allows("mgeko.cc"));
        assert!(allowed.allows("www.mgeko.cc"));
        assert!(allowed.allows("m.mgeko.cc"));
        assert!(!allowed.allows("notmgeko.cc"));
        assert!(!allowed.allows("mgeko.cc.evil.com"));
    }

    #[test]
    fn test_parse_item_url() {
        let allowed = HostAllowList::new(["mgeko.cc"]);
        let (url, id) = parse_item_url(
            "mgeko",
            " https://www.mgeko.cc/manga/solo-leveling/ ",
            &allowed,
            &pattern(),
        )
        .unwrap();
        assert_eq!(id, "solo-leveling");
        assert_eq!(url.host_str(), Some("www.mgeko.cc"));
    }

    #[test]
    fn test_rejections() {
        let allowed = HostAllowList::new(["mgeko.cc"]);
        let p = pattern();

        let err = parse_item_url("mgeko", "", &allowed, &p).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidInput(_)));

        let err = parse_item_url("mgeko", "not a url", &allowed, &p).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidInput(_)));

        let err = parse_item_url("mgeko", "ftp://mgeko.cc/manga/x/", &allowed, &p).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidInput(_)));

        let err =
            parse_item_url("mgeko", "https://example.com/manga/x/", &allowed, &p).unwrap_err();
        assert!(matches!(err, ConnectorError::HostMismatch { .. }));

        let err =
            parse_item_url("mgeko", "https://www.mgeko.cc/genres/action/", &allowed, &p).unwrap_err();
        assert!(matches!(err, ConnectorError::FormatMismatch(_)));
    }
}
