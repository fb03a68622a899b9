use std::collections::HashSet;

use super::{types::Config, ConfigError};
use crate::native::{AsuraConnector, MadaraSite, MgekoConnector, WebtoonsConnector};

/// Keys of the connectors compiled into the crate.
pub fn builtin_keys() -> Vec<String> {
    vec![
        MgekoConnector::KEY.to_string(),
        AsuraConnector::KEY.to_string(),
        MadaraSite::manhuaus().key,
        WebtoonsConnector::KEY.to_string(),
    ]
}

/// Validate configuration
/// Currently validates:
/// - HTTP timeout is not 0
/// - Retry backoff schedule is non-empty
/// - Catalog TTL is not 0
/// - Madara sites and declarative connectors are well-formed
/// - No connector key is used twice
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.http.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "http.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.retry.backoff_ms.is_empty() {
        return Err(ConfigError::ValidationError(
            "retry.backoff_ms cannot be empty".to_string(),
        ));
    }

    if config.catalog.ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "catalog.ttl_secs cannot be 0".to_string(),
        ));
    }

    let mut keys: HashSet<String> = builtin_keys().into_iter().collect();

    for site in &config.connectors.madara {
        if site.key.trim().is_empty() || site.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "connectors.madara entries need a key and a name".to_string(),
            ));
        }
        match reqwest::Url::parse(&site.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "connectors.madara[{}].base_url is not an http(s) URL: {:?}",
                    site.key, site.base_url
                )))
            }
        }
        if !keys.insert(site.key.clone()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate connector key: {}",
                site.key
            )));
        }
    }

    for declarative in &config.declarative {
        declarative.validate()?;
        if !keys.insert(declarative.key.clone()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate connector key: {}",
                declarative.key
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_timeout_zero_fails() {
        let mut config = Config::default();
        config.http.timeout_secs = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_empty_backoff_fails() {
        let mut config = Config::default();
        config.retry.backoff_ms.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_ttl_zero_fails() {
        let mut config = Config::default();
        config.catalog.ttl_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_madara_key_clashes_with_builtin() {
        let mut config = Config::default();
        config.connectors.madara.push(MadaraSite {
            key: "mgeko".to_string(),
            name: "Clash".to_string(),
            base_url: "https://clash.example/".to_string(),
        });
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate connector key: mgeko"));
    }

    #[test]
    fn test_validate_madara_bad_url() {
        let mut config = Config::default();
        config.connectors.madara.push(MadaraSite {
            key: "toonily".to_string(),
            name: "Toonily".to_string(),
            base_url: "ftp://toonily.com/".to_string(),
        });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_invalid_declarative() {
        let config = load_config_from_str(
            r#"
[[declarative]]
key = "api"
name = "API"
baseUrl = "not a url"

[declarative.search]
path = "/search"

[declarative.resolve]
path = "/resolve"
"#,
        )
        .unwrap();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_builtin_keys() {
        assert_eq!(
            builtin_keys(),
            vec!["mgeko", "asura", "manhuaus", "webtoons"]
        );
    }
}
