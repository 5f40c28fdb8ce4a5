use crate::error::{LoadError, Result};
use std::fmt;
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_API_PREFIX: &str = "/api/v1";
pub const INFRASTRUCTURE_ENDPOINT: &str = "infrastructure";

/// Where the static GeoJSON document lives.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalSource {
    File(PathBuf),
    Url(Url),
}

impl LocalSource {
    /// `http(s)://` strings become a static GET, anything else a file path.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if let Ok(url) = Url::parse(trimmed)
            && matches!(url.scheme(), "http" | "https")
        {
            return LocalSource::Url(url);
        }
        LocalSource::File(PathBuf::from(trimmed))
    }
}

impl fmt::Display for LocalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalSource::File(path) => write!(f, "{}", path.display()),
            LocalSource::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Explicitly configured data source. A remote source always carries the
/// local document used for its single fallback attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Remote {
        base_url: Url,
        api_prefix: String,
        fallback: LocalSource,
    },
    Local(LocalSource),
}

impl DataSource {
    pub fn remote(base_url: Url, fallback: LocalSource) -> Self {
        DataSource::Remote {
            base_url,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            fallback,
        }
    }

    pub fn local(source: LocalSource) -> Self {
        DataSource::Local(source)
    }

    pub fn describe(&self) -> String {
        match self {
            DataSource::Remote { base_url, fallback, .. } => {
                format!("API {} (fallback: {})", base_url, fallback)
            }
            DataSource::Local(local) => format!("local {}", local),
        }
    }
}

/// Build `{base_url}{api_prefix}/infrastructure`.
pub fn infrastructure_url(base_url: &Url, api_prefix: &str) -> Result<Url> {
    let base = base_url.as_str().trim_end_matches('/');
    let prefix = api_prefix.trim().trim_matches('/');

    let joined = if prefix.is_empty() {
        format!("{}/{}", base, INFRASTRUCTURE_ENDPOINT)
    } else {
        format!("{}/{}/{}", base, prefix, INFRASTRUCTURE_ENDPOINT)
    };

    Url::parse(&joined).map_err(|e| LoadError::InvalidUrl(format!("{}: {}", joined, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infrastructure_url_default_prefix() {
        let base = Url::parse("https://demogeofeedback-production.up.railway.app").unwrap();
        let url = infrastructure_url(&base, DEFAULT_API_PREFIX).unwrap();
        assert_eq!(
            url.as_str(),
            "https://demogeofeedback-production.up.railway.app/api/v1/infrastructure"
        );
    }

    #[test]
    fn test_infrastructure_url_trailing_slashes() {
        let base = Url::parse("http://127.0.0.1:5000/geo/").unwrap();
        let url = infrastructure_url(&base, "api/v2/").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/geo/api/v2/infrastructure");

        let url = infrastructure_url(&base, "").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/geo/infrastructure");
    }

    #[test]
    fn test_local_source_parse() {
        assert_eq!(
            LocalSource::parse("data/processed/infrastructure_with_risk.geojson"),
            LocalSource::File(PathBuf::from("data/processed/infrastructure_with_risk.geojson"))
        );
        assert!(matches!(
            LocalSource::parse("http://localhost:8000/data.geojson"),
            LocalSource::Url(_)
        ));
        // Windows drive letters parse as URL schemes but are paths
        assert!(matches!(LocalSource::parse("C:/data/x.geojson"), LocalSource::File(_)));
    }

    #[test]
    fn test_describe_names_primary_and_fallback() {
        let remote = DataSource::remote(
            Url::parse("https://api.example.cl").unwrap(),
            LocalSource::parse("data/infra.geojson"),
        );
        let text = remote.describe();
        assert!(text.starts_with("API https://api.example.cl"));
        assert!(text.contains("fallback: data/infra.geojson"));

        let local = DataSource::local(LocalSource::parse("data/infra.geojson"));
        assert_eq!(local.describe(), "local data/infra.geojson");
    }
}
