use crate::error::{LoadError, Result};
use crate::feature::{Dataset, Facility, InfrastructureResponse};
use geojson::GeoJson;
use crate::source::{DataSource, LocalSource, infrastructure_url};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Which path produced the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Remote,
    Local,
    LocalFallback,
}

impl DataOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataOrigin::Remote => "remote API",
            DataOrigin::Local => "local file",
            DataOrigin::LocalFallback => "local file (API fallback)",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub dataset: Dataset,
    pub origin: DataOrigin,
}

pub struct DataLoader {
    client: Client,
    source: DataSource,
    progress_callback: Option<ProgressCallback>,
}

impl DataLoader {
    /// Loader without a request timeout: a fetch waits until the transport
    /// resolves or rejects it.
    pub fn new(source: DataSource) -> Result<Self> {
        Self::with_timeout(source, None)
    }

    pub fn with_timeout(source: DataSource, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("GeoFeedback/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5));

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            source,
            progress_callback: None,
        })
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    fn report(&self, message: String) {
        if let Some(ref callback) = self.progress_callback {
            callback(message);
        }
    }

    /// Resolve the configured source into a dataset.
    ///
    /// A failed remote load is retried exactly once against the local
    /// fallback; a failed local-primary load is returned as is.
    pub async fn load(&self) -> Result<LoadOutcome> {
        match &self.source {
            DataSource::Remote {
                base_url,
                api_prefix,
                fallback,
            } => {
                let primary = match infrastructure_url(base_url, api_prefix) {
                    Ok(url) => {
                        self.report(format!("Loading facilities from {}", url));
                        self.fetch_remote(&url).await
                    }
                    Err(e) => Err(e),
                };

                match primary {
                    Ok(dataset) => {
                        info!("{} facilities loaded from API", dataset.len());
                        Ok(LoadOutcome {
                            dataset,
                            origin: DataOrigin::Remote,
                        })
                    }
                    Err(primary) => {
                        warn!("API load failed ({}), trying local file {}", primary, fallback);
                        self.report(format!("API unavailable, falling back to {}", fallback));

                        match self.fetch_local(fallback).await {
                            Ok(dataset) => {
                                info!("{} facilities loaded from fallback file", dataset.len());
                                Ok(LoadOutcome {
                                    dataset,
                                    origin: DataOrigin::LocalFallback,
                                })
                            }
                            Err(fallback) => Err(LoadError::FallbackFailed {
                                primary: Box::new(primary),
                                fallback: Box::new(fallback),
                            }),
                        }
                    }
                }
            }
            DataSource::Local(local) => {
                self.report(format!("Loading facilities from {}", local));
                let dataset = self.fetch_local(local).await?;
                info!("{} facilities loaded from local file", dataset.len());
                Ok(LoadOutcome {
                    dataset,
                    origin: DataOrigin::Local,
                })
            }
        }
    }

    /// GET the API endpoint and normalize its `facilities` array.
    pub async fn fetch_remote(&self, url: &Url) -> Result<Dataset> {
        let body = self.get_text(url).await?;
        let response: InfrastructureResponse = serde_json::from_str(&body)?;
        Ok(Dataset::from(response))
    }

    /// Read the static GeoJSON document, from disk or over HTTP.
    pub async fn fetch_local(&self, local: &LocalSource) -> Result<Dataset> {
        let body = match local {
            LocalSource::File(path) => {
                debug!("Reading {}", path.display());
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| LoadError::Io {
                        path: path.clone(),
                        source,
                    })?
            }
            LocalSource::Url(url) => self.get_text(url).await?,
        };

        parse_feature_collection(&body)
    }

    async fn get_text(&self, url: &Url) -> Result<String> {
        debug!("Fetching {}", url);
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Parse a GeoJSON `FeatureCollection` body into a dataset.
pub fn parse_feature_collection(body: &str) -> Result<Dataset> {
    let collection = match body.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection,
        GeoJson::Feature(_) => {
            return Err(LoadError::Format(
                "expected a FeatureCollection, found Feature".to_string(),
            ));
        }
        GeoJson::Geometry(_) => {
            return Err(LoadError::Format(
                "expected a FeatureCollection, found Geometry".to_string(),
            ));
        }
    };

    let facilities = collection
        .features
        .into_iter()
        .map(Facility::try_from)
        .collect::<Result<Vec<_>>>()?;
    Ok(Dataset::new(facilities))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Category, RiskLevel};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    const API_BODY: &str = r##"{
        "facilities": [
            {
                "name": "Escuela Papudo",
                "category": "Educación",
                "geometry": {"type": "Point", "coordinates": [-71.4469, -32.5127]},
                "risk_level": 3,
                "risk_name": "Alto",
                "risk_color": "#FF0000",
                "distance_to_risk": 0.0
            },
            {
                "name": "Minimarket",
                "geometry": {"type": "Point", "coordinates": [-71.45, -32.51]},
                "address": null
            }
        ]
    }"##;

    const GEOJSON_BODY: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-71.4480, -32.5060]},
                "properties": {"name": "Posta Rural", "category": "Salud", "risk_level": 1}
            }
        ]
    }"#;

    fn geojson_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", GEOJSON_BODY).unwrap();
        file
    }

    fn remote_source(server: &MockServer, fallback: LocalSource) -> DataSource {
        DataSource::remote(Url::parse(&server.uri()).unwrap(), fallback)
    }

    #[tokio::test]
    async fn test_remote_load_maps_records() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/infrastructure"))
            .respond_with(ResponseTemplate::new(200).set_body_string(API_BODY))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fallback = LocalSource::File(PathBuf::from("/nonexistent/fallback.geojson"));
        let loader = DataLoader::new(remote_source(&mock_server, fallback)).unwrap();
        let outcome = loader.load().await.unwrap();

        assert_eq!(outcome.origin, DataOrigin::Remote);
        assert_eq!(outcome.dataset.len(), 2);

        let school = outcome.dataset.get(0).unwrap();
        assert_eq!(school.category, Category::Educacion);
        assert_eq!(school.risk_level, RiskLevel::High);
        assert_eq!(school.risk_name.as_deref(), Some("Alto"));
        assert_eq!(school.address, "");

        let market = outcome.dataset.get(1).unwrap();
        assert_eq!(market.category, Category::Comercio);
        assert_eq!(market.risk_level, RiskLevel::NoData);
    }

    #[tokio::test]
    async fn test_remote_500_falls_back_to_local_file() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/infrastructure"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let file = geojson_file();
        let messages: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let messages_clone = messages.clone();

        let loader = DataLoader::new(remote_source(
            &mock_server,
            LocalSource::File(file.path().to_path_buf()),
        ))
        .unwrap()
        .with_progress_callback(Arc::new(move |msg| {
            messages_clone.lock().unwrap().push(msg);
        }));

        let outcome = loader.load().await.unwrap();

        assert_eq!(outcome.origin, DataOrigin::LocalFallback);
        assert_eq!(outcome.dataset.len(), 1);
        assert_eq!(outcome.dataset.get(0).unwrap().name, "Posta Rural");

        let messages = messages.lock().unwrap();
        assert!(messages.iter().any(|m| m.contains("falling back")));
    }

    #[tokio::test]
    async fn test_remote_body_without_facilities_falls_back() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/infrastructure"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"features":[{"type":"school","name":"Escuela Papudo","lat":-32.5127,"lon":-71.4469}]}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let file = geojson_file();
        let loader = DataLoader::new(remote_source(
            &mock_server,
            LocalSource::File(file.path().to_path_buf()),
        ))
        .unwrap();
        let outcome = loader.load().await.unwrap();

        assert_eq!(outcome.origin, DataOrigin::LocalFallback);
        assert_eq!(outcome.dataset.len(), 1);
        assert_eq!(outcome.dataset.get(0).unwrap().name, "Posta Rural");
    }

    #[tokio::test]
    async fn test_remote_and_fallback_failure_is_fatal() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/infrastructure"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let fallback = LocalSource::File(PathBuf::from("/nonexistent/fallback.geojson"));
        let loader = DataLoader::new(remote_source(&mock_server, fallback)).unwrap();
        let err = loader.load().await.unwrap_err();

        match err {
            LoadError::FallbackFailed { primary, fallback } => {
                assert!(matches!(*primary, LoadError::HttpStatus { status: 503, .. }));
                assert!(matches!(*fallback, LoadError::Io { .. }));
            }
            other => panic!("expected FallbackFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_local_primary_failure_does_not_touch_network() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(API_BODY))
            .expect(0)
            .mount(&mock_server)
            .await;

        let loader = DataLoader::new(DataSource::local(LocalSource::File(PathBuf::from(
            "/nonexistent/infrastructure_with_risk.geojson",
        ))))
        .unwrap();

        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[tokio::test]
    async fn test_local_url_source() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/processed/infrastructure_with_risk.geojson"))
            .respond_with(ResponseTemplate::new(200).set_body_string(GEOJSON_BODY))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.geojson"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!(
            "{}/data/processed/infrastructure_with_risk.geojson",
            mock_server.uri()
        ))
        .unwrap();
        let loader = DataLoader::new(DataSource::local(LocalSource::Url(url))).unwrap();
        let outcome = loader.load().await.unwrap();
        assert_eq!(outcome.origin, DataOrigin::Local);
        assert_eq!(outcome.dataset.len(), 1);

        let missing = Url::parse(&format!("{}/missing.geojson", mock_server.uri())).unwrap();
        let loader = DataLoader::new(DataSource::local(LocalSource::Url(missing))).unwrap();
        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, LoadError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_malformed_api_body_is_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/infrastructure"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&mock_server)
            .await;

        let loader = DataLoader::new(DataSource::local(LocalSource::File(PathBuf::new()))).unwrap();
        let url = infrastructure_url(&Url::parse(&mock_server.uri()).unwrap(), "/api/v1").unwrap();
        let err = loader.fetch_remote(&url).await.unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn test_parse_feature_collection_rejects_other_documents() {
        let err = parse_feature_collection(r#"{"type":"Point","coordinates":[-71.45,-32.51]}"#)
            .unwrap_err();
        assert!(matches!(err, LoadError::Format(_)));

        let err = parse_feature_collection("{not json").unwrap_err();
        assert!(matches!(err, LoadError::GeoJson(_)));

        let dataset = parse_feature_collection(GEOJSON_BODY).unwrap();
        assert_eq!(dataset.get(0).unwrap().risk_level, RiskLevel::Low);
    }
}
