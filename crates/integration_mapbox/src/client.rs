//! Mapbox API client
//!
//! [`MapboxClient`] resolves credentials and transport, encodes requests for
//! the geocoding and distance-matrix endpoints and decodes their responses.
//! Every operation performs exactly one round trip through the configured
//! [`HttpTransport`]; nothing is retried or cached.

use std::env;
use std::fmt;
use std::sync::{Arc, LazyLock, OnceLock};

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::{API_KEY_ENV, MapboxConfig};
use crate::error::MapboxError;
use crate::models::{DurationRequest, DurationResponse, GeocodeResponse, ReverseGeocodeRequest};
use crate::query::to_query_params;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Default distances API version
pub const DEFAULT_API_VERSION: &str = "v1";

/// Process-wide fallback token, read from `MAPBOX_API_KEY` on first use
/// and kept for the lifetime of the process.
static DEFAULT_API_KEY: LazyLock<Option<String>> =
    LazyLock::new(|| env::var(API_KEY_ENV).ok().filter(|key| !key.is_empty()));

/// Forward and reverse geocoding
#[async_trait]
pub trait GeocodingClient: Send + Sync {
    /// Look up a place by name, e.g. "Los Angeles"
    async fn lookup_place(&self, query: &str) -> Result<GeocodeResponse, MapboxError>;

    /// Look up the places at a latitude/longitude
    async fn lookup_lat_lon(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<GeocodeResponse, MapboxError>;

    /// Run a fully specified geocoding request
    async fn reverse_geocode(
        &self,
        request: &ReverseGeocodeRequest,
    ) -> Result<GeocodeResponse, MapboxError>;
}

/// Travel-duration matrices
#[async_trait]
pub trait DurationClient: Send + Sync {
    /// Compute the pairwise driving durations between `request.coordinates`
    async fn request_duration(
        &self,
        request: &DurationRequest,
    ) -> Result<DurationResponse, MapboxError>;
}

/// Mutable settings, guarded by the client's reader/writer lock
#[derive(Default)]
struct Settings {
    api_key: Option<SecretString>,
    api_version: Option<String>,
    transport: Option<Arc<dyn HttpTransport>>,
}

/// Settings resolved for a single call, taken under one read guard
struct CallContext {
    api_key: SecretString,
    api_version: String,
    transport: Option<Arc<dyn HttpTransport>>,
}

/// Mapbox client
///
/// Safe to share between tasks. Reads of the API key, version and transport
/// take a shared lock; setters take it exclusively. Locks are never held
/// across a network call.
pub struct MapboxClient {
    base_url: Url,
    timeout_secs: u64,
    /// Built by `new`, or on the first fallback for injected-transport clients
    default_transport: OnceLock<Arc<dyn HttpTransport>>,
    settings: RwLock<Settings>,
}

impl fmt::Debug for MapboxClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = self.settings.read();
        f.debug_struct("MapboxClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &settings.api_version)
            .field("has_api_key", &settings.api_key.is_some())
            .field("custom_transport", &settings.transport.is_some())
            .finish_non_exhaustive()
    }
}

impl MapboxClient {
    /// Create a client using the default reqwest transport
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(config: MapboxConfig) -> Result<Self, MapboxError> {
        Self::build(config, None)
    }

    /// Create a client that sends every request through `transport`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_transport(
        config: MapboxConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, MapboxError> {
        Self::build(config, Some(transport))
    }

    fn build(
        config: MapboxConfig,
        transport: Option<Arc<dyn HttpTransport>>,
    ) -> Result<Self, MapboxError> {
        config.validate().map_err(MapboxError::Configuration)?;
        let base_url = config
            .parsed_base_url()
            .map_err(MapboxError::Configuration)?;

        let default_transport = if transport.is_some() {
            OnceLock::new()
        } else {
            let built: Arc<dyn HttpTransport> =
                Arc::new(ReqwestTransport::new(config.timeout_secs)?);
            OnceLock::from(built)
        };

        let settings = Settings {
            api_key: config
                .api_key
                .filter(|key| !key.expose_secret().is_empty()),
            api_version: Some(config.api_version),
            transport,
        };

        Ok(Self {
            base_url,
            timeout_secs: config.timeout_secs,
            default_transport,
            settings: RwLock::new(settings),
        })
    }

    /// Set the access token; an empty key clears it
    pub fn set_api_key(&self, key: impl Into<String>) {
        let key = key.into();
        self.settings.write().api_key = (!key.is_empty()).then(|| SecretString::from(key));
    }

    /// Drop the per-client token and fall back to `MAPBOX_API_KEY`
    pub fn clear_api_key(&self) {
        self.settings.write().api_key = None;
    }

    /// Effective access token
    ///
    /// The per-client key wins; otherwise the process-wide `MAPBOX_API_KEY`
    /// value captured on first use; otherwise empty.
    pub fn api_key(&self) -> SecretString {
        resolve_api_key(&self.settings.read())
    }

    /// Whether any access token (per-client or process-wide) is available
    pub fn has_api_key(&self) -> bool {
        self.settings.read().api_key.is_some() || DEFAULT_API_KEY.is_some()
    }

    /// Set the distances API version; an empty version restores the default
    pub fn set_api_version(&self, version: impl Into<String>) {
        let version = version.into();
        self.settings.write().api_version = (!version.trim().is_empty()).then_some(version);
    }

    /// Effective distances API version
    pub fn api_version(&self) -> String {
        resolve_api_version(&self.settings.read())
    }

    /// Route subsequent requests through `transport`
    pub fn set_transport(&self, transport: Arc<dyn HttpTransport>) {
        self.settings.write().transport = Some(transport);
    }

    /// Go back to the default reqwest transport
    pub fn clear_transport(&self) {
        self.settings.write().transport = None;
    }

    /// Effective transport
    ///
    /// # Errors
    ///
    /// Returns an error if the default transport has to be built and cannot be.
    pub fn transport(&self) -> Result<Arc<dyn HttpTransport>, MapboxError> {
        let injected = self.settings.read().transport.clone();
        self.resolve_transport(injected)
    }

    fn resolve_transport(
        &self,
        injected: Option<Arc<dyn HttpTransport>>,
    ) -> Result<Arc<dyn HttpTransport>, MapboxError> {
        if let Some(transport) = injected {
            return Ok(transport);
        }
        if let Some(transport) = self.default_transport.get() {
            return Ok(Arc::clone(transport));
        }

        debug!(timeout_secs = self.timeout_secs, "Building default transport");
        let built: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(self.timeout_secs)?);
        Ok(Arc::clone(self.default_transport.get_or_init(|| built)))
    }

    /// Key, version and transport for one call, read under a single guard
    fn call_context(&self) -> CallContext {
        let settings = self.settings.read();
        CallContext {
            api_key: resolve_api_key(&settings),
            api_version: resolve_api_version(&settings),
            transport: settings.transport.clone(),
        }
    }

    /// Build `{base_url}/{segments...}?{params}&access_token={key}`
    fn endpoint(
        &self,
        api_key: &SecretString,
        segments: &[&str],
        params: &[(String, String)],
    ) -> Result<Url, MapboxError> {
        if api_key.expose_secret().is_empty() {
            warn!("No Mapbox access token configured, sending an empty one");
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                MapboxError::Configuration(format!("base_url cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);

        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("access_token", api_key.expose_secret());
        }

        Ok(url)
    }

    /// Perform the round trip and reject non-2xx statuses
    async fn execute(
        &self,
        transport: Option<Arc<dyn HttpTransport>>,
        request: HttpRequest,
    ) -> Result<HttpResponse, MapboxError> {
        let transport = self.resolve_transport(transport)?;
        debug!(method = %request.method, path = %request.path(), "Sending request");

        let response = transport.send(request).await?;
        if !response.is_success() {
            warn!(status = %response.status, "Mapbox request failed");
            return Err(MapboxError::Status {
                status: response.status,
            });
        }

        Ok(response)
    }
}

fn resolve_api_key(settings: &Settings) -> SecretString {
    settings.api_key.as_ref().map_or_else(
        || SecretString::from(DEFAULT_API_KEY.clone().unwrap_or_default()),
        |key| SecretString::from(key.expose_secret().to_owned()),
    )
}

fn resolve_api_version(settings: &Settings) -> String {
    settings
        .api_version
        .clone()
        .unwrap_or_else(|| DEFAULT_API_VERSION.to_string())
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, MapboxError> {
    serde_json::from_slice(body).map_err(|e| MapboxError::Decode(e.to_string()))
}

#[async_trait]
impl GeocodingClient for MapboxClient {
    #[instrument(skip(self))]
    async fn lookup_place(&self, query: &str) -> Result<GeocodeResponse, MapboxError> {
        self.reverse_geocode(&ReverseGeocodeRequest::new(query))
            .await
    }

    #[instrument(skip(self))]
    async fn lookup_lat_lon(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<GeocodeResponse, MapboxError> {
        // Mapbox expects longitude first.
        let query = format!("{longitude:.6},{latitude:.6}");
        self.reverse_geocode(&ReverseGeocodeRequest::new(query))
            .await
    }

    #[instrument(skip(self, request), fields(query = %request.query, mode = %request.mode))]
    async fn reverse_geocode(
        &self,
        request: &ReverseGeocodeRequest,
    ) -> Result<GeocodeResponse, MapboxError> {
        if request.query.trim().is_empty() {
            return Err(MapboxError::Encoding(
                "geocoding query must not be empty".to_string(),
            ));
        }

        let params = to_query_params(&request.request)?;
        let resource = format!("{}.json", request.query);
        let ctx = self.call_context();
        let url = self.endpoint(
            &ctx.api_key,
            &["geocoding", "v5", request.mode.as_str(), &resource],
            &params,
        )?;

        let response = self.execute(ctx.transport, HttpRequest::get(url)).await?;
        let result: GeocodeResponse = decode(&response.body)?;

        debug!(count = result.features.len(), "Geocoding features found");
        Ok(result)
    }
}

#[async_trait]
impl DurationClient for MapboxClient {
    #[instrument(skip(self, request), fields(locations = request.coordinates.len()))]
    async fn request_duration(
        &self,
        request: &DurationRequest,
    ) -> Result<DurationResponse, MapboxError> {
        let body = serde_json::to_vec(request).map_err(|e| MapboxError::Encoding(e.to_string()))?;

        let ctx = self.call_context();
        let url = self.endpoint(
            &ctx.api_key,
            &["distances", &ctx.api_version, "mapbox", "driving"],
            &[],
        )?;

        let mut http_request = HttpRequest::post(url, body);
        http_request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self.execute(ctx.transport, http_request).await?;
        let result: DurationResponse = decode(&response.body)?;

        debug!(rows = result.durations.len(), "Duration matrix received");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::{Method, StatusCode};

    use super::*;
    use crate::coordinates::{CoordinatePair, NO_PATH_DURATION};
    use crate::models::{GeocodeMode, GeocodeRequest};
    use crate::transport::MockHttpTransport;

    const EMPTY_COLLECTION: &[u8] = br#"{"type":"FeatureCollection","query":[],"features":[]}"#;

    fn client_with(mock: MockHttpTransport) -> MapboxClient {
        MapboxClient::with_transport(
            MapboxConfig::for_testing("https://api.mapbox.test"),
            Arc::new(mock),
        )
        .unwrap()
    }

    fn query_pairs(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn ok(body: &[u8]) -> Result<HttpResponse, MapboxError> {
        Ok(HttpResponse::new(StatusCode::OK, body.to_vec()))
    }

    #[tokio::test]
    async fn test_lookup_place_sends_one_get() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .withf(|req| {
                req.method == Method::GET
                    && req.body.is_none()
                    && req.url.path() == "/geocoding/v5/mapbox.places/Los%20Angeles.json"
                    && query_pairs(&req.url)
                        == vec![("access_token".to_string(), "test-token".to_string())]
            })
            .returning(|_| ok(EMPTY_COLLECTION));

        let response = client_with(mock).lookup_place("Los Angeles").await.unwrap();
        assert_eq!(response.kind, "FeatureCollection");
        assert!(response.features.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_lat_lon_puts_longitude_first() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .withf(|req| req.url.path() == "/geocoding/v5/mapbox.places/-77.036600,38.897100.json")
            .returning(|_| ok(EMPTY_COLLECTION));

        let client = client_with(mock);
        assert!(client.lookup_lat_lon(38.8971, -77.0366).await.is_ok());
    }

    #[tokio::test]
    async fn test_reverse_geocode_encodes_filters_and_mode() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .withf(|req| {
                req.url.path() == "/geocoding/v5/mapbox.places-permanent/Edmonton.json"
                    && query_pairs(&req.url)
                        == vec![
                            ("country".to_string(), "ca".to_string()),
                            ("limit".to_string(), "2".to_string()),
                            ("access_token".to_string(), "test-token".to_string()),
                        ]
            })
            .returning(|_| ok(EMPTY_COLLECTION));

        let request = ReverseGeocodeRequest::new("Edmonton")
            .with_mode(GeocodeMode::PermanentPlaces)
            .with_filters(GeocodeRequest::default().with_country("ca").with_limit(2));

        assert!(client_with(mock).reverse_geocode(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_query_fails_before_any_io() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(0);

        let err = client_with(mock).lookup_place("  ").await.unwrap_err();
        assert!(matches!(err, MapboxError::Encoding(_)));
    }

    #[tokio::test]
    async fn test_non_success_status_is_not_decoded() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(StatusCode::NOT_FOUND, b"<html>".to_vec())));

        let err = client_with(mock).lookup_place("Atlantis").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("404 Not Found"));
    }

    #[tokio::test]
    async fn test_invalid_json_is_a_decode_error() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(1).returning(|_| ok(b"{not json"));

        let err = client_with(mock).lookup_place("Edmonton").await.unwrap_err();
        assert!(matches!(err, MapboxError::Decode(_)));
    }

    #[tokio::test]
    async fn test_transport_errors_propagate() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .returning(|_| Err(MapboxError::Transport("connection refused".to_string())));

        let request = DurationRequest::new([CoordinatePair::lon_lat(1.0, 2.0)]);
        let err = client_with(mock).request_duration(&request).await.unwrap_err();
        assert!(matches!(err, MapboxError::Transport(_)));
    }

    #[tokio::test]
    async fn test_request_duration_posts_coordinates() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .withf(|req| {
                req.method == Method::POST
                    && req.url.path() == "/distances/v1/mapbox/driving"
                    && query_pairs(&req.url)
                        == vec![("access_token".to_string(), "test-token".to_string())]
                    && req.headers.get(CONTENT_TYPE).map(HeaderValue::as_bytes)
                        == Some(&b"application/json"[..])
                    && req.body.as_deref()
                        == Some(&br#"{"coordinates":[[13.41894,52.50055],[14.10293,52.50055]]}"#[..])
            })
            .returning(|_| ok(br#"{"code":"Ok","durations":[[0,null],[2903,0]]}"#));

        let request = DurationRequest::new([
            CoordinatePair::lon_lat(13.41894, 52.50055),
            CoordinatePair::lon_lat(14.10293, 52.50055),
        ]);
        let response = client_with(mock).request_duration(&request).await.unwrap();

        assert!(response.is_square(2));
        assert_eq!(&response.durations[0][..], &[0.0, NO_PATH_DURATION]);
        assert_eq!(&response.durations[1][..], &[2903.0, 0.0]);
    }

    #[tokio::test]
    async fn test_api_version_override() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .withf(|req| req.url.path() == "/distances/v2/mapbox/driving")
            .returning(|_| ok(b"{}"));

        let client = client_with(mock);
        client.set_api_version("v2");
        assert_eq!(client.api_version(), "v2");
        assert!(
            client
                .request_duration(&DurationRequest::default())
                .await
                .is_ok()
        );

        client.set_api_version("");
        assert_eq!(client.api_version(), DEFAULT_API_VERSION);
    }

    #[test]
    fn test_api_key_resolution() {
        let client = client_with(MockHttpTransport::new());
        assert_eq!(client.api_key().expose_secret(), "test-token");
        assert!(client.has_api_key());

        client.set_api_key("pk.other");
        assert_eq!(client.api_key().expose_secret(), "pk.other");

        client.clear_api_key();
        assert_eq!(
            client.api_key().expose_secret(),
            DEFAULT_API_KEY.as_deref().unwrap_or_default()
        );

        client.set_api_key("pk.again");
        client.set_api_key("");
        assert_eq!(
            client.api_key().expose_secret(),
            DEFAULT_API_KEY.as_deref().unwrap_or_default()
        );
    }

    #[tokio::test]
    async fn test_set_transport_takes_precedence() {
        let mut unused = MockHttpTransport::new();
        unused.expect_send().times(0);

        let mut replacement = MockHttpTransport::new();
        replacement
            .expect_send()
            .times(1)
            .returning(|_| ok(EMPTY_COLLECTION));

        let client = client_with(unused);
        client.set_transport(Arc::new(replacement));
        assert!(client.lookup_place("Edmonton").await.is_ok());
    }

    #[test]
    fn test_clear_transport_falls_back_to_default() {
        let injected: Arc<dyn HttpTransport> = Arc::new(MockHttpTransport::new());
        let client = MapboxClient::with_transport(
            MapboxConfig::for_testing("https://api.mapbox.test"),
            Arc::clone(&injected),
        )
        .unwrap();
        assert!(client.default_transport.get().is_none());
        assert!(Arc::ptr_eq(&client.transport().unwrap(), &injected));

        let replacement: Arc<dyn HttpTransport> = Arc::new(MockHttpTransport::new());
        client.set_transport(Arc::clone(&replacement));
        assert!(Arc::ptr_eq(&client.transport().unwrap(), &replacement));

        client.clear_transport();
        let fallback = client.transport().unwrap();
        assert!(!Arc::ptr_eq(&fallback, &injected));
        assert!(!Arc::ptr_eq(&fallback, &replacement));

        // Built once, then reused.
        assert!(Arc::ptr_eq(&client.transport().unwrap(), &fallback));
        assert!(client.default_transport.get().is_some());
    }

    #[test]
    fn test_new_builds_default_transport_up_front() {
        let client = MapboxClient::new(MapboxConfig::for_testing("https://api.mapbox.test")).unwrap();
        let built = Arc::clone(client.default_transport.get().unwrap());
        assert!(Arc::ptr_eq(&client.transport().unwrap(), &built));
    }

    #[test]
    fn test_call_context_reads_key_and_version_together() {
        let client = client_with(MockHttpTransport::new());
        let write_pair = |i: usize| {
            let mut settings = client.settings.write();
            settings.api_key = Some(SecretString::from(format!("pk.{i}")));
            settings.api_version = Some(format!("v{i}"));
        };
        write_pair(0);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 1..500 {
                    write_pair(i);
                }
            });
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        let ctx = client.call_context();
                        assert_eq!(
                            ctx.api_key.expose_secret().trim_start_matches("pk."),
                            ctx.api_version.trim_start_matches('v')
                        );
                    }
                });
            }
        });
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = MapboxConfig {
            base_url: "not a url".to_string(),
            ..MapboxConfig::default()
        };
        let err = MapboxClient::new(config).unwrap_err();
        assert!(matches!(err, MapboxError::Configuration(_)));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = client_with(MockHttpTransport::new());
        let debug = format!("{client:?}");
        assert!(debug.contains("api.mapbox.test"));
        assert!(!debug.contains("test-token"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_and_updates() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(16).returning(|_| ok(b"{}"));
        let client = Arc::new(client_with(mock));

        let mut handles = Vec::new();
        for i in 0..16 {
            let client = Arc::clone(&client);
            handles.push(tokio::spawn(async move {
                if i % 4 == 0 {
                    client.set_api_version(format!("v{}", i % 3 + 1));
                }
                client.request_duration(&DurationRequest::default()).await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert!(client.api_version().starts_with('v'));
    }
}
