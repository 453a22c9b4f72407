//! Blocking Overpass client bridging async `reqwest` calls.

use geo::Geometry;
use log::Level;
use osmlayers_core::{FeatureTable, QueryError, TagFilter, TagQuery};
use reqwest::Client;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

use super::cache::ResponseCache;
use super::config::OverpassConfig;
use super::elements::elements_to_table;
use super::ql::build_query;
use super::response::OverpassResponse;

/// Error type for [`OverpassClient`] construction failures.
#[derive(Debug)]
pub enum ClientBuildError {
    /// Failed to build the HTTP client.
    HttpClient(reqwest::Error),
    /// Failed to build the Tokio runtime.
    Runtime(std::io::Error),
}

impl std::fmt::Display for ClientBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HttpClient(err) => write!(f, "failed to build HTTP client: {err}"),
            Self::Runtime(err) => write!(f, "failed to build Tokio runtime: {err}"),
        }
    }
}

impl std::error::Error for ClientBuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::HttpClient(err) => Some(err),
            Self::Runtime(err) => Some(err),
        }
    }
}

/// Overpass-backed [`TagQuery`].
///
/// The client owns a Tokio runtime that is reused across calls. Inside a
/// multi-threaded runtime it borrows the caller's handle through
/// [`tokio::task::block_in_place`] instead; a `current_thread` caller falls
/// back to the internal runtime.
pub struct OverpassClient {
    client: Client,
    config: OverpassConfig,
    cache: ResponseCache,
    runtime: Runtime,
}

impl std::fmt::Debug for OverpassClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverpassClient")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish_non_exhaustive()
    }
}

impl OverpassClient {
    /// Create a client for the public endpoint with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::with_config(OverpassConfig::default())
    }

    /// Create a client with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: OverpassConfig) -> Result<Self, ClientBuildError> {
        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.connect_timeout(timeout).timeout(timeout);
        }
        let client = builder.build().map_err(ClientBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ClientBuildError::Runtime)?;
        let cache = ResponseCache::new(config.cache_dir.clone());
        Ok(Self {
            client,
            config,
            cache,
            runtime,
        })
    }

    /// The active configuration.
    pub const fn config(&self) -> &OverpassConfig {
        &self.config
    }

    const fn log_level(&self) -> Level {
        if self.config.settings.verbose_logging {
            Level::Info
        } else {
            Level::Debug
        }
    }

    /// Return the response body for `query`, consulting the cache first.
    fn fetch_body(&self, query: &str) -> Result<String, QueryError> {
        let use_cache = self.config.settings.use_cache;
        let entry = self.cache.entry_path(&self.config.endpoint, query);
        if use_cache && let Some(body) = self.cache.load(&entry)? {
            log::log!(self.log_level(), "Retrieved response from cache file {}", entry.display());
            return Ok(body);
        }

        log::log!(
            self.log_level(),
            "Posting {} byte query to {}",
            query.len(),
            self.config.endpoint
        );
        let future = self.post_async(query);
        let body = match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }?;

        if use_cache {
            self.cache.store(&entry, &body)?;
            log::log!(self.log_level(), "Saved response to cache file {}", entry.display());
        }
        Ok(body)
    }

    async fn post_async(&self, query: &str) -> Result<String, QueryError> {
        let url = self.config.endpoint.as_str();
        let response = self
            .client
            .post(url)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        response
            .text()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))
    }

    /// Convert a reqwest error to a [`QueryError`].
    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> QueryError {
        if error.is_timeout() {
            return QueryError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.map_or(0, |timeout| timeout.as_secs()),
            };
        }

        if let Some(status) = error.status() {
            return QueryError::Http {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        QueryError::Network {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

/// Decode a response body into a table clipped to `area`.
fn parse_body(body: &str, area: &Geometry<f64>) -> Result<FeatureTable, QueryError> {
    let response: OverpassResponse =
        serde_json::from_str(body).map_err(|err| QueryError::Parse {
            message: err.to_string(),
        })?;
    if let Some(remark) = response.error_remark() {
        return Err(QueryError::Service {
            message: remark.to_owned(),
        });
    }
    Ok(elements_to_table(response.elements, area))
}

impl TagQuery for OverpassClient {
    /// Fetch every element matching `filter` inside `area`.
    ///
    /// # Runtime requirements
    ///
    /// When called from within an existing Tokio runtime, the runtime must be
    /// multi-threaded for the caller's handle to be reused.
    fn query(&self, area: &Geometry<f64>, filter: &TagFilter) -> Result<FeatureTable, QueryError> {
        let query = build_query(area, filter, self.config.server_timeout_secs)?;
        let body = self.fetch_body(&query)?;
        let table = parse_body(&body, area)?;
        log::log!(
            self.log_level(),
            "Overpass returned {} features for {filter}",
            table.len()
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overpass::QuerySettings;
    use geo::polygon;
    use osmlayers_core::find_layer;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn area() -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)
        ])
    }

    #[rstest]
    fn parse_body_reports_service_remarks(area: Geometry<f64>) {
        let err = parse_body(
            r#"{"elements":[],"remark":"runtime error: out of memory"}"#,
            &area,
        )
        .expect_err("remark should fail");
        assert!(matches!(err, QueryError::Service { .. }), "got {err:?}");
    }

    #[rstest]
    fn parse_body_rejects_malformed_json(area: Geometry<f64>) {
        let err = parse_body("<html>busy</html>", &area).expect_err("not json");
        assert!(matches!(err, QueryError::Parse { .. }), "got {err:?}");
    }

    #[rstest]
    fn cached_responses_skip_the_network(area: Geometry<f64>) {
        let cache_dir = TempDir::new().expect("create temp dir");
        // Nothing listens on the discard port, so only the cache can answer.
        let config = OverpassConfig::new("http://127.0.0.1:9/api/interpreter")
            .with_cache_dir(cache_dir.path());
        let client = OverpassClient::with_config(config).expect("client builds");
        let bank = find_layer("bank").expect("bank layer");
        let query = build_query(&area, &bank.filter, client.config().server_timeout_secs)
            .expect("query builds");
        let entry = client
            .cache
            .entry_path(&client.config().endpoint, &query);
        client
            .cache
            .store(
                &entry,
                r#"{"elements":[{"type":"node","id":1,"lat":5,"lon":5,"tags":{"amenity":"bank"}}]}"#,
            )
            .expect("seed cache");

        let table = client.query(&area, &bank.filter).expect("served from cache");

        assert_eq!(table.len(), 1);
    }

    #[rstest]
    fn disabled_cache_reaches_the_network(area: Geometry<f64>) {
        let cache_dir = TempDir::new().expect("create temp dir");
        let config = OverpassConfig::new("http://127.0.0.1:9/api/interpreter")
            .with_cache_dir(cache_dir.path())
            .with_settings(QuerySettings {
                use_cache: false,
                verbose_logging: true,
            });
        let client = OverpassClient::with_config(config).expect("client builds");

        let err = client
            .query(&area, &find_layer("bank").expect("bank layer").filter)
            .expect_err("nothing is listening");

        assert!(matches!(err, QueryError::Network { .. }), "got {err:?}");
    }
}
