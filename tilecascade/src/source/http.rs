//! HTTP tile source backed by an async reqwest client.

use super::types::{SourceError, TileSource};
use crate::coord::{tile_to_quadkey, TileAddress, MAX_ZOOM};
use bytes::Bytes;
use std::time::Duration;
use tracing::trace;

/// Default User-Agent string for HTTP requests.
/// Some tile servers reject requests without one.
pub const DEFAULT_USER_AGENT: &str = concat!("tilecascade/", env!("CARGO_PKG_VERSION"));

/// Default whole-request timeout applied by the HTTP client itself.
const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches raster or vector tiles from a URL template.
///
/// The template may contain `{z}`, `{x}` (column), `{y}` (row) and
/// `{quadkey}` placeholders, e.g.
/// `https://tile.openstreetmap.org/{z}/{x}/{y}.png`.
#[derive(Clone)]
pub struct HttpTileSource {
    client: reqwest::Client,
    url_template: String,
    min_zoom: u8,
    max_zoom: u8,
}

impl HttpTileSource {
    /// Creates a source with the default user agent.
    pub fn new(url_template: impl Into<String>) -> Result<Self, SourceError> {
        Self::with_user_agent(url_template, DEFAULT_USER_AGENT)
    }

    /// Creates a source with a custom user agent.
    pub fn with_user_agent(
        url_template: impl Into<String>,
        user_agent: &str,
    ) -> Result<Self, SourceError> {
        let url_template = url_template.into();
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_CLIENT_TIMEOUT)
            .user_agent(user_agent)
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Http {
                url: url_template.clone(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            url_template,
            min_zoom: 0,
            max_zoom: MAX_ZOOM,
        })
    }

    /// Restricts the zoom levels this source will request.
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom.min(MAX_ZOOM);
        self
    }

    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    /// Checks if this source serves the given zoom level.
    pub fn supports_zoom(&self, zoom: u8) -> bool {
        (self.min_zoom..=self.max_zoom).contains(&zoom)
    }

    /// Expands the URL template for one tile.
    pub fn build_url(&self, zoom: u8, row: i64, col: i64) -> String {
        let mut url = self
            .url_template
            .replace("{z}", &zoom.to_string())
            .replace("{x}", &col.to_string())
            .replace("{y}", &row.to_string());
        if url.contains("{quadkey}") {
            let quadkey = tile_to_quadkey(&TileAddress::new(zoom, row, col));
            url = url.replace("{quadkey}", &quadkey);
        }
        url
    }
}

impl TileSource for HttpTileSource {
    type Content = Bytes;

    async fn fetch(&self, zoom: u8, row: i64, col: i64) -> Result<Bytes, SourceError> {
        if !self.supports_zoom(zoom) {
            return Err(SourceError::UnsupportedZoom(zoom));
        }

        let url = self.build_url(zoom, row, col);
        trace!(url = %url, "GET tile");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Http {
                url: url.clone(),
                message: format!("Request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(|e| SourceError::Http {
            url,
            message: format!("Failed to read response: {}", e),
        })
    }

    fn name(&self) -> &str {
        &self.url_template
    }
}
