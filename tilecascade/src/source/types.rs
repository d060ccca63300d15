//! Tile source types and traits

use crate::coord::TileAddress;
use std::future::Future;
use thiserror::Error;

/// Errors a tile source can report.
///
/// The engine never surfaces these to callers of `render_tiles`; they are
/// logged and turned into a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Transport-level failure
    #[error("HTTP error for {url}: {message}")]
    Http { url: String, message: String },
    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    /// Zoom level not served by this source
    #[error("Zoom level {0} not supported by source")]
    UnsupportedZoom(u8),
    /// Anything else
    #[error("Tile source error: {0}")]
    Other(String),
}

/// The injected collaborator that produces tile content.
///
/// Called with normalized addresses only. Implementations decide what the
/// content is (encoded image bytes, decoded vector data, ...); the engine
/// treats it as opaque.
pub trait TileSource: Send + Sync + 'static {
    /// Payload produced for one tile.
    type Content: Send + Sync + 'static;

    /// Fetches one tile.
    ///
    /// # Arguments
    ///
    /// * `zoom` - Zoom level
    /// * `row` - Tile row, in `[0, 2^zoom)`
    /// * `col` - Tile column, in `[0, 2^zoom)`
    fn fetch(
        &self,
        zoom: u8,
        row: i64,
        col: i64,
    ) -> impl Future<Output = Result<Self::Content, SourceError>> + Send;

    /// Returns the source's name for logging and identification.
    fn name(&self) -> &str {
        "tile source"
    }
}

/// Adapts an async closure into a [`TileSource`].
///
/// # Example
///
/// ```
/// use tilecascade::coord::TileAddress;
/// use tilecascade::source::{FnTileSource, SourceError};
///
/// let source = FnTileSource::new("echo", |address: TileAddress| async move {
///     Ok::<_, SourceError>(address.to_string())
/// });
/// ```
pub struct FnTileSource<F> {
    name: String,
    fetch: F,
}

impl<F> FnTileSource<F> {
    pub fn new(name: impl Into<String>, fetch: F) -> Self {
        Self {
            name: name.into(),
            fetch,
        }
    }
}

impl<F, Fut, T> TileSource for FnTileSource<F>
where
    F: Fn(TileAddress) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, SourceError>> + Send,
    T: Send + Sync + 'static,
{
    type Content = T;

    fn fetch(
        &self,
        zoom: u8,
        row: i64,
        col: i64,
    ) -> impl Future<Output = Result<T, SourceError>> + Send {
        (self.fetch)(TileAddress::new(zoom, row, col))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SourceError::Status {
            url: "http://tiles/1/0/0.png".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "HTTP 404 from http://tiles/1/0/0.png");
        assert_eq!(
            SourceError::UnsupportedZoom(22).to_string(),
            "Zoom level 22 not supported by source"
        );
    }

    #[tokio::test]
    async fn test_fn_source_receives_address() {
        let source = FnTileSource::new("echo", |address: TileAddress| async move {
            Ok::<_, SourceError>((address.zoom, address.row, address.col))
        });

        assert_eq!(source.name(), "echo");
        assert_eq!(source.fetch(4, 2, 9).await.unwrap(), (4, 2, 9));
    }

    #[tokio::test]
    async fn test_fn_source_propagates_error() {
        let source = FnTileSource::new("broken", |_address: TileAddress| async move {
            Err::<(), _>(SourceError::Other("down".to_string()))
        });

        assert_eq!(
            source.fetch(0, 0, 0).await.unwrap_err(),
            SourceError::Other("down".to_string())
        );
    }
}
