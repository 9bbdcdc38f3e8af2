//! reqwest-backed implementations of [`SyncApi`] and [`BundleSource`].

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::types::{RawTile, WireExportEntry};
use super::{
    ApiError, ApiResult, BundleSource, IncrementalPage, SyncApi, SyncStatusEntry,
    SyncStatusRequest,
};
use crate::auth::TokenStore;
use crate::coord::{BoundingBox, TileCoordinate};
use crate::export::ExportManifest;
use crate::sync::{EntityKind, VersionToken};

/// Default connect/read timeout for service calls in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default timeout for a whole bundle download in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

const LIST_TILES_PATH: &str = "api/v2/points-of-interest/tiles";
const SYNC_STATUS_PATH: &str = "api/v2.1/points-of-interest/sync-status";
const MARKER_SYNC_PATH: &str = "api/v2/points-of-interest/sync";
const REVIEW_SYNC_PATH: &str = "api/v2/reviews/sync";
const EXPORT_PATH: &str = "api/v2/points-of-interest/export";

const API_KEY_HEADER: &str = "apikey";

/// Client for the synchronization service.
///
/// Redirects are never followed: the incremental endpoints answer
/// `303 See Other` when a tile is too stale to catch up, and that status has
/// to reach the engine.
pub struct HttpSyncApi {
    client: Client,
    base_url: String,
    api_key: String,
    tokens: Arc<dyn TokenStore>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpSyncApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSyncApi")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpSyncApi {
    /// Create a client for the service at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        tokens: Arc<dyn TokenStore>,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            tokens,
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Attach the API key and, when one is stored, the bearer token.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(API_KEY_HEADER, &self.api_key);
        match self.tokens.get() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn send(&self, endpoint: &str, request: RequestBuilder) -> ApiResult<Response> {
        self.authorize(request)
            .send()
            .map_err(|e| request_error(endpoint, self.timeout, e))
    }

    fn post_json<Req, Res>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        body: &Req,
    ) -> ApiResult<Res>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let request = self.client.post(self.url(endpoint)).query(query).json(body);
        let response = self.send(endpoint, request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        response.json().map_err(|e| ApiError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}

fn request_error(endpoint: &str, timeout: Duration, e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout {
            endpoint: endpoint.to_string(),
            timeout_secs: timeout.as_secs(),
        }
    } else {
        ApiError::Request {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    }
}

fn sync_path(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Markers => MARKER_SYNC_PATH,
        EntityKind::Reviews => REVIEW_SYNC_PATH,
    }
}

impl SyncApi for HttpSyncApi {
    fn list_tiles(&self, boxes: &[BoundingBox]) -> ApiResult<Vec<TileCoordinate>> {
        let raw: Vec<RawTile> = self.post_json(LIST_TILES_PATH, &[], boxes)?;

        Ok(raw
            .into_iter()
            .filter_map(|entry| match entry.tile() {
                Ok(tile) => Some(tile),
                Err(e) => {
                    warn!(endpoint = LIST_TILES_PATH, error = %e, "Dropping tile entry");
                    None
                }
            })
            .collect())
    }

    fn sync_status(
        &self,
        database_version: &str,
        requests: &[SyncStatusRequest],
    ) -> ApiResult<Vec<SyncStatusEntry>> {
        self.post_json(
            SYNC_STATUS_PATH,
            &[("databaseVersion", database_version)],
            requests,
        )
    }

    fn sync_incremental(
        &self,
        tile: TileCoordinate,
        kind: EntityKind,
        cursor: Option<&VersionToken>,
    ) -> ApiResult<IncrementalPage> {
        let endpoint = sync_path(kind);
        let x = tile.x().to_string();
        let y = tile.y().to_string();
        let mut query = vec![("tileX", x.as_str()), ("tileY", y.as_str())];
        if let Some(cursor) = cursor {
            query.push(("lastModifiedAfter", cursor.as_str()));
        }

        let request = self.client.get(self.url(endpoint)).query(&query);
        let response = self.send(endpoint, request)?;

        let status = response.status();
        if status == StatusCode::SEE_OTHER {
            debug!(tile = %tile, kind = %kind, "Server requested full export");
            return Ok(IncrementalPage::ExportRequired);
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|e| request_error(endpoint, self.timeout, e))?;
        Ok(IncrementalPage::Page(body))
    }

    fn export_manifests(&self, tiles: &[TileCoordinate]) -> ApiResult<Vec<ExportManifest>> {
        let entries: Vec<WireExportEntry> = self.post_json(EXPORT_PATH, &[], tiles)?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry.tile.tile() {
                Ok(tile) => Some(ExportManifest {
                    tile,
                    download_url: entry.gzip.url,
                    compressed_size: entry.gzip.file_size,
                    checksum: entry.gzip.md5_hash,
                }),
                Err(e) => {
                    warn!(endpoint = EXPORT_PATH, error = %e, "Dropping export entry");
                    None
                }
            })
            .collect())
    }
}

/// Streams bundles from their download URLs.
///
/// Bundle URLs point at plain file hosting, so no service credentials are
/// attached and redirects are followed.
#[derive(Debug, Clone)]
pub struct HttpBundleSource {
    client: Client,
    timeout: Duration,
}

impl HttpBundleSource {
    /// `connect_timeout` bounds connection setup; `timeout` bounds the whole
    /// transfer.
    pub fn new(connect_timeout: Duration, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }
}

impl BundleSource for HttpBundleSource {
    fn open(&self, url: &str) -> ApiResult<Box<dyn Read + Send>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| request_error(url, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(Box::new(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;

    fn api(base: &str) -> HttpSyncApi {
        HttpSyncApi::new(
            base,
            "key",
            Arc::new(MemoryTokenStore::new()),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
        .unwrap()
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        assert_eq!(
            api("https://example.com/").url(LIST_TILES_PATH),
            "https://example.com/api/v2/points-of-interest/tiles"
        );
        assert_eq!(
            api("https://example.com").url(EXPORT_PATH),
            "https://example.com/api/v2/points-of-interest/export"
        );
    }

    #[test]
    fn test_sync_path_per_kind() {
        assert_eq!(sync_path(EntityKind::Markers), MARKER_SYNC_PATH);
        assert_eq!(sync_path(EntityKind::Reviews), REVIEW_SYNC_PATH);
    }

    #[test]
    fn test_bundle_source_builds() {
        let source = HttpBundleSource::new(
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        )
        .unwrap();
        assert_eq!(source.timeout.as_secs(), DEFAULT_DOWNLOAD_TIMEOUT_SECS);
    }
}
