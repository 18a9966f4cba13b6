use std::io;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Json, Response};
use cas_store::StoreError;
use cas_types::{ContentAddress, ObjectMetadata};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::io::StreamReader;
use tracing::{info, warn};
use url::Url;

use crate::content::serve_object;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    pub md5: Option<String>,
    pub cb: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadParams {
    pub validate: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Empty query values are treated as if the key were absent.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_callback(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// `POST /upload?md5=<hex>&cb=<url>`
pub async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Body,
) -> Result<Json<ObjectMetadata>, ApiError> {
    let expected = present(params.md5)
        .map(|hex| ContentAddress::from_hex(&hex))
        .transpose()
        .map_err(|_| ApiError::BadRequest("bad md5"))?;
    let callback = match present(params.cb) {
        Some(raw) => Some(parse_callback(&raw).ok_or(ApiError::BadRequest("bad callback url"))?),
        None => None,
    };

    let mut reader = StreamReader::new(body.into_data_stream().map_err(io::Error::other));
    let metadata = match state.store.store(&mut reader, expected).await {
        Ok(metadata) => metadata,
        Err(StoreError::AlreadyExists(metadata)) => return Err(ApiError::Conflict(metadata)),
        Err(StoreError::HashMismatch { .. }) => return Err(ApiError::BadRequest("md5 mismatch")),
        Err(e) => return Err(ApiError::internal("store", e)),
    };

    if let Some(url) = callback {
        state.notifier.spawn(url, metadata);
    }
    Ok(Json(metadata))
}

/// `GET /download/:hash?validate`
pub async fn download(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Query(params): Query<DownloadParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let address = ContentAddress::from_hex(&hash).map_err(|_| ApiError::NotFound)?;

    let mut handle = match state.store.open(&address).await {
        Ok(handle) => handle,
        Err(StoreError::NotFound(_)) => return Err(ApiError::NotFound),
        Err(e) => return Err(ApiError::internal("open", e)),
    };

    if params.validate.is_some() {
        match handle.verify().await {
            Ok(()) => {}
            Err(StoreError::Corrupt { address, computed }) => {
                warn!(address = %address, computed = %computed, "object corrupt");
                return Err(ApiError::Corrupt);
            }
            Err(e) => return Err(ApiError::internal("verify", e)),
        }
    }

    serve_object(handle, &headers)
        .await
        .map_err(|e| ApiError::internal("serve", e))
}

/// `DELETE /delete/:hash`
pub async fn delete(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<StatusCode, ApiError> {
    let address = ContentAddress::from_hex(&hash).map_err(|_| ApiError::BadRequest("bad hash"))?;
    match state.store.delete(&address).await {
        Ok(()) => {
            info!(address = %address, "object deleted");
            Ok(StatusCode::OK)
        }
        Err(StoreError::NotFound(_)) => Err(ApiError::NotFound),
        Err(e) => Err(ApiError::internal("delete", e)),
    }
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_are_absent() {
        assert_eq!(present(Some(String::new())), None);
        assert_eq!(present(Some("x".into())), Some("x".into()));
        assert_eq!(present(None), None);
    }

    #[test]
    fn callback_must_be_absolute_http() {
        assert!(parse_callback("http://127.0.0.1:9000/hook").is_some());
        assert!(parse_callback("https://example.com/").is_some());
        assert!(parse_callback("/relative/path").is_none());
        assert!(parse_callback("ftp://example.com/").is_none());
        assert!(parse_callback("not a url").is_none());
    }

    #[tokio::test]
    async fn health_reports_version() {
        let Json(body) = health().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }
}
