//! HTTP routes
//!
//! `POST /download/` and `POST /download-audio/` take `{"url": "..."}` and
//! stream the cached file back. `GET /health` and `GET /cache` are for
//! operators. Every failure is rendered as `{"detail": "..."}`.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::app::cache::SlotStatus;
use crate::app::handler::CachedMedia;
use crate::app::media::MediaKind;
use crate::errors::{AppError, Result};

use super::AppState;

/// Body of a media request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
}

/// Body of every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Build the service router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/download/", post(download_video))
        .route("/download", post(download_video))
        .route("/download-audio/", post(download_audio))
        .route("/download-audio", post(download_audio))
        .route("/health", get(health))
        .route("/cache", get(cache_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn download_video(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Response> {
    serve_media(state, payload, MediaKind::Video).await
}

async fn download_audio(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Response> {
    serve_media(state, payload, MediaKind::Audio).await
}

async fn serve_media(
    state: AppState,
    payload: std::result::Result<Json<DownloadRequest>, JsonRejection>,
    kind: MediaKind,
) -> Result<Response> {
    let Json(request) = payload.map_err(|rejection| AppError::InvalidRequest {
        reason: rejection.body_text(),
    })?;

    let media = state.handler.handle(&request.url, kind).await?;
    media_response(media)
}

fn media_response(media: CachedMedia) -> Result<Response> {
    let disposition = format!("attachment; filename=\"{}\"", media.file_name());
    let cache_state = if media.hit { "hit" } else { "miss" };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, media.kind.content_type())
        .header(header::CONTENT_LENGTH, media.len)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header("x-cache", HeaderValue::from_static(cache_state))
        .body(Body::from_stream(ReaderStream::new(media.file)))
        .map_err(|e| AppError::generic(format!("Failed to build response: {e}")))
}

async fn health() -> &'static str {
    "ok"
}

async fn cache_status(State(state): State<AppState>) -> Json<Vec<SlotStatus>> {
    Json(state.handler.slots().status().await)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!("Request failed ({}): {}", self.category(), self);
        } else {
            warn!("Request rejected ({}): {}", self.category(), self);
        }

        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
