use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use hyperdrive::{Asset, Gallery, SyncError};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, error};

use crate::config::{STATIC_MOUNT, Settings};

pub const CLEANED_MESSAGE: &str = "Cleaned up files on server";
pub const LISTING_FAILED_MESSAGE: &str = "Internal error occurred while querying Google Drive";
pub const CACHE_FAILED_MESSAGE: &str = "Internal error occurred while accessing the image cache";

#[derive(Clone)]
pub struct AppState {
    pub gallery: Arc<Gallery>,
}

impl AppState {
    pub fn new(gallery: Gallery) -> Self {
        Self {
            gallery: Arc::new(gallery),
        }
    }
}

#[derive(Debug, Serialize)]
struct AssetsBody {
    status: u16,
    data: Vec<Asset>,
}

#[derive(Debug, Serialize)]
struct MessageBody {
    status: u16,
    message: &'static str,
}

/// A refresh or clean that could not run.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct TriggerError(#[from] SyncError);

impl IntoResponse for TriggerError {
    fn into_response(self) -> Response {
        let message = match &self.0 {
            SyncError::Listing(_) => LISTING_FAILED_MESSAGE,
            SyncError::Cache(_) => CACHE_FAILED_MESSAGE,
        };
        error!(error = %self.0, "trigger failed");

        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let body = MessageBody {
            status: status.as_u16(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

async fn refresh(State(state): State<AppState>) -> Result<Response, TriggerError> {
    let report = state.gallery.refresh().await?;
    let body = AssetsBody {
        status: StatusCode::OK.as_u16(),
        data: report.assets,
    };
    Ok(Json(body).into_response())
}

async fn clean(State(state): State<AppState>) -> Result<Response, TriggerError> {
    state.gallery.clean().await?;
    let body = MessageBody {
        status: StatusCode::OK.as_u16(),
        message: CLEANED_MESSAGE,
    };
    Ok(Json(body).into_response())
}

fn cors() -> CorsLayer {
    CorsLayer::new().allow_origin(Any).allow_headers([
        header::ORIGIN,
        HeaderName::from_static("x-requested-with"),
        header::CONTENT_TYPE,
        header::ACCEPT,
    ])
}

/// The full HTTP surface: the two triggers, the image cache, the static
/// folder and the rendered public assets.
pub fn router(settings: &Settings, state: AppState) -> Router {
    let images = format!("/{}", settings.image_prefix());

    Router::new()
        .route(&settings.refresh_endpoint, post(refresh))
        .route(&settings.clean_endpoint, post(clean))
        .nest_service(&images, ServeDir::new(&settings.public_images_folder))
        .nest_service(STATIC_MOUNT, ServeDir::new(&settings.static_folder))
        .fallback_service(ServeDir::new(&settings.public_assets_folder))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors())
        .with_state(state)
}
