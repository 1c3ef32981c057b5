//! # API REST
//!
//! REST API implementation for BannerShare.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, status codes, response headers, CORS)
//!
//! All validation and storage logic lives in `bannershare-core`; handlers only translate.

#![warn(rust_2018_idioms)]

mod error;
mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use bannershare_core::{ReviewService, ServerConfig};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;
pub use handlers::SignedWriteQuery;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReviewService>,
}

impl AppState {
    pub fn new(service: ReviewService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Opens the configured object store and builds the review service around it.
///
/// # Errors
/// Returns an error if the storage root cannot be prepared or the signer rejects the
/// configuration.
pub async fn state_from_config(config: &ServerConfig) -> anyhow::Result<AppState> {
    let store = bannershare_files::from_config(config.storage()).await?;
    tracing::info!(backend = store.backend_name(), "object store ready");
    Ok(AppState::new(ReviewService::new(store, config)?))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::create_upload,
        handlers::sign,
        handlers::upload,
        handlers::signed_upload,
        handlers::finalize,
        handlers::fetch,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::CreateUploadReq,
        api_shared::CreateUploadRes,
        api_shared::UploadConstraints,
        api_shared::SignReq,
        api_shared::SignRes,
        api_shared::OkRes,
        api_shared::FinalizeReq,
        api_shared::FinalizeFileReq,
        api_shared::FinalizeRes,
        api_shared::ErrorRes,
    ))
)]
pub struct ApiDoc;

/// Builds the full application router.
///
/// Write routes accept bodies up to the per-file limit; larger bodies are refused before the
/// handler runs.
pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.service.limits().max_file_size()).unwrap_or(usize::MAX);

    let writes = Router::new()
        .route("/api/upload", post(handlers::upload))
        .route("/objects/:id/*path", put(handlers::signed_upload))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/create-upload", post(handlers::create_upload))
        .route("/api/sign", post(handlers::sign))
        .route("/api/finalize", post(handlers::finalize))
        .route("/r/:id/*path", get(handlers::fetch))
        .merge(writes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
