//! HTTP handlers.
//!
//! Every handler takes its body or query as a `Result` so that malformed input becomes a JSON
//! `{error}` response with a specific message rather than axum's default plain-text rejection.

use crate::{ApiError, AppState};
use api_shared::{
    CreateUploadReq, CreateUploadRes, ErrorRes, FinalizeReq, FinalizeRes, HealthRes,
    HealthService, OkRes, SignReq, SignRes, UploadConstraints,
};
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{
        header::{self, AsHeaderName, HeaderName, HeaderValue},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Json, Response},
};
use bannershare_core::{SignedWriteParams, UploadedFile};
use bannershare_files::DEFAULT_CONTENT_TYPE;
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

const UPLOAD_ID_HEADER: &str = "x-upload-id";
const UPLOAD_PATH_HEADER: &str = "x-upload-path";
const CROSS_ORIGIN_RESOURCE_POLICY: &str = "cross-origin-resource-policy";

/// Query string of a signed write URL.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SignedWriteQuery {
    /// Unix time after which the URL is refused.
    pub expires: i64,
    /// Content type the write must carry.
    pub content_type: String,
    /// Hex HMAC-SHA256 signature.
    pub signature: String,
}

fn header_value<K: AsHeaderName>(headers: &HeaderMap, name: K) -> Option<&str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn body_rejection(rejection: BytesRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::limit_exceeded("File is too large")
    } else {
        ApiError::bad_request("Unable to read upload body")
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/api/create-upload",
    request_body = CreateUploadReq,
    responses(
        (status = 200, description = "Session allocated", body = CreateUploadRes),
        (status = 400, description = "zipName missing", body = ErrorRes)
    )
)]
/// Allocate a new review session
///
/// Returns the identifier, the storage base path, where the review page will live, and the
/// limits the server enforces. Nothing is written until files arrive.
///
/// # Errors
/// Returns `400 Bad Request` if `zipName` is missing or blank.
#[axum::debug_handler]
pub async fn create_upload(
    State(state): State<AppState>,
    payload: Result<Json<CreateUploadReq>, JsonRejection>,
) -> Result<Json<CreateUploadRes>, ApiError> {
    let zip_name = payload
        .ok()
        .and_then(|Json(req)| req.zip_name)
        .ok_or_else(|| ApiError::bad_request("zipName is required"))?;

    let created = state.service.create_session(&zip_name)?;
    Ok(Json(CreateUploadRes {
        identifier: created.identifier.to_string(),
        base_path: created.base_path,
        review_location: created.review_location,
        constraints: UploadConstraints {
            max_file_size: created.limits.max_file_size(),
            max_total_size: created.limits.max_total_size(),
        },
    }))
}

#[utoipa::path(
    post,
    path = "/api/sign",
    request_body = SignReq,
    responses(
        (status = 200, description = "Signed write URL", body = SignRes),
        (status = 400, description = "Invalid id or path", body = ErrorRes),
        (status = 500, description = "Signing failed", body = ErrorRes)
    )
)]
/// Issue a signed write URL for one file
///
/// # Errors
/// Returns `400 Bad Request` if the identifier or path is missing or invalid, or names the
/// reserved metadata record.
#[axum::debug_handler]
pub async fn sign(
    State(state): State<AppState>,
    payload: Result<Json<SignReq>, JsonRejection>,
) -> Result<Json<SignRes>, ApiError> {
    let Ok(Json(req)) = payload else {
        return Err(ApiError::bad_request("Invalid request"));
    };
    let (Some(id), Some(path)) = (req.identifier, req.path) else {
        return Err(ApiError::bad_request("Invalid request"));
    };

    let signed = state
        .service
        .sign_write(&id, &path, req.content_type.as_deref(), Utc::now())?;
    Ok(Json(SignRes {
        url: signed.url.to_string(),
        expires_at: signed.expires_at.to_rfc3339(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    params(
        ("x-upload-id" = String, Header, description = "Session identifier"),
        ("x-upload-path" = String, Header, description = "Relative file path")
    ),
    responses(
        (status = 200, description = "File stored", body = OkRes),
        (status = 400, description = "Missing metadata, invalid path or body too large", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
/// Store one file sent through the server
///
/// The session and path come from the `x-upload-id` and `x-upload-path` headers; the
/// `content-type` header is stored with the object.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<OkRes>, ApiError> {
    let body = body.map_err(body_rejection)?;
    state
        .service
        .direct_write(
            header_value(&headers, UPLOAD_ID_HEADER),
            header_value(&headers, UPLOAD_PATH_HEADER),
            header_value(&headers, header::CONTENT_TYPE),
            body,
        )
        .await?;
    Ok(Json(OkRes { ok: true }))
}

#[utoipa::path(
    put,
    path = "/objects/{id}/{path}",
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    params(
        ("id" = String, Path, description = "Session identifier"),
        ("path" = String, Path, description = "Relative file path"),
        SignedWriteQuery
    ),
    responses(
        (status = 200, description = "File stored", body = OkRes),
        (status = 400, description = "Invalid path or body too large", body = ErrorRes),
        (status = 403, description = "Signature invalid, expired or content type mismatch", body = ErrorRes)
    )
)]
/// Store one file presented against a signed write URL
pub async fn signed_upload(
    State(state): State<AppState>,
    Path((id, path)): Path<(String, String)>,
    query: Result<Query<SignedWriteQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<OkRes>, ApiError> {
    let Ok(Query(query)) = query else {
        return Err(ApiError::forbidden("Upload URL signature is invalid"));
    };
    let body = body.map_err(body_rejection)?;

    let params = SignedWriteParams {
        expires: query.expires,
        content_type: query.content_type,
        signature: query.signature,
    };
    state
        .service
        .signed_write(
            &id,
            &path,
            &params,
            header_value(&headers, header::CONTENT_TYPE),
            body,
            Utc::now(),
        )
        .await?;
    Ok(Json(OkRes { ok: true }))
}

#[utoipa::path(
    post,
    path = "/api/finalize",
    request_body = FinalizeReq,
    responses(
        (status = 200, description = "Session finalized", body = FinalizeRes),
        (status = 400, description = "Invalid id, file list or limits", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
/// Record the uploaded file list and return the review location
///
/// # Errors
/// Returns `400 Bad Request` for a malformed body, an invalid identifier, an invalid path, or
/// sizes over the limits, and `500` if the metadata record cannot be written.
#[axum::debug_handler]
pub async fn finalize(
    State(state): State<AppState>,
    payload: Result<Json<FinalizeReq>, JsonRejection>,
) -> Result<Json<FinalizeRes>, ApiError> {
    let Ok(Json(req)) = payload else {
        return Err(ApiError::bad_request("Invalid request"));
    };
    let (Some(id), Some(files)) = (req.identifier, req.files) else {
        return Err(ApiError::bad_request("Invalid request"));
    };

    let files = files
        .into_iter()
        .map(|file| match (file.path, file.byte_size) {
            (Some(path), Some(byte_size)) => Ok(UploadedFile { path, byte_size }),
            _ => Err(ApiError::bad_request("Invalid file list")),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let review_location = state.service.finalize(&id, files).await?;
    Ok(Json(FinalizeRes {
        ok: true,
        review_location,
    }))
}

#[utoipa::path(
    get,
    path = "/r/{id}/{path}",
    params(
        ("id" = String, Path, description = "Session identifier"),
        ("path" = String, Path, description = "Relative file path")
    ),
    responses(
        (status = 200, description = "Object bytes"),
        (status = 400, description = "Invalid id or path", body = ErrorRes),
        (status = 404, description = "Not found", body = ErrorRes)
    )
)]
/// Serve a stored object, or the review page synthesized from the session metadata
pub async fn fetch(
    State(state): State<AppState>,
    Path((id, path)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let object = state.service.fetch(&id, &path).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&object.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(object.cache_control),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(
        HeaderName::from_static(CROSS_ORIGIN_RESOURCE_POLICY),
        HeaderValue::from_static("same-origin"),
    );

    Ok((headers, object.data).into_response())
}
