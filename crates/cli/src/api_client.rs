//! HTTP client for a BannerShare server.

use api_shared::{CreateUploadRes, ErrorRes, FinalizeRes, SignRes};
use async_trait::async_trait;
use bannershare_core::{
    ErrorKind, FileEntry, RelativePath, ReviewError, ReviewId, ReviewResult, SessionFile, SessionGrant,
    UploadApi, UploadLimits,
};
use reqwest::{header::CONTENT_TYPE, StatusCode, Url};
use serde_json::json;

const START_FAILED: &str = "Unable to start upload";
const SIGN_FAILED: &str = "Unable to sign upload";
const TRANSFER_FAILED: &str = "A file failed to upload";
const FINALIZE_FAILED: &str = "Unable to finalize upload";

#[derive(Clone)]
pub struct HttpUploadApi {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpUploadApi {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("invalid server URL {base_url}: {e}"))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    fn url(&self, path: &str, fallback: &str) -> ReviewResult<Url> {
        self.base_url
            .join(path)
            .map_err(|_| ReviewError::Transfer(fallback.into()))
    }

    async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
        fallback: &str,
    ) -> ReviewResult<reqwest::Response> {
        let response = self
            .http
            .post(self.url(path, fallback)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(path, error = %e, "request failed");
                ReviewError::Transfer(fallback.into())
            })?;
        if !response.status().is_success() {
            return Err(server_error(response, fallback).await);
        }
        Ok(response)
    }
}

/// Prefers the server's own `{error}` message over the generic fallback.
/// The failure class comes from the body's `kind`, else from the status code.
async fn server_error(response: reqwest::Response, fallback: &str) -> ReviewError {
    let status = response.status();
    let body = response.json::<ErrorRes>().await.ok();
    let kind = body
        .as_ref()
        .and_then(|body| body.kind.as_deref())
        .and_then(ErrorKind::from_name)
        .unwrap_or_else(|| kind_for_status(status));
    let message = body
        .map(|body| body.error)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());
    tracing::debug!(%status, ?kind, %message, "server rejected request");
    ReviewError::from_remote(kind, message)
}

fn kind_for_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::BAD_REQUEST => ErrorKind::Validation,
        StatusCode::PAYLOAD_TOO_LARGE => ErrorKind::LimitExceeded,
        StatusCode::FORBIDDEN => ErrorKind::Forbidden,
        StatusCode::NOT_FOUND => ErrorKind::NotFound,
        _ => ErrorKind::Transfer,
    }
}

#[async_trait]
impl UploadApi for HttpUploadApi {
    async fn create_session(&self, zip_name: &str) -> ReviewResult<SessionGrant> {
        let res: CreateUploadRes = self
            .post_json("/api/create-upload", json!({ "zipName": zip_name }), START_FAILED)
            .await?
            .json()
            .await
            .map_err(|_| ReviewError::Transfer(START_FAILED.into()))?;

        let identifier = ReviewId::parse(&res.identifier)
            .map_err(|_| ReviewError::Transfer(START_FAILED.into()))?;
        Ok(SessionGrant {
            identifier,
            review_location: res.review_location,
            limits: UploadLimits::new(res.constraints.max_file_size, res.constraints.max_total_size)
                .ok(),
        })
    }

    async fn sign_write(
        &self,
        id: &ReviewId,
        path: &RelativePath,
        content_type: &str,
    ) -> ReviewResult<String> {
        let body = json!({
            "identifier": id.as_str(),
            "path": path.as_str(),
            "contentType": content_type,
        });
        let res: SignRes = self
            .post_json("/api/sign", body, SIGN_FAILED)
            .await?
            .json()
            .await
            .map_err(|_| ReviewError::Transfer(SIGN_FAILED.into()))?;
        Ok(res.url)
    }

    async fn transfer(&self, url: &str, file: &FileEntry) -> ReviewResult<()> {
        let url = Url::parse(url).map_err(|_| ReviewError::Transfer(TRANSFER_FAILED.into()))?;
        let response = self
            .http
            .put(url)
            .header(CONTENT_TYPE, file.content_type)
            .body(file.data.clone())
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(path = %file.path, error = %e, "transfer failed");
                ReviewError::Transfer(TRANSFER_FAILED.into())
            })?;
        if !response.status().is_success() {
            tracing::debug!(path = %file.path, status = %response.status(), "transfer rejected");
            return Err(ReviewError::Transfer(TRANSFER_FAILED.into()));
        }
        Ok(())
    }

    async fn finalize(&self, id: &ReviewId, files: &[SessionFile]) -> ReviewResult<Option<String>> {
        let body = json!({ "identifier": id.as_str(), "files": files });
        let res: FinalizeRes = self
            .post_json("/api/finalize", body, FINALIZE_FAILED)
            .await?
            .json()
            .await
            .map_err(|_| ReviewError::Transfer(FINALIZE_FAILED.into()))?;
        Ok(Some(res.review_location))
    }
}
