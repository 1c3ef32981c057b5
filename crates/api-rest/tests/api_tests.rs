use api_rest::{router, AppState};
use api_shared::{CreateUploadRes, FinalizeRes, SignRes};
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use bannershare_core::{
    FileEntry, RelativePath, ReviewError, ReviewId, ReviewResult, ReviewService, ServerConfig,
    SessionFile, SessionGrant, StorageConfig, UploadApi, UploadLimits, UploadOrchestrator,
    UploadPhase,
};
use bannershare_files::{FilesystemStore, MemoryStore, ObjectStore};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::io::{Cursor, Write};
use std::sync::Arc;
use tower::ServiceExt;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

const PUBLIC_URL: &str = "http://review.test";

fn app_with(store: Arc<dyn ObjectStore>, limits: UploadLimits) -> Router {
    let config = ServerConfig::new(
        "127.0.0.1:0".into(),
        PUBLIC_URL.into(),
        StorageConfig::Memory,
        limits,
        900,
        Some(vec![7u8; 32]),
    )
    .unwrap();
    router(AppState::new(ReviewService::new(store, &config).unwrap()))
}

fn app() -> Router {
    app_with(Arc::new(MemoryStore::new()), UploadLimits::default())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn error_of(body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).unwrap();
    value["error"].as_str().unwrap().to_string()
}

fn kind_of(body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).unwrap();
    value["kind"].as_str().unwrap().to_string()
}

fn local(url: &str) -> &str {
    url.strip_prefix(PUBLIC_URL).unwrap()
}

async fn create_session(app: &Router) -> String {
    let (status, _, body) = send(app, post_json("/api/create-upload", json!({"zipName": "b.zip"}))).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice::<CreateUploadRes>(&body).unwrap().identifier
}

async fn sign(app: &Router, id: &str, path: &str, content_type: &str) -> String {
    let (status, _, body) = send(
        app,
        post_json(
            "/api/sign",
            json!({"identifier": id, "path": path, "contentType": content_type}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));
    serde_json::from_slice::<SignRes>(&body).unwrap().url
}

fn put(uri: &str, content_type: &str, body: &'static [u8]) -> Request<Body> {
    Request::put(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, _, body) = send(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["ok"], true);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (status, _, body) = send(&app(), get("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert!(value["paths"]["/api/finalize"].is_object());
}

#[tokio::test]
async fn test_create_upload() {
    let app = app();
    let (status, _, body) = send(&app, post_json("/api/create-upload", json!({"zipName": "b.zip"}))).await;
    assert_eq!(status, StatusCode::OK);

    let res: CreateUploadRes = serde_json::from_slice(&body).unwrap();
    assert!(ReviewId::is_valid(&res.identifier));
    assert_eq!(res.base_path, format!("reviews/{}", res.identifier));
    assert_eq!(
        res.review_location,
        format!("{PUBLIC_URL}/r/{}/review.html", res.identifier)
    );
    assert_eq!(res.constraints.max_file_size, 5 * 1024 * 1024);
    assert_eq!(res.constraints.max_total_size, 50 * 1024 * 1024);

    let (status, _, body) = send(&app, post_json("/api/create-upload", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "zipName is required");

    let request = Request::post("/api/create-upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sign_rejects_bad_input() {
    let app = app();
    let cases = [
        (json!({"identifier": "bad!", "path": "a/index.html"}), "Invalid upload id"),
        (json!({"identifier": "abcdef123456", "path": "../x.html"}), "Invalid path"),
        (json!({"identifier": "abcdef123456", "path": "_meta.json"}), "Path is reserved"),
        (json!({"identifier": "abcdef123456"}), "Invalid request"),
    ];

    for (body, expected) in cases {
        let (status, _, res) = send(&app, post_json("/api/sign", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_of(&res), expected);
        assert_eq!(kind_of(&res), "validation");
    }
}

#[tokio::test]
async fn test_signed_put_then_fetch_with_hardening_headers() {
    let app = app();
    let id = create_session(&app).await;
    let url = sign(&app, &id, "300x250/index.html", "text/html").await;
    assert!(url.starts_with(&format!("{PUBLIC_URL}/objects/{id}/300x250/index.html?")));

    let (status, _, _) = send(&app, put(local(&url), "text/html", b"<html>hi</html>")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, body) = send(&app, get(&format!("/r/{id}/300x250/index.html"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"<html>hi</html>");
    assert_eq!(headers[header::CONTENT_TYPE], "text/html");
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=300");
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::REFERRER_POLICY], "no-referrer");
    assert_eq!(headers["cross-origin-resource-policy"], "same-origin");
}

#[tokio::test]
async fn test_signed_put_rejections() {
    let app = app();
    let id = create_session(&app).await;
    let url = sign(&app, &id, "a/index.html", "text/html").await;
    let path = local(&url);

    let (status, _, _) = send(&app, put(path, "text/plain", b"x")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let tampered = path.replace("a/index.html", "a/other.html");
    let (status, _, _) = send(&app, put(&tampered, "text/html", b"x")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let unsigned = format!("/objects/{id}/a/index.html");
    let (status, _, body) = send(&app, put(&unsigned, "text/html", b"x")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_of(&body), "Upload URL signature is invalid");
    assert_eq!(kind_of(&body), "forbidden");

    let (status, _, _) = send(&app, get(&format!("/r/{id}/a/index.html"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_direct_upload() {
    let app = app_with(Arc::new(MemoryStore::new()), UploadLimits::new(8, 64).unwrap());

    let (status, _, body) = send(&app, put_direct(None, Some("a/x.js"), b"x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "Missing upload metadata");
    assert_eq!(kind_of(&body), "validation");

    let (status, _, body) = send(&app, put_direct(Some("abcdef123456"), Some("a/x.js"), b"123456789")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "File is too large");
    assert_eq!(kind_of(&body), "limitExceeded");

    let (status, _, _) = send(&app, put_direct(Some("abcdef123456"), Some("a/x.js"), b"12345678")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, body) = send(&app, get("/r/abcdef123456/a/x.js")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"12345678");
    assert_eq!(headers[header::CONTENT_TYPE], "application/javascript");
}

fn put_direct(id: Option<&str>, path: Option<&str>, body: &'static [u8]) -> Request<Body> {
    let mut request = Request::post("/api/upload").header(header::CONTENT_TYPE, "application/javascript");
    if let Some(id) = id {
        request = request.header("x-upload-id", id);
    }
    if let Some(path) = path {
        request = request.header("x-upload-path", path);
    }
    request.body(Body::from(body)).unwrap()
}

#[tokio::test]
async fn test_finalize_and_synthesized_review_page() {
    let temp = tempfile::TempDir::new().unwrap();
    let store = FilesystemStore::new(temp.path()).await.unwrap();
    let app = app_with(Arc::new(store), UploadLimits::default());
    let id = create_session(&app).await;

    let (status, _, body) = send(
        &app,
        post_json(
            "/api/finalize",
            json!({
                "identifier": id,
                "files": [
                    {"path": "300x250/index.html", "byteSize": 10},
                    {"path": "728x90/index.html", "byteSize": 10},
                    {"path": "300x250/app.js", "byteSize": 10}
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let res: FinalizeRes = serde_json::from_slice(&body).unwrap();
    assert_eq!(res.review_location, format!("{PUBLIC_URL}/r/{id}/review.html"));

    let (status, headers, body) = send(&app, get(&format!("/r/{id}/review.html"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/html; charset=utf-8");
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=60, must-revalidate");
    let html = String::from_utf8(body.to_vec()).unwrap();
    let small = html.find("./728x90/index.html").unwrap();
    let large = html.find("./300x250/index.html").unwrap();
    assert!(small < large);
    assert!(!html.contains("app.js"));
}

#[tokio::test]
async fn test_finalize_rejections() {
    let app = app_with(Arc::new(MemoryStore::new()), UploadLimits::new(10, 15).unwrap());
    let cases = [
        (json!({"files": []}), "Invalid request"),
        (json!({"identifier": "x", "files": []}), "Invalid upload id"),
        (json!({"identifier": "abcdef123456", "files": [{"path": "a.html"}]}), "Invalid file list"),
        (
            json!({"identifier": "abcdef123456", "files": [{"path": "../a.html", "byteSize": 1}]}),
            "Invalid file path",
        ),
        (
            json!({"identifier": "abcdef123456", "files": [{"path": "a.html", "byteSize": 11}]}),
            "File is too large",
        ),
        (
            json!({"identifier": "abcdef123456", "files": [
                {"path": "a/1.html", "byteSize": 10},
                {"path": "a/2.html", "byteSize": 10}
            ]}),
            "Upload exceeds the total size limit",
        ),
    ];

    for (body, expected) in cases {
        let (status, _, res) = send(&app, post_json("/api/finalize", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_of(&res), expected);
        let kind = if expected.contains("large") || expected.contains("limit") {
            "limitExceeded"
        } else {
            "validation"
        };
        assert_eq!(kind_of(&res), kind);
    }
}

#[tokio::test]
async fn test_fetch_errors() {
    let app = app();

    let (status, _, body) = send(&app, get("/r/abcdef123456/review.html")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_of(&body), "Not found");
    assert_eq!(kind_of(&body), "notFound");

    let (status, _, body) = send(&app, get("/r/abcdef123456/a/../b.html")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "Invalid path");

    let (status, _, body) = send(&app, get("/r/nope/review.html")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "Invalid id");
}

/// Drives the router in-process the way the CLI drives a remote server.
struct RouterApi {
    app: Router,
}

fn transfer_error(body: &[u8], fallback: &str) -> ReviewError {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or_else(|| fallback.to_string());
    ReviewError::Transfer(message)
}

#[async_trait]
impl UploadApi for RouterApi {
    async fn create_session(&self, zip_name: &str) -> ReviewResult<SessionGrant> {
        let (status, _, body) =
            send(&self.app, post_json("/api/create-upload", json!({"zipName": zip_name}))).await;
        if !status.is_success() {
            return Err(transfer_error(&body, "Unable to start upload"));
        }
        let res: CreateUploadRes = serde_json::from_slice(&body)
            .map_err(|_| ReviewError::Transfer("Unable to start upload".into()))?;
        Ok(SessionGrant {
            identifier: ReviewId::parse(&res.identifier)
                .map_err(|_| ReviewError::Transfer("Unable to start upload".into()))?,
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
        let body = json!({"identifier": id.as_str(), "path": path.as_str(), "contentType": content_type});
        let (status, _, body) = send(&self.app, post_json("/api/sign", body)).await;
        if !status.is_success() {
            return Err(transfer_error(&body, "Unable to sign upload"));
        }
        let res: SignRes = serde_json::from_slice(&body)
            .map_err(|_| ReviewError::Transfer("Unable to sign upload".into()))?;
        Ok(res.url)
    }

    async fn transfer(&self, url: &str, file: &FileEntry) -> ReviewResult<()> {
        let request = Request::put(local(url))
            .header(header::CONTENT_TYPE, file.content_type)
            .body(Body::from(file.data.clone()))
            .unwrap();
        let (status, _, _) = send(&self.app, request).await;
        if !status.is_success() {
            return Err(ReviewError::Transfer("A file failed to upload".into()));
        }
        Ok(())
    }

    async fn finalize(&self, id: &ReviewId, files: &[SessionFile]) -> ReviewResult<Option<String>> {
        let body = json!({"identifier": id.as_str(), "files": files});
        let (status, _, body) = send(&self.app, post_json("/api/finalize", body)).await;
        if !status.is_success() {
            return Err(transfer_error(&body, "Unable to finalize upload"));
        }
        let res: FinalizeRes = serde_json::from_slice(&body)
            .map_err(|_| ReviewError::Transfer("Unable to finalize upload".into()))?;
        Ok(Some(res.review_location))
    }
}

fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

#[tokio::test]
async fn test_orchestrator_end_to_end() {
    let app = app();
    let archive = build_zip(&[
        ("Export/300x250/index.html", "<html>300x250</html>"),
        ("Export/300x250/My Assets/logo#1.svg", "<svg/>"),
        ("Export/728x90/index.html", "<html>728x90</html>"),
        ("__MACOSX/Export/._index.html", "junk"),
    ]);

    let orchestrator = UploadOrchestrator::new(RouterApi { app: app.clone() }, UploadLimits::default());
    let snapshot = orchestrator.select_file("export.zip", Bytes::from(archive)).await;

    assert_eq!(snapshot.phase, UploadPhase::Success, "{:?}", snapshot.error);
    assert_eq!(snapshot.progress.percent, 100);
    let location = snapshot.review_location.unwrap();

    let (status, _, body) = send(&app, get(local(&location))).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("./Export/728x90/index.html"));
    assert!(html.contains("./Export/300x250/index.html"));

    let review_base = location.trim_end_matches("review.html");
    let asset = format!("{}Export/300x250/My%20Assets/logo%231.svg", local(review_base));
    let (status, headers, body) = send(&app, get(&asset)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"<svg/>");
    assert_eq!(headers[header::CONTENT_TYPE], "image/svg+xml");
}

#[tokio::test]
async fn test_orchestrator_surfaces_server_rejections() {
    let app = app_with(Arc::new(MemoryStore::new()), UploadLimits::new(8, 64).unwrap());
    let archive = build_zip(&[("300x250/index.html", "<html>too big for the server</html>")]);

    let orchestrator = UploadOrchestrator::new(RouterApi { app }, UploadLimits::default());
    let snapshot = orchestrator.select_file("banners.zip", Bytes::from(archive)).await;

    assert_eq!(snapshot.phase, UploadPhase::Error);
    assert_eq!(snapshot.error.as_deref(), Some("One or more files exceed 8 B"));
}
