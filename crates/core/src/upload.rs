//! Client-side upload state machine.
//!
//! [`UploadOrchestrator`] drives one archive through
//! `Idle → Extracting → Uploading → Finalizing → Success | Error`, talking to the server through
//! the [`UploadApi`] trait. Every state change is published as an [`UploadSnapshot`] on a
//! `tokio::sync::watch` channel, so a UI or CLI can render progress without polling.
//!
//! Each selection is an *attempt* with its own number. Resetting (directly or through a
//! [`ResetHandle`] held by another task) bumps the number; any result that arrives for an older
//! attempt is dropped without touching the published state.

use crate::archive::{self, ExtractedArchive, ExtractError, FileEntry};
use crate::config::{format_bytes, UploadLimits};
use crate::session::SessionFile;
use crate::{ErrorKind, ReviewError, ReviewResult};
use async_trait::async_trait;
use bannershare_id::ReviewId;
use bannershare_types::RelativePath;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UploadPhase {
    Idle,
    Extracting,
    Uploading,
    Finalizing,
    Success,
    Error,
}

impl UploadPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadPhase::Success | UploadPhase::Error)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadProgress {
    pub label: String,
    pub percent: u8,
    pub detail: String,
    pub uploaded_files: usize,
    pub total_files: usize,
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
}

/// Everything a front end needs to render the current attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadSnapshot {
    pub attempt: u64,
    pub phase: UploadPhase,
    pub file_name: Option<String>,
    pub progress: UploadProgress,
    pub review_location: Option<String>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl UploadSnapshot {
    fn idle(attempt: u64) -> Self {
        Self {
            attempt,
            phase: UploadPhase::Idle,
            file_name: None,
            progress: UploadProgress::default(),
            review_location: None,
            error: None,
            error_kind: None,
        }
    }
}

/// What the server hands back when a session is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionGrant {
    pub identifier: ReviewId,
    pub review_location: String,
    /// Limits the server will enforce, when it announces them.
    pub limits: Option<UploadLimits>,
}

/// Server operations the orchestrator depends on.
#[async_trait]
pub trait UploadApi: Send + Sync {
    async fn create_session(&self, zip_name: &str) -> ReviewResult<SessionGrant>;

    /// Returns a URL that accepts one write of `path` with `content_type`.
    async fn sign_write(
        &self,
        id: &ReviewId,
        path: &RelativePath,
        content_type: &str,
    ) -> ReviewResult<String>;

    async fn transfer(&self, url: &str, file: &FileEntry) -> ReviewResult<()>;

    /// Returns the canonical review location, if the server reports one.
    async fn finalize(&self, id: &ReviewId, files: &[SessionFile]) -> ReviewResult<Option<String>>;
}

/// Percent shown while files transfer. Never reaches 100 before finalize succeeds.
pub fn upload_percent(
    uploaded_bytes: u64,
    total_bytes: u64,
    uploaded_files: usize,
    total_files: usize,
) -> u8 {
    let percent = if total_bytes > 0 {
        u128::from(uploaded_bytes) * 100 / u128::from(total_bytes)
    } else if total_files > 0 {
        (uploaded_files as u128) * 100 / (total_files as u128)
    } else {
        0
    };
    percent.min(99) as u8
}

/// Resets an orchestrator from another task.
#[derive(Clone)]
pub struct ResetHandle {
    state: Arc<watch::Sender<UploadSnapshot>>,
}

impl ResetHandle {
    pub fn reset(&self) {
        reset_state(&self.state);
    }
}

fn reset_state(state: &watch::Sender<UploadSnapshot>) -> u64 {
    let mut attempt = 0;
    state.send_modify(|snapshot| {
        attempt = snapshot.attempt + 1;
        *snapshot = UploadSnapshot::idle(attempt);
    });
    attempt
}

/// Why an attempt stopped early.
enum Halt {
    Superseded,
    Failed(ReviewError),
}

impl From<ReviewError> for Halt {
    fn from(err: ReviewError) -> Self {
        Halt::Failed(err)
    }
}

impl From<ExtractError> for Halt {
    fn from(err: ExtractError) -> Self {
        Halt::Failed(err.into())
    }
}

pub struct UploadOrchestrator<A> {
    api: A,
    limits: UploadLimits,
    state: Arc<watch::Sender<UploadSnapshot>>,
}

impl<A: UploadApi> UploadOrchestrator<A> {
    /// `limits` are the client-side limits checked during extraction.
    pub fn new(api: A, limits: UploadLimits) -> Self {
        let (tx, _rx) = watch::channel(UploadSnapshot::idle(0));
        Self {
            api,
            limits,
            state: Arc::new(tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadSnapshot> {
        self.state.subscribe()
    }

    pub fn reset_handle(&self) -> ResetHandle {
        ResetHandle {
            state: Arc::clone(&self.state),
        }
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        self.state.borrow().clone()
    }

    /// Returns to `Idle` and abandons whatever attempt was running.
    pub fn reset(&self) {
        reset_state(&self.state);
    }

    /// Starts a new attempt for `file_name` and runs it to a terminal state.
    ///
    /// Returns the final snapshot of this attempt, or the current snapshot if the attempt was
    /// superseded by a reset while it ran.
    pub async fn select_file(&self, file_name: &str, archive: Bytes) -> UploadSnapshot {
        let attempt = reset_state(&self.state);
        self.update(attempt, |s| s.file_name = Some(file_name.to_string()));

        match self.run(attempt, file_name, &archive).await {
            Ok(location) => {
                self.update(attempt, |s| {
                    s.phase = UploadPhase::Success;
                    s.review_location = Some(location);
                    s.progress.label = "Upload complete".into();
                    s.progress.percent = 100;
                    s.progress.detail = format!("{} files ready for review", s.progress.total_files);
                });
            }
            Err(Halt::Failed(err)) => {
                tracing::warn!(attempt, error = %err, "upload failed");
                self.update(attempt, |s| {
                    s.phase = UploadPhase::Error;
                    s.error = Some(err.user_message());
                    s.error_kind = Some(err.kind());
                });
            }
            Err(Halt::Superseded) => {
                tracing::debug!(attempt, "upload attempt superseded");
            }
        }
        self.snapshot()
    }

    /// Applies `change` only while `attempt` is still the current one.
    fn update(&self, attempt: u64, change: impl FnOnce(&mut UploadSnapshot)) -> bool {
        self.state.send_if_modified(|snapshot| {
            if snapshot.attempt != attempt {
                return false;
            }
            change(snapshot);
            true
        })
    }

    fn ensure_current(&self, attempt: u64) -> Result<(), Halt> {
        if self.state.borrow().attempt == attempt {
            Ok(())
        } else {
            Err(Halt::Superseded)
        }
    }

    async fn run(&self, attempt: u64, file_name: &str, archive: &Bytes) -> Result<String, Halt> {
        archive::precheck(file_name, archive.len() as u64, &self.limits)?;

        self.update(attempt, |s| {
            s.phase = UploadPhase::Extracting;
            s.progress.label = "Extracting ZIP…".into();
            s.progress.percent = 12;
            s.progress.detail = "This usually takes a few seconds.".into();
        });
        let extracted = extract_blocking(archive.clone(), self.limits).await;
        self.ensure_current(attempt)?;
        let extracted = extracted?;

        let total_files = extracted.files.len();
        let total_bytes = extracted.total_bytes;
        self.update(attempt, |s| {
            s.phase = UploadPhase::Uploading;
            s.progress = UploadProgress {
                label: "Preparing upload…".into(),
                percent: 18,
                detail: format!("{total_files} files • {}", format_bytes(total_bytes)),
                uploaded_files: 0,
                total_files,
                uploaded_bytes: 0,
                total_bytes,
            };
        });

        let grant = self.api.create_session(file_name).await;
        self.ensure_current(attempt)?;
        let grant = grant?;
        if let Some(limits) = &grant.limits {
            check_against(&extracted, limits)?;
        }

        let mut uploaded_bytes = 0u64;
        for (index, file) in extracted.files.iter().enumerate() {
            let url = self
                .api
                .sign_write(&grant.identifier, &file.path, file.content_type)
                .await;
            self.ensure_current(attempt)?;
            let url = url?;

            let sent = self.api.transfer(&url, file).await;
            self.ensure_current(attempt)?;
            sent?;

            uploaded_bytes += file.byte_size();
            let uploaded_files = index + 1;
            self.update(attempt, |s| {
                s.progress.label = "Uploading files…".into();
                s.progress.percent =
                    upload_percent(uploaded_bytes, total_bytes, uploaded_files, total_files);
                s.progress.detail = format!("{uploaded_files} of {total_files} files uploaded");
                s.progress.uploaded_files = uploaded_files;
                s.progress.uploaded_bytes = uploaded_bytes;
            });
        }

        self.update(attempt, |s| {
            s.phase = UploadPhase::Finalizing;
            s.progress.label = "Finalizing…".into();
        });
        let location = self.api.finalize(&grant.identifier, &extracted.manifest()).await;
        self.ensure_current(attempt)?;

        Ok(location?.unwrap_or(grant.review_location))
    }
}

/// Decompression is CPU-bound, so it runs on the blocking pool.
async fn extract_blocking(
    archive: Bytes,
    limits: UploadLimits,
) -> Result<ExtractedArchive, ExtractError> {
    tokio::task::spawn_blocking(move || archive::extract(&archive, &limits))
        .await
        .unwrap_or_else(|err| Err(ExtractError::Unreadable(err.to_string())))
}

/// Re-checks an extracted archive against limits announced by the server.
fn check_against(extracted: &ExtractedArchive, limits: &UploadLimits) -> Result<(), Halt> {
    if let Some(file) = extracted
        .files
        .iter()
        .find(|file| file.byte_size() > limits.max_file_size())
    {
        return Err(ExtractError::FileTooLarge {
            path: file.path.to_string(),
            limit: limits.max_file_size(),
        }
        .into());
    }
    if extracted.total_bytes > limits.max_total_size() {
        return Err(ExtractError::TotalTooLarge {
            limit: limits.max_total_size(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::build_zip;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct Recorded {
        created: Vec<String>,
        signed: Vec<(String, String)>,
        transferred: Vec<String>,
        finalized: Vec<SessionFile>,
    }

    #[derive(Default)]
    struct MockApi {
        calls: Mutex<Recorded>,
        fail_transfer_of: Option<String>,
        fail_finalize: bool,
        server_limits: Option<UploadLimits>,
        final_location: Option<String>,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl UploadApi for MockApi {
        async fn create_session(&self, zip_name: &str) -> ReviewResult<SessionGrant> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.calls.lock().unwrap().created.push(zip_name.to_string());
            Ok(SessionGrant {
                identifier: ReviewId::parse("abcdef123456").unwrap(),
                review_location: "http://localhost/r/abcdef123456/review.html".into(),
                limits: self.server_limits,
            })
        }

        async fn sign_write(
            &self,
            id: &ReviewId,
            path: &RelativePath,
            content_type: &str,
        ) -> ReviewResult<String> {
            self.calls
                .lock()
                .unwrap()
                .signed
                .push((path.to_string(), content_type.to_string()));
            Ok(format!("http://localhost/objects/{id}/{path}"))
        }

        async fn transfer(&self, _url: &str, file: &FileEntry) -> ReviewResult<()> {
            if self.fail_transfer_of.as_deref() == Some(file.path.as_str()) {
                return Err(ReviewError::Transfer("A file failed to upload".into()));
            }
            self.calls.lock().unwrap().transferred.push(file.path.to_string());
            Ok(())
        }

        async fn finalize(
            &self,
            _id: &ReviewId,
            files: &[SessionFile],
        ) -> ReviewResult<Option<String>> {
            if self.fail_finalize {
                return Err(ReviewError::Transfer("Unable to finalize upload".into()));
            }
            self.calls.lock().unwrap().finalized = files.to_vec();
            Ok(self.final_location.clone())
        }
    }

    fn banner_zip() -> Bytes {
        Bytes::from(build_zip(&[
            ("300x250/index.html", "<html>300</html>"),
            ("300x250/app.js", "var a = 1;"),
            ("728x90/index.html", "<html>728</html>"),
        ]))
    }

    #[tokio::test]
    async fn test_successful_upload() {
        let api = MockApi {
            final_location: Some("https://review.example.com/r/abcdef123456/review.html".into()),
            ..Default::default()
        };
        let orchestrator = UploadOrchestrator::new(api, UploadLimits::default());

        let snapshot = orchestrator.select_file("banners.zip", banner_zip()).await;

        assert_eq!(snapshot.phase, UploadPhase::Success);
        assert_eq!(
            snapshot.review_location.as_deref(),
            Some("https://review.example.com/r/abcdef123456/review.html")
        );
        assert_eq!(snapshot.progress.percent, 100);
        assert_eq!(snapshot.progress.uploaded_files, 3);
        assert_eq!(snapshot.progress.detail, "3 files ready for review");
        assert_eq!(snapshot.file_name.as_deref(), Some("banners.zip"));

        let calls = orchestrator.api.calls.lock().unwrap();
        assert_eq!(calls.created, vec!["banners.zip"]);
        assert_eq!(
            calls.signed[1],
            ("300x250/app.js".to_string(), "application/javascript".to_string())
        );
        assert_eq!(calls.transferred.len(), 3);
        assert_eq!(calls.finalized.len(), 3);
        assert_eq!(calls.finalized[0].byte_size, 16);
    }

    #[tokio::test]
    async fn test_falls_back_to_granted_location() {
        let orchestrator = UploadOrchestrator::new(MockApi::default(), UploadLimits::default());
        let snapshot = orchestrator.select_file("banners.zip", banner_zip()).await;
        assert_eq!(
            snapshot.review_location.as_deref(),
            Some("http://localhost/r/abcdef123456/review.html")
        );
    }

    #[tokio::test]
    async fn test_precheck_failures_never_reach_the_server() {
        let orchestrator = UploadOrchestrator::new(MockApi::default(), UploadLimits::default());

        let snapshot = orchestrator.select_file("banners.rar", banner_zip()).await;
        assert_eq!(snapshot.phase, UploadPhase::Error);
        assert_eq!(snapshot.error.as_deref(), Some("Please upload a .zip file."));
        assert_eq!(snapshot.error_kind, Some(ErrorKind::Archive));

        let snapshot = orchestrator
            .select_file("broken.zip", Bytes::from_static(b"nope"))
            .await;
        assert_eq!(snapshot.error.as_deref(), Some("Unable to read this ZIP file"));

        assert!(orchestrator.api.calls.lock().unwrap().created.is_empty());
    }

    #[tokio::test]
    async fn test_first_transfer_failure_stops_the_upload() {
        let api = MockApi {
            fail_transfer_of: Some("300x250/app.js".into()),
            ..Default::default()
        };
        let orchestrator = UploadOrchestrator::new(api, UploadLimits::default());

        let snapshot = orchestrator.select_file("banners.zip", banner_zip()).await;

        assert_eq!(snapshot.phase, UploadPhase::Error);
        assert_eq!(snapshot.error.as_deref(), Some("A file failed to upload"));
        assert_eq!(snapshot.error_kind, Some(ErrorKind::Transfer));
        assert_eq!(snapshot.progress.uploaded_files, 1);
        let calls = orchestrator.api.calls.lock().unwrap();
        assert_eq!(calls.transferred, vec!["300x250/index.html"]);
        assert!(calls.finalized.is_empty());
    }

    #[tokio::test]
    async fn test_finalize_failure() {
        let api = MockApi {
            fail_finalize: true,
            ..Default::default()
        };
        let orchestrator = UploadOrchestrator::new(api, UploadLimits::default());
        let snapshot = orchestrator.select_file("banners.zip", banner_zip()).await;
        assert_eq!(snapshot.phase, UploadPhase::Error);
        assert_eq!(snapshot.error.as_deref(), Some("Unable to finalize upload"));
        assert!(snapshot.review_location.is_none());
    }

    #[tokio::test]
    async fn test_server_limits_are_rechecked_before_transfer() {
        let api = MockApi {
            server_limits: Some(UploadLimits::new(12, 100).unwrap()),
            ..Default::default()
        };
        let orchestrator = UploadOrchestrator::new(api, UploadLimits::default());

        let snapshot = orchestrator.select_file("banners.zip", banner_zip()).await;

        assert_eq!(snapshot.error_kind, Some(ErrorKind::LimitExceeded));
        assert!(orchestrator.api.calls.lock().unwrap().signed.is_empty());
    }

    #[tokio::test]
    async fn test_progress_is_published_in_order() {
        let orchestrator = UploadOrchestrator::new(MockApi::default(), UploadLimits::default());
        let mut rx = orchestrator.subscribe();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let collector = {
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let snapshot = rx.borrow_and_update().clone();
                    let terminal = snapshot.phase.is_terminal();
                    seen.lock().unwrap().push(snapshot.progress.percent);
                    if terminal {
                        break;
                    }
                }
            })
        };

        orchestrator.select_file("banners.zip", banner_zip()).await;
        collector.await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.iter().all(|p| *p <= 100));
    }

    #[tokio::test]
    async fn test_reset_discards_in_flight_attempt() {
        let gate = Arc::new(Notify::new());
        let api = MockApi {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        };
        let orchestrator = Arc::new(UploadOrchestrator::new(api, UploadLimits::default()));
        let reset = orchestrator.reset_handle();
        let mut rx = orchestrator.subscribe();

        let running = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.select_file("banners.zip", banner_zip()).await })
        };

        rx.wait_for(|s| s.phase == UploadPhase::Uploading).await.unwrap();
        reset.reset();
        gate.notify_one();

        let snapshot = running.await.unwrap();
        assert_eq!(snapshot.phase, UploadPhase::Idle);
        assert_eq!(snapshot.attempt, 2);
        assert!(snapshot.file_name.is_none());
        assert!(orchestrator.api.calls.lock().unwrap().signed.is_empty());
    }

    #[tokio::test]
    async fn test_new_selection_clears_previous_result() {
        let orchestrator = UploadOrchestrator::new(MockApi::default(), UploadLimits::default());
        let failed = orchestrator.select_file("banners.txt", banner_zip()).await;
        assert_eq!(failed.phase, UploadPhase::Error);

        let ok = orchestrator.select_file("banners.zip", banner_zip()).await;
        assert_eq!(ok.phase, UploadPhase::Success);
        assert!(ok.error.is_none());
        assert!(ok.attempt > failed.attempt);
    }

    #[tokio::test]
    async fn test_extract_blocking_matches_inline_extraction() {
        let limits = UploadLimits::default();
        let archive = banner_zip();

        let inline = archive::extract(&archive, &limits).unwrap();
        let pooled = extract_blocking(archive, limits).await.unwrap();
        assert_eq!(pooled.total_bytes, inline.total_bytes);
        assert_eq!(pooled.manifest(), inline.manifest());

        let err = extract_blocking(Bytes::from_static(b"nope"), limits)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Unreadable(_)));
    }

    #[test]
    fn test_upload_percent() {
        assert_eq!(upload_percent(0, 100, 0, 3), 0);
        assert_eq!(upload_percent(50, 100, 1, 3), 50);
        assert_eq!(upload_percent(999, 1000, 2, 3), 99);
        assert_eq!(upload_percent(1000, 1000, 3, 3), 99);
        assert_eq!(upload_percent(0, 0, 1, 2), 50);
        assert_eq!(upload_percent(0, 0, 2, 2), 99);
        assert_eq!(upload_percent(0, 0, 0, 0), 0);
    }
}
