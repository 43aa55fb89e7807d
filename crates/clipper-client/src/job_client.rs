//! Clip job lifecycle.
//!
//! [`ClipJobClient`] validates a request, submits it, owns the single
//! progress stream for the current job and drives a [`ProgressView`] through
//! the job's events until a terminal outcome.
//!
//! State machine:
//!
//! ```text
//! Idle --submit--> Loading --complete (+delay)--> Idle
//!                     |
//!                     +--validation / submit / stream failure--> Error --delay--> Idle
//! ```
//!
//! A submit while a job is active closes the previous stream first; at most
//! one stream is ever open.

use std::path::PathBuf;
use std::time::Duration;

use clipper_models::{display_title, ClipRequest, JobId, ProgressEvent, RawForm};
use futures_util::StreamExt;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::JobApi;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, STREAM_INTERRUPTED};
use crate::sse::EventStream;
use crate::view::{ProgressView, UiState};

pub const STATUS_SUBMITTING: &str = "Getting video information...";
pub const STATUS_CONNECTED: &str = "Connected to server...";
pub const STATUS_PROCESSING: &str = "Processing video...";
pub const STATUS_DOWNLOAD_STARTING: &str = "Download starting...";
pub const STATUS_CANCELLING: &str = "Cancelling...";
pub const STATUS_CANCELLED: &str = "Download cancelled";
pub const STATUS_CANCEL_FAILED: &str = "Error cancelling operation";

/// How the current job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Clip finished; `saved` is the local file when a download succeeded.
    Completed { saved: Option<PathBuf> },
    /// Server error or lost connection, with the message shown.
    Failed(String),
    Cancelled,
}

/// Result of dispatching one stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Continue,
    Finished(JobOutcome),
    /// No job is active; the event was dropped.
    Ignored,
}

/// Drives one job at a time against a [`JobApi`].
pub struct ClipJobClient<A, V> {
    api: A,
    view: V,
    config: ClientConfig,
    state: UiState,
    job: Option<JobId>,
    stream: Option<EventStream>,
    revert_at: Option<Instant>,
}

impl<A: JobApi, V: ProgressView> ClipJobClient<A, V> {
    pub fn new(api: A, view: V, config: ClientConfig) -> Self {
        Self {
            api,
            view,
            config,
            state: UiState::Idle,
            job: None,
            stream: None,
            revert_at: None,
        }
    }

    pub fn state(&self) -> UiState {
        self.state
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job.as_ref()
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// When the UI is due to fall back to idle, if scheduled.
    pub fn revert_at(&self) -> Option<Instant> {
        self.revert_at
    }

    /// Validate and submit a clip, then open its progress stream.
    ///
    /// Any job already in flight is dropped before anything else happens.
    pub async fn submit(&mut self, form: &RawForm) -> ClientResult<JobId> {
        if self.close_stream() {
            info!("Superseding previous job {:?}", self.job);
        }
        self.job = None;
        self.revert_at = None;

        let request = match ClipRequest::from_form(form) {
            Ok(request) => request,
            Err(e) => {
                debug!("Rejected clip request: {}", e);
                return Err(self.fail(e.into()));
            }
        };

        self.set_state(UiState::Loading);
        self.view.set_progress(0);
        self.view.set_status(STATUS_SUBMITTING);

        let wait = self.config.submit_timeout;
        let job = match tokio::time::timeout(wait, self.api.submit(&request)).await {
            Ok(Ok(job)) => job,
            Ok(Err(e)) => return Err(self.fail(e)),
            Err(_) => {
                warn!("Submission timed out after {:?}", wait);
                return Err(self.fail(ClientError::Timeout(wait.as_secs())));
            }
        };

        self.close_stream();
        self.job = Some(job.clone());

        match self.api.open_progress(&job).await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.handle_stream_event(ProgressEvent::Open).await;
                Ok(job)
            }
            Err(e) => {
                warn!("Could not open progress stream for {}: {}", job, e);
                self.handle_stream_failure();
                Err(e)
            }
        }
    }

    /// Wait for the next actionable event on the open stream.
    ///
    /// Malformed payloads and unknown events are skipped. A transport error
    /// or an end of stream yields [`ProgressEvent::StreamError`]. Returns
    /// `None` when no stream is open.
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        loop {
            let stream = self.stream.as_mut()?;

            let frame = match stream.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    warn!("Progress stream failed: {}", e);
                    return Some(ProgressEvent::StreamError);
                }
                None => {
                    warn!("Progress stream ended before the job finished");
                    return Some(ProgressEvent::StreamError);
                }
            };

            match ProgressEvent::parse(&frame.event, &frame.data) {
                Ok(Some(event)) => return Some(event),
                Ok(None) => debug!("Ignoring '{}' event", frame.event),
                Err(e) => warn!("{}", e),
            }
        }
    }

    /// Apply one stream event to the job and the view.
    pub async fn handle_stream_event(&mut self, event: ProgressEvent) -> Dispatch {
        if self.job.is_none() {
            debug!("No active job, dropping {:?}", event);
            return Dispatch::Ignored;
        }

        match event {
            ProgressEvent::Open => {
                self.view.set_status(STATUS_CONNECTED);
                Dispatch::Continue
            }
            ProgressEvent::Title(title) => {
                self.view
                    .set_status(&format!("Processing: {}", display_title(&title)));
                Dispatch::Continue
            }
            ProgressEvent::Progress(value) => {
                self.view.set_progress(value.clamp(0, 100) as u8);
                self.view.set_status(STATUS_PROCESSING);
                Dispatch::Continue
            }
            ProgressEvent::Complete(payload) => {
                self.view.set_progress(100);
                self.view.set_status(STATUS_DOWNLOAD_STARTING);
                self.close_stream();
                let job = self.job.take();
                info!("Job {:?} complete", job);

                let mut saved = None;
                if let Some(url) = payload.download_url.as_deref() {
                    match self.api.download(url, payload.filename.as_deref()).await {
                        Ok(path) => {
                            self.view.download_saved(&path);
                            saved = Some(path);
                        }
                        Err(e) => {
                            warn!("Download of {} failed: {}", url, e);
                            self.view
                                .set_status(&format!("Download failed: {}", e.user_message()));
                        }
                    }
                }

                self.schedule_revert(self.config.complete_delay);
                Dispatch::Finished(JobOutcome::Completed { saved })
            }
            ProgressEvent::ServerError(message) => {
                self.close_stream();
                self.job = None;
                self.show_failure(&message, self.config.error_delay);
                Dispatch::Finished(JobOutcome::Failed(message))
            }
            ProgressEvent::StreamError => {
                if self.handle_stream_failure() {
                    Dispatch::Finished(JobOutcome::Failed(STREAM_INTERRUPTED.to_string()))
                } else {
                    Dispatch::Ignored
                }
            }
        }
    }

    /// Pump the stream until the current job reaches a terminal event.
    pub async fn track(&mut self) -> Option<JobOutcome> {
        while let Some(event) = self.next_event().await {
            if let Dispatch::Finished(outcome) = self.handle_stream_event(event).await {
                return Some(outcome);
            }
        }
        None
    }

    /// Cancel the current job. Returns `false` when nothing was running.
    ///
    /// The job and its stream are only dropped once the server accepts the
    /// cancellation. On refusal the job keeps running and stays tracked.
    pub async fn cancel(&mut self, reason: &str) -> ClientResult<bool> {
        let Some(job) = self.job.clone() else {
            return Ok(false);
        };

        info!("Cancelling job {} ({})", job, reason);
        self.view.set_status(STATUS_CANCELLING);

        if let Err(e) = self.api.cancel(&job, reason).await {
            warn!("Cancel of {} failed: {}", job, e);
            self.view.show_error(STATUS_CANCEL_FAILED);
            self.view.set_status(STATUS_CANCEL_FAILED);
            return Err(e);
        }

        self.close_stream();
        self.job = None;
        self.view.set_status(STATUS_CANCELLED);
        self.schedule_revert(self.config.cancel_delay);
        Ok(true)
    }

    /// Drop the open stream, if any. Returns whether one was open.
    pub fn close_stream(&mut self) -> bool {
        match self.stream.take() {
            Some(_) => {
                debug!("Closed progress stream");
                true
            }
            None => false,
        }
    }

    /// Return to idle if the scheduled delay has passed.
    pub fn revert_if_due(&mut self, now: Instant) -> bool {
        match self.revert_at {
            Some(at) if now >= at => {
                self.revert_at = None;
                self.set_state(UiState::Idle);
                true
            }
            _ => false,
        }
    }

    /// Wait out the scheduled delay and return to idle.
    pub async fn settle(&mut self) {
        if let Some(at) = self.revert_at {
            tokio::time::sleep_until(at).await;
            self.revert_if_due(Instant::now());
        }
    }

    /// Close the stream and report the interruption once.
    fn handle_stream_failure(&mut self) -> bool {
        let had_stream = self.close_stream();
        if !had_stream && self.job.is_none() {
            return false;
        }

        self.job = None;
        self.show_failure(STREAM_INTERRUPTED, self.config.error_delay);
        true
    }

    fn fail(&mut self, error: ClientError) -> ClientError {
        let delay = if error.is_rate_limited() {
            self.config.rate_limit_delay
        } else {
            self.config.error_delay
        };
        self.show_failure(&error.user_message(), delay);
        error
    }

    fn show_failure(&mut self, message: &str, delay: Duration) {
        self.view.show_error(message);
        self.view.set_status(message);
        self.set_state(UiState::Error);
        self.schedule_revert(delay);
    }

    fn schedule_revert(&mut self, delay: Duration) {
        self.revert_at = Some(Instant::now() + delay);
    }

    fn set_state(&mut self, state: UiState) {
        if self.state != state {
            self.state = state;
            self.view.state_changed(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use clipper_models::{CreditsInfo, Quality};
    use futures_util::stream;

    use super::*;
    use crate::sse::SseEvent;
    use crate::view::MemoryView;

    #[derive(Clone, Copy)]
    enum SubmitReply {
        Job(&'static str),
        RateLimited,
        Hang,
    }

    struct Counter(Arc<AtomicUsize>);

    impl Drop for Counter {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct FakeApi {
        reply: SubmitReply,
        frames: Mutex<Vec<Vec<(&'static str, &'static str)>>>,
        keep_open: bool,
        refuse_cancel: bool,
        submits: AtomicUsize,
        open_streams: Arc<AtomicUsize>,
        downloads: Mutex<Vec<String>>,
        cancels: Mutex<Vec<(String, String)>>,
    }

    impl FakeApi {
        fn new(reply: SubmitReply) -> Self {
            Self {
                reply,
                frames: Mutex::new(Vec::new()),
                keep_open: false,
                refuse_cancel: false,
                submits: AtomicUsize::new(0),
                open_streams: Arc::new(AtomicUsize::new(0)),
                downloads: Mutex::new(Vec::new()),
                cancels: Mutex::new(Vec::new()),
            }
        }

        fn with_frames(self, frames: Vec<(&'static str, &'static str)>) -> Self {
            self.frames.lock().unwrap().push(frames);
            self
        }

        fn kept_open(mut self) -> Self {
            self.keep_open = true;
            self
        }

        fn refusing_cancel(mut self) -> Self {
            self.refuse_cancel = true;
            self
        }
    }

    #[async_trait]
    impl JobApi for FakeApi {
        async fn submit(&self, _request: &ClipRequest) -> ClientResult<JobId> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                SubmitReply::Job(id) => Ok(JobId::from_string(id)),
                SubmitReply::RateLimited => Err(ClientError::RateLimited(
                    "You've made too many requests. Please try again later.".to_string(),
                )),
                SubmitReply::Hang => std::future::pending::<ClientResult<JobId>>().await,
            }
        }

        async fn open_progress(&self, _job: &JobId) -> ClientResult<EventStream> {
            let frames = {
                let mut scripted = self.frames.lock().unwrap();
                if scripted.is_empty() {
                    Vec::new()
                } else {
                    scripted.remove(0)
                }
            };

            self.open_streams.fetch_add(1, Ordering::SeqCst);
            let guard = Counter(self.open_streams.clone());

            let items: Vec<ClientResult<SseEvent>> = frames
                .into_iter()
                .map(|(event, data)| {
                    Ok(SseEvent {
                        event: event.to_string(),
                        data: data.to_string(),
                        id: None,
                    })
                })
                .collect();

            let events = stream::iter(items).map(move |item| {
                let _held = &guard;
                item
            });

            let stream: EventStream = if self.keep_open {
                Box::pin(events.chain(stream::pending()))
            } else {
                Box::pin(events)
            };
            Ok(stream)
        }

        async fn cancel(&self, job: &JobId, reason: &str) -> ClientResult<()> {
            if self.refuse_cancel {
                return Err(ClientError::Server {
                    status: 500,
                    message: "cannot cancel".to_string(),
                });
            }
            self.cancels
                .lock()
                .unwrap()
                .push((job.to_string(), reason.to_string()));
            Ok(())
        }

        async fn credits(&self) -> ClientResult<CreditsInfo> {
            Ok(CreditsInfo {
                credits_left: 10.0,
                reset_time: None,
            })
        }

        async fn download(&self, url: &str, filename: Option<&str>) -> ClientResult<PathBuf> {
            self.downloads.lock().unwrap().push(url.to_string());
            Ok(PathBuf::from(filename.unwrap_or("video_clip.mp4")))
        }
    }

    fn config() -> ClientConfig {
        ClientConfig {
            complete_delay: Duration::from_millis(20),
            error_delay: Duration::from_millis(20),
            rate_limit_delay: Duration::from_millis(40),
            cancel_delay: Duration::from_millis(10),
            ..ClientConfig::default()
        }
    }

    fn client(api: FakeApi) -> ClipJobClient<FakeApi, MemoryView> {
        ClipJobClient::new(api, MemoryView::new(), config())
    }

    fn valid_form() -> RawForm {
        RawForm::new("https://x/y", "00:01:00", "00:03:30", Quality::P720)
    }

    #[tokio::test]
    async fn test_submit_opens_stream() {
        let mut client = client(FakeApi::new(SubmitReply::Job("abc")).kept_open());

        let job = client.submit(&valid_form()).await.unwrap();

        assert_eq!(job.as_str(), "abc");
        assert_eq!(client.state(), UiState::Loading);
        assert!(client.has_stream());
        assert_eq!(client.view().status, STATUS_CONNECTED);
        assert_eq!(client.view().progress_history, vec![0]);
        assert_eq!(client.api().open_streams.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_form_makes_no_request() {
        let mut client = client(FakeApi::new(SubmitReply::Job("abc")));
        let form = RawForm::new("https://x/y", "00:05:00", "00:04:00", Quality::P720);

        let err = client.submit(&form).await.unwrap_err();

        assert_eq!(err.user_message(), "End time must be after start time");
        assert_eq!(client.api().submits.load(Ordering::SeqCst), 0);
        assert_eq!(client.state(), UiState::Error);
        assert_eq!(
            client.view().error.as_deref(),
            Some("End time must be after start time")
        );

        client.settle().await;
        assert_eq!(client.state(), UiState::Idle);
        assert_eq!(client.view().error, None);
    }

    #[tokio::test]
    async fn test_progress_then_complete() {
        let api = FakeApi::new(SubmitReply::Job("abc")).with_frames(vec![
            ("progress", r#"{"progress":"45"}"#),
            ("complete", r#"{"downloadUrl":"/f/abc.mp4"}"#),
        ]);
        let mut client = client(api);
        client.submit(&valid_form()).await.unwrap();

        let outcome = client.track().await.unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Completed {
                saved: Some(PathBuf::from("video_clip.mp4"))
            }
        );
        assert_eq!(client.view().progress_history, vec![0, 45, 100]);
        assert_eq!(client.view().status, STATUS_DOWNLOAD_STARTING);
        assert_eq!(*client.api().downloads.lock().unwrap(), vec!["/f/abc.mp4"]);
        assert!(!client.has_stream());
        assert_eq!(client.api().open_streams.load(Ordering::SeqCst), 0);

        // Still loading until the completion delay has passed.
        assert_eq!(client.state(), UiState::Loading);
        client.settle().await;
        assert_eq!(client.state(), UiState::Idle);
    }

    #[tokio::test]
    async fn test_progress_is_clamped() {
        let api = FakeApi::new(SubmitReply::Job("abc")).with_frames(vec![
            ("progress", r#"{"progress":-5}"#),
            ("progress", r#"{"progress":150}"#),
            ("complete", "{}"),
        ]);
        let mut client = client(api);
        client.submit(&valid_form()).await.unwrap();
        client.track().await;

        assert_eq!(client.view().progress_history, vec![0, 0, 100, 100]);
        assert!(client.api().downloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payloads_are_skipped() {
        let api = FakeApi::new(SubmitReply::Job("abc")).with_frames(vec![
            ("progress", r#"{"progress":30}"#),
            ("progress", "{oops"),
            ("title", "not json"),
            ("heartbeat", "{}"),
            ("progress", r#"{"progress":60}"#),
            ("complete", "{}"),
        ]);
        let mut client = client(api);
        client.submit(&valid_form()).await.unwrap();
        client.track().await;

        assert_eq!(client.view().progress_history, vec![0, 30, 60, 100]);
        assert!(client.view().error_history.is_empty());
    }

    #[tokio::test]
    async fn test_long_title_is_truncated() {
        let mut client = client(FakeApi::new(SubmitReply::Job("abc")).kept_open());
        client.submit(&valid_form()).await.unwrap();

        let long = "x".repeat(80);
        client
            .handle_stream_event(ProgressEvent::Title(long))
            .await;
        assert_eq!(
            client.view().status,
            format!("Processing: {}...", "x".repeat(50))
        );

        client
            .handle_stream_event(ProgressEvent::Title("Short".to_string()))
            .await;
        assert_eq!(client.view().status, "Processing: Short");
    }

    #[tokio::test]
    async fn test_stream_end_is_interruption() {
        let api = FakeApi::new(SubmitReply::Job("abc"))
            .with_frames(vec![("progress", r#"{"progress":10}"#)]);
        let mut client = client(api);
        client.submit(&valid_form()).await.unwrap();

        let outcome = client.track().await.unwrap();

        assert_eq!(outcome, JobOutcome::Failed(STREAM_INTERRUPTED.to_string()));
        assert_eq!(client.state(), UiState::Error);
        assert_eq!(client.view().status, STREAM_INTERRUPTED);
        client.settle().await;
        assert_eq!(client.state(), UiState::Idle);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut client = client(FakeApi::new(SubmitReply::Job("abc")).kept_open());
        client.submit(&valid_form()).await.unwrap();

        let first = client.handle_stream_event(ProgressEvent::StreamError).await;
        let second = client.handle_stream_event(ProgressEvent::StreamError).await;

        assert!(matches!(first, Dispatch::Finished(_)));
        assert_eq!(second, Dispatch::Ignored);
        assert!(!client.close_stream());
        assert_eq!(client.view().error_history, vec![STREAM_INTERRUPTED]);
    }

    #[tokio::test]
    async fn test_server_error_event() {
        let api = FakeApi::new(SubmitReply::Job("abc"))
            .with_frames(vec![("error", r#"{"message":"Video unavailable"}"#)]);
        let mut client = client(api);
        client.submit(&valid_form()).await.unwrap();

        let outcome = client.track().await.unwrap();

        assert_eq!(outcome, JobOutcome::Failed("Video unavailable".to_string()));
        assert_eq!(client.view().error.as_deref(), Some("Video unavailable"));
        assert!(!client.has_stream());
    }

    #[tokio::test]
    async fn test_new_submit_supersedes_previous_stream() {
        let api = FakeApi::new(SubmitReply::Job("abc")).kept_open();
        let mut client = client(api);

        client.submit(&valid_form()).await.unwrap();
        client.submit(&valid_form()).await.unwrap();

        assert_eq!(client.api().submits.load(Ordering::SeqCst), 2);
        assert_eq!(client.api().open_streams.load(Ordering::SeqCst), 1);
        assert!(client.view().error_history.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_submit() {
        let mut client = client(FakeApi::new(SubmitReply::RateLimited));

        let err = client.submit(&valid_form()).await.unwrap_err();

        assert!(err.is_rate_limited());
        assert!(!client.has_stream());
        assert_eq!(client.api().open_streams.load(Ordering::SeqCst), 0);
        assert_eq!(
            client.view().error.as_deref(),
            Some("You've made too many requests. Please try again later.")
        );

        // Rate-limit errors stay up longer than other errors.
        let remaining = client.revert_at().unwrap() - Instant::now();
        assert!(remaining > Duration::from_millis(20));

        client.settle().await;
        assert_eq!(client.state(), UiState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_timeout() {
        let mut client = ClipJobClient::new(
            FakeApi::new(SubmitReply::Hang),
            MemoryView::new(),
            ClientConfig::default(),
        );

        let err = client.submit(&valid_form()).await.unwrap_err();

        assert!(matches!(err, ClientError::Timeout(30)));
        assert_eq!(client.state(), UiState::Error);
        assert!(!client.has_stream());
    }

    #[tokio::test]
    async fn test_cancel() {
        let mut client = client(FakeApi::new(SubmitReply::Job("abc")).kept_open());

        assert!(!client.cancel("manual").await.unwrap());

        client.submit(&valid_form()).await.unwrap();
        assert!(client.cancel("interrupt").await.unwrap());

        assert!(!client.has_stream());
        assert_eq!(client.view().status, STATUS_CANCELLED);
        assert_eq!(
            *client.api().cancels.lock().unwrap(),
            vec![("abc".to_string(), "interrupt".to_string())]
        );
        client.settle().await;
        assert_eq!(client.state(), UiState::Idle);
    }

    #[tokio::test]
    async fn test_refused_cancel_keeps_job() {
        let api = FakeApi::new(SubmitReply::Job("abc"))
            .kept_open()
            .refusing_cancel();
        let mut client = client(api);
        client.submit(&valid_form()).await.unwrap();

        let err = client.cancel("manual").await.unwrap_err();

        assert_eq!(err.user_message(), "cannot cancel");
        assert_eq!(client.job_id().map(JobId::as_str), Some("abc"));
        assert!(client.has_stream());
        assert_eq!(client.state(), UiState::Loading);
        assert_eq!(client.view().status, STATUS_CANCEL_FAILED);
        assert_eq!(client.view().error.as_deref(), Some(STATUS_CANCEL_FAILED));
        assert!(client.revert_at().is_none());

        // Progress keeps flowing for the still-running job.
        let dispatch = client.handle_stream_event(ProgressEvent::Progress(70)).await;
        assert_eq!(dispatch, Dispatch::Continue);
    }

    #[tokio::test]
    async fn test_events_without_job_are_ignored() {
        let mut client = client(FakeApi::new(SubmitReply::Job("abc")));
        let dispatch = client.handle_stream_event(ProgressEvent::Progress(50)).await;
        assert_eq!(dispatch, Dispatch::Ignored);
        assert!(client.view().progress_history.is_empty());
    }
}
