//! reqwest-backed [`JobApi`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use clipper_models::{
    rate_limit_message, ClipRequest, CreditsInfo, JobId, ServerErrorBody, SubmitResponse,
};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_DISPOSITION};
use reqwest::{Client, Response, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::api::{JobApi, DEFAULT_CLIP_FILENAME, FINGERPRINT_HEADER, RATE_LIMIT_RESET_HEADER};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::sse::{event_stream, EventStream};

/// HTTP client for the clip job service.
pub struct HttpJobApi {
    http: Client,
    config: ClientConfig,
}

impl HttpJobApi {
    /// Create a new client.
    ///
    /// No overall request timeout is set on the HTTP client since the
    /// progress stream stays open for the whole job; the submission wait is
    /// bounded by the caller.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .user_agent(concat!("clipper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base(), path)
    }

    /// Resolve an absolute or base-relative URL.
    fn resolve(&self, url: &str) -> ClientResult<Url> {
        match Url::parse(url) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(self.config.base())
                .and_then(|base| base.join(url))
                .map_err(|e| ClientError::Protocol(format!("Invalid download URL '{}': {}", url, e))),
            Err(e) => Err(ClientError::Protocol(format!(
                "Invalid download URL '{}': {}",
                url, e
            ))),
        }
    }
}

/// Map a non-2xx response to the matching error.
async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let reset = response
            .headers()
            .get(RATE_LIMIT_RESET_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        warn!("Rate limited by server (reset: {:?})", reset);
        return Err(ClientError::RateLimited(rate_limit_message(
            reset.as_deref(),
            Utc::now(),
        )));
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ServerErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| format!("Server error: {}", status.as_u16()));

    warn!("Server returned {}: {}", status, message);
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl JobApi for HttpJobApi {
    async fn submit(&self, request: &ClipRequest) -> ClientResult<JobId> {
        let url = self.endpoint("/api/submit");
        debug!("Submitting clip request to {}", url);

        let response = self
            .http
            .post(&url)
            .header(FINGERPRINT_HEADER, self.config.fingerprint.as_str())
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body = response.text().await?;
        let submitted: SubmitResponse = serde_json::from_str(&body).unwrap_or_else(|e| {
            warn!("Unreadable submission response: {}", e);
            SubmitResponse::default()
        });

        let job = submitted
            .into_job_id()
            .map_err(|message| ClientError::Protocol(message.to_string()))?;
        info!("Job submitted: {}", job);
        Ok(job)
    }

    async fn open_progress(&self, job: &JobId) -> ClientResult<EventStream> {
        let url = self.endpoint(&format!(
            "/api/progress/{}",
            urlencoding::encode(job.as_str())
        ));
        debug!("Opening progress stream {}", url);

        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "text/event-stream")
            .header(FINGERPRINT_HEADER, self.config.fingerprint.as_str())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Stream(format!(
                "progress stream returned {}",
                response.status()
            )));
        }

        Ok(event_stream(response.bytes_stream()))
    }

    async fn cancel(&self, job: &JobId, reason: &str) -> ClientResult<()> {
        let url = self.endpoint(&format!(
            "/api/cancel/{}?reason={}",
            urlencoding::encode(job.as_str()),
            urlencoding::encode(reason)
        ));

        let response = self
            .http
            .get(&url)
            .header(FINGERPRINT_HEADER, self.config.fingerprint.as_str())
            .send()
            .await?;
        check_status(response).await?;

        info!("Cancelled job {} ({})", job, reason);
        Ok(())
    }

    async fn credits(&self) -> ClientResult<CreditsInfo> {
        let response = self
            .http
            .get(self.endpoint("/api/credits"))
            .header(FINGERPRINT_HEADER, self.config.fingerprint.as_str())
            .send()
            .await?;
        let response = check_status(response).await?;

        Ok(response.json().await?)
    }

    async fn download(&self, url: &str, filename: Option<&str>) -> ClientResult<PathBuf> {
        let url = self.resolve(url)?;
        debug!("Downloading clip from {}", url);

        let response = self.http.get(url.clone()).send().await?;
        let response = check_status(response).await?;

        let name = filename
            .and_then(sanitize_filename)
            .or_else(|| {
                response
                    .headers()
                    .get(CONTENT_DISPOSITION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(filename_from_content_disposition)
            })
            .or_else(|| filename_from_url(&url))
            .unwrap_or_else(|| DEFAULT_CLIP_FILENAME.to_string());

        let dir = &self.config.download_dir;
        tokio::fs::create_dir_all(dir).await?;
        let target = dir.join(&name);
        let mut part = PartFile::new(dir.join(format!("{}.part", name)));

        write_body(response, &part.path).await?;
        tokio::fs::rename(&part.path, &target).await?;
        part.persisted = true;

        info!("Saved clip to {}", target.display());
        Ok(target)
    }
}

/// A download in progress. Removed on drop unless moved into place, so an
/// error or a dropped download future leaves nothing behind.
struct PartFile {
    path: PathBuf,
    persisted: bool,
}

impl PartFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            persisted: false,
        }
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.persisted {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not remove {}: {}", self.path.display(), e);
                }
            }
        }
    }
}

async fn write_body(response: Response, path: &Path) -> ClientResult<()> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut body = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    debug!("Wrote {} bytes to {}", written, path.display());
    Ok(())
}

/// Reduce a suggested name to a bare file name.
fn sanitize_filename(name: &str) -> Option<String> {
    let name = Path::new(name.trim()).file_name()?.to_str()?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

/// `filename*=UTF-8''...` wins over `filename="..."`.
fn filename_from_content_disposition(header: &str) -> Option<String> {
    let mut plain = None;

    for param in header.split(';').map(str::trim) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = value.trim().rsplit("''").next().unwrap_or_default();
                if let Some(name) = urlencoding::decode(encoded)
                    .ok()
                    .and_then(|decoded| sanitize_filename(&decoded))
                {
                    return Some(name);
                }
            }
            "filename" => plain = sanitize_filename(value.trim().trim_matches('"')),
            _ => {}
        }
    }

    plain
}

fn filename_from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = urlencoding::decode(segment).ok()?;
    sanitize_filename(&decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("clip.mp4").as_deref(), Some("clip.mp4"));
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename(".."), None);
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="my clip.mp4""#).as_deref(),
            Some("my clip.mp4")
        );
        assert_eq!(
            filename_from_content_disposition(
                r#"attachment; filename="fallback.mp4"; filename*=UTF-8''caf%C3%A9.mp4"#
            )
            .as_deref(),
            Some("café.mp4")
        );
        assert_eq!(filename_from_content_disposition("inline"), None);
    }

    #[test]
    fn test_filename_from_url() {
        let url = Url::parse("http://host/f/abc%20def.mp4?token=1").unwrap();
        assert_eq!(filename_from_url(&url).as_deref(), Some("abc def.mp4"));

        let root = Url::parse("http://host/").unwrap();
        assert_eq!(filename_from_url(&root), None);
    }

    #[test]
    fn test_part_file_removed_unless_persisted() {
        let dir = tempfile::tempdir().unwrap();

        let dropped = dir.path().join("a.mp4.part");
        std::fs::write(&dropped, b"partial").unwrap();
        drop(PartFile::new(dropped.clone()));
        assert!(!dropped.exists());

        let kept = dir.path().join("b.mp4.part");
        std::fs::write(&kept, b"done").unwrap();
        let mut part = PartFile::new(kept.clone());
        part.persisted = true;
        drop(part);
        assert!(kept.exists());
    }

    #[test]
    fn test_resolve_relative_url() {
        let api = HttpJobApi::new(ClientConfig {
            base_url: "http://localhost:9000/".to_string(),
            ..ClientConfig::default()
        })
        .unwrap();

        assert_eq!(
            api.resolve("/f/abc.mp4").unwrap().as_str(),
            "http://localhost:9000/f/abc.mp4"
        );
        assert_eq!(
            api.resolve("https://cdn.example.com/x.mp4").unwrap().as_str(),
            "https://cdn.example.com/x.mp4"
        );
    }
}
