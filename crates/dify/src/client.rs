// HTTP client for Dify-compatible APIs

use std::path::Path;
use std::time::Instant;

use futures::StreamExt;
use reqwest::multipart;
use reqwest::{Client, Response};
use tracing::{debug, instrument};

use crate::config::ApiConfig;
use crate::error::ClientError;
use crate::frame::{AnswerBuffer, FrameDecoder};
use crate::types::{ChatFile, ChatRequest, ChatResponse, CompletionRequest, UploadedFile};

const COMPLETION_PATH: &str = "/v1/completion-messages";
const CHAT_PATH: &str = "/v1/chat-messages";
const UPLOAD_PATH: &str = "/v1/files/upload";

/// Client shared by every item of a job.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct DifyClient {
    http: Client,
    config: ApiConfig,
}

impl std::fmt::Debug for DifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DifyClient")
            .field("config", &self.config)
            .finish()
    }
}

impl DifyClient {
    pub fn new(config: ApiConfig) -> Result<Self, ClientError> {
        config
            .validate()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Streaming completion; returns the concatenated, trimmed answer.
    ///
    /// The whole call is bounded by `request_timeout` and each read by
    /// `idle_timeout`. Malformed frames are skipped; an `error` event fails
    /// the call.
    #[instrument(skip_all, fields(endpoint = COMPLETION_PATH))]
    pub async fn completion_stream(&self, query: &str) -> Result<String, ClientError> {
        let budget = self.config.request_timeout;
        tokio::time::timeout(budget, self.completion_stream_inner(query))
            .await
            .map_err(|_| ClientError::Timeout(budget))?
    }

    async fn completion_stream_inner(&self, query: &str) -> Result<String, ClientError> {
        let started = Instant::now();
        let request = CompletionRequest::streaming(query, &self.config.user);

        let response = self
            .http
            .post(self.config.endpoint(COMPLETION_PATH))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let idle = self.config.idle_timeout;
        let mut stream = response.bytes_stream();
        let mut decoder = FrameDecoder::new();
        let mut answer = AnswerBuffer::new();
        let mut chunks = 0usize;

        loop {
            let next = tokio::time::timeout(idle, stream.next())
                .await
                .map_err(|_| ClientError::Idle(idle))?;

            let Some(chunk) = next else { break };
            let chunk = chunk?;
            chunks += 1;

            for frame in decoder.push(&chunk) {
                answer.apply(frame)?;
            }
        }

        if let Some(frame) = decoder.finish() {
            answer.apply(frame)?;
        }

        debug!(
            chunks,
            frames = answer.frames(),
            malformed = decoder.malformed(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Stream complete"
        );

        Ok(answer.finish())
    }

    /// Blocking chat message with optional uploaded-file attachments
    #[instrument(skip_all, fields(endpoint = CHAT_PATH, files = files.len()))]
    pub async fn chat_blocking(
        &self,
        query: &str,
        files: Vec<ChatFile>,
    ) -> Result<String, ClientError> {
        let request = ChatRequest::blocking(query, &self.config.user, files);

        let response = self
            .http
            .post(self.config.endpoint(CHAT_PATH))
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.request_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_timeout(e))?;
        let response = check_status(response).await?;

        let body: ChatResponse = response.json().await.map_err(|e| self.map_timeout(e))?;
        Ok(body.answer.trim().to_string())
    }

    /// Multipart upload of a local file to the API's file store
    #[instrument(skip_all, fields(endpoint = UPLOAD_PATH, path = %path.display()))]
    pub async fn upload_file(&self, path: &Path) -> Result<UploadedFile, ClientError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let mime = detect_mime(path, &bytes);
        debug!(mime, size = bytes.len(), "Uploading file");

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| ClientError::Config(format!("Invalid MIME type: {}", e)))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("user", self.config.user.clone());

        let response = self
            .http
            .post(self.config.endpoint(UPLOAD_PATH))
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.request_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_timeout(e))?;
        let response = check_status(response).await?;

        response.json().await.map_err(|e| self.map_timeout(e))
    }

    fn map_timeout(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.config.request_timeout)
        } else {
            ClientError::Http(err)
        }
    }
}

/// Turn a non-2xx status into `ClientError::Api`, keeping the body text
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(ClientError::api(status.as_u16(), message.trim()))
}

/// MIME type from the file's magic bytes, else from its extension
fn detect_mime(path: &Path, bytes: &[u8]) -> &'static str {
    match infer::get(bytes) {
        Some(kind) => kind.mime_type(),
        None => mime_from_extension(path),
    }
}

fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];

    #[test]
    fn test_detect_mime_prefers_content() {
        assert_eq!(detect_mime(Path::new("page-1.bin"), PNG_HEADER), "image/png");
        assert_eq!(
            detect_mime(Path::new("page-1.png"), b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n"),
            "application/pdf"
        );
    }

    #[test]
    fn test_detect_mime_falls_back_to_extension() {
        assert_eq!(detect_mime(Path::new("a/page-1.png"), b""), "image/png");
        assert_eq!(detect_mime(Path::new("scan.JPEG"), b""), "image/jpeg");
        assert_eq!(detect_mime(Path::new("scan.tiff"), b""), "image/tiff");
        assert_eq!(detect_mime(Path::new("scan.bmp"), b""), "image/bmp");
        assert_eq!(detect_mime(Path::new("noext"), b"plain words"), "application/octet-stream");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = DifyClient::new(ApiConfig::new("")).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
