// Wire types for the Dify application API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Body of `POST /v1/completion-messages`
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub inputs: Value,
    pub response_mode: String,
    pub user: String,
}

impl CompletionRequest {
    /// Streaming request with the prompt bound to the `query` input variable
    pub fn streaming(query: &str, user: &str) -> Self {
        Self {
            inputs: json!({ "query": query }),
            response_mode: "streaming".to_string(),
            user: user.to_string(),
        }
    }
}

/// File attachment on a chat message
#[derive(Debug, Clone, Serialize)]
pub struct ChatFile {
    #[serde(rename = "type")]
    pub file_type: String,
    pub transfer_method: String,
    pub upload_file_id: String,
}

impl ChatFile {
    /// Image previously stored through the upload endpoint
    pub fn uploaded_image(upload_file_id: impl Into<String>) -> Self {
        Self {
            file_type: "image".to_string(),
            transfer_method: "local_file".to_string(),
            upload_file_id: upload_file_id.into(),
        }
    }
}

/// Body of `POST /v1/chat-messages`
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub inputs: Value,
    pub query: String,
    pub response_mode: String,
    pub conversation_id: String,
    pub user: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<ChatFile>,
}

impl ChatRequest {
    /// Blocking, single-turn request
    pub fn blocking(query: &str, user: &str, files: Vec<ChatFile>) -> Self {
        Self {
            inputs: json!({}),
            query: query.to_string(),
            response_mode: "blocking".to_string(),
            conversation_id: String::new(),
            user: user.to_string(),
            files,
        }
    }
}

/// Response of a blocking chat request (only the fields we read)
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Metadata returned by `POST /v1/files/upload`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Unix timestamp, seconds
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl UploadedFile {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_shape() {
        let body = serde_json::to_value(CompletionRequest::streaming("q", "u")).unwrap();
        assert_eq!(
            body,
            json!({"inputs": {"query": "q"}, "response_mode": "streaming", "user": "u"})
        );
    }

    #[test]
    fn test_chat_request_with_file() {
        let body = serde_json::to_value(ChatRequest::blocking(
            "prompt",
            "u",
            vec![ChatFile::uploaded_image("file-1")],
        ))
        .unwrap();
        assert_eq!(body["response_mode"], "blocking");
        assert_eq!(body["files"][0]["type"], "image");
        assert_eq!(body["files"][0]["transfer_method"], "local_file");
        assert_eq!(body["files"][0]["upload_file_id"], "file-1");
    }

    #[test]
    fn test_chat_request_without_files_omits_field() {
        let body = serde_json::to_value(ChatRequest::blocking("p", "u", vec![])).unwrap();
        assert!(body.get("files").is_none());
    }

    #[test]
    fn test_uploaded_file_timestamp() {
        let file: UploadedFile = serde_json::from_value(json!({
            "id": "abc",
            "name": "page-1.png",
            "size": 1024,
            "extension": "png",
            "mime_type": "image/png",
            "created_at": 1700000000
        }))
        .unwrap();
        assert_eq!(
            file.created_at_utc().unwrap().to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );
    }
}
