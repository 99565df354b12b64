// Dify-compatible API client
//
// Three endpoints are used by the batch jobs:
// - POST /v1/completion-messages (streaming, `data: {json}` frames)
// - POST /v1/chat-messages (blocking, single JSON object with `answer`)
// - POST /v1/files/upload (multipart)
//
// Every call is bounded by timeouts from ApiConfig; a hung server becomes a
// ClientError::Timeout instead of blocking its batch.

mod client;
mod config;
mod error;
mod frame;
pub mod prompts;
mod types;

#[cfg(test)]
mod tests;

pub use client::DifyClient;
pub use config::ApiConfig;
pub use error::ClientError;
pub use frame::{AnswerBuffer, Frame, FrameDecoder};
pub use types::{ChatFile, ChatRequest, ChatResponse, CompletionRequest, UploadedFile};
