// Client error types

use std::time::Duration;

use refminer_core::ItemError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("stream idle for {0:?}")]
    Idle(Duration),

    #[error("stream error event: {0}")]
    Stream(String),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        ClientError::Api {
            status,
            message: message.into(),
        }
    }
}

impl From<ClientError> for ItemError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(e) if e.is_decode() => ItemError::decode(e.to_string()),
            ClientError::Http(e) => ItemError::transport(e.to_string()),
            ClientError::Api { status, message } => ItemError::status(status, message),
            ClientError::Timeout(d) | ClientError::Idle(d) => ItemError::Timeout(d),
            ClientError::Stream(msg) => ItemError::remote(msg),
            ClientError::Decode(msg) => ItemError::decode(msg),
            ClientError::Io(e) => ItemError::input(e.to_string()),
            ClientError::Config(msg) => ItemError::input(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_keeps_status() {
        let item: ItemError = ClientError::api(500, "boom").into();
        assert_eq!(item, ItemError::status(500, "boom"));
        assert!(item.to_string().contains("500"));
        assert!(item.is_retryable());
    }

    #[test]
    fn test_idle_maps_to_timeout() {
        let item: ItemError = ClientError::Idle(Duration::from_secs(5)).into();
        assert_eq!(item, ItemError::Timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_stream_error_is_terminal() {
        let item: ItemError = ClientError::Stream("quota exceeded".into()).into();
        assert!(!item.is_retryable());
        assert!(item.to_string().contains("quota exceeded"));
    }
}
