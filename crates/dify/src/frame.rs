// Streamed frame decoding
//
// A streaming response is a sequence of lines. Lines of the form
// `data: {json}` carry one frame each; every other line (blank keep-alives,
// `event:` lines) is ignored. Chunks from the network may split a line, or a
// multi-byte character, anywhere, so bytes are buffered until a `\n` arrives.
//
// A frame that is not a JSON object is logged and dropped; the stream goes on.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ClientError;

const DATA_PREFIX: &str = "data:";

/// One decoded frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Incremental answer text
    Answer(String),
    /// Server-side failure reported in-band (`"event": "error"`)
    Error(String),
    /// Any other frame (message_end, ping, workflow events)
    Other(Value),
}

impl Frame {
    fn from_value(value: Value) -> Self {
        if value.get("event").and_then(Value::as_str) == Some("error") {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string());
            return Frame::Error(message);
        }

        match value.get("answer").and_then(Value::as_str) {
            Some(answer) => Frame::Answer(answer.to_string()),
            None => Frame::Other(value),
        }
    }
}

/// Incremental line-framed decoder
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    malformed: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns every frame completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(frame) = self.decode_line(&line[..line.len() - 1]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush a final line that was not newline-terminated
    pub fn finish(&mut self) -> Option<Frame> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        self.decode_line(&line)
    }

    /// Frames dropped so far because they could not be decoded
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<Frame> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);

        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                self.malformed += 1;
                warn!(error = %e, "Dropping frame with invalid UTF-8");
                return None;
            }
        };

        let payload = line.strip_prefix(DATA_PREFIX)?.trim_start();

        match serde_json::from_str::<Value>(payload) {
            Ok(value) if value.is_object() => Some(Frame::from_value(value)),
            Ok(_) => {
                self.malformed += 1;
                warn!(data = payload, "Dropping frame that is not a JSON object");
                None
            }
            Err(e) => {
                self.malformed += 1;
                warn!(error = %e, data = payload, "Dropping malformed frame");
                None
            }
        }
    }
}

/// Running answer assembled from frames in arrival order
#[derive(Debug, Default)]
pub struct AnswerBuffer {
    text: String,
    frames: usize,
}

impl AnswerBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one frame; an in-band error event ends the item
    pub fn apply(&mut self, frame: Frame) -> Result<(), ClientError> {
        match frame {
            Frame::Answer(delta) => {
                self.frames += 1;
                self.text.push_str(&delta);
                Ok(())
            }
            Frame::Error(message) => Err(ClientError::Stream(message)),
            Frame::Other(value) => {
                let event = value
                    .get("event")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("unknown");
                debug!(event, "Frame without answer ignored");
                Ok(())
            }
        }
    }

    /// Number of answer frames received
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Final answer, trimmed of surrounding whitespace
    pub fn finish(self) -> String {
        self.text.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[&[u8]]) -> (String, usize) {
        let mut decoder = FrameDecoder::new();
        let mut answer = AnswerBuffer::new();
        for chunk in chunks {
            for frame in decoder.push(chunk) {
                answer.apply(frame).unwrap();
            }
        }
        if let Some(frame) = decoder.finish() {
            answer.apply(frame).unwrap();
        }
        let malformed = decoder.malformed();
        (answer.finish(), malformed)
    }

    const STREAM: &str = concat!(
        "data: {\"event\": \"message\", \"answer\": \" Hello\"}\n",
        "data: {not json}\n",
        "\n",
        "event: ping\n",
        "data: {\"event\": \"message\", \"answer\": \", wörld\"}\r\n",
        "data: [1, 2]\n",
        "data: {\"event\": \"message_end\", \"id\": \"m1\"}\n",
        "data: {\"event\": \"message\", \"answer\": \"! \"}\n",
    );

    #[test]
    fn test_single_chunk() {
        let (answer, malformed) = decode_all(&[STREAM.as_bytes()]);
        assert_eq!(answer, "Hello, wörld!");
        assert_eq!(malformed, 2);
    }

    #[test]
    fn test_every_split_point() {
        let bytes = STREAM.as_bytes();
        for split in 0..=bytes.len() {
            let (head, tail) = bytes.split_at(split);
            let (answer, malformed) = decode_all(&[head, tail]);
            assert_eq!(answer, "Hello, wörld!", "split at {}", split);
            assert_eq!(malformed, 2, "split at {}", split);
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let chunks: Vec<&[u8]> = STREAM.as_bytes().chunks(1).collect();
        let (answer, _) = decode_all(&chunks);
        assert_eq!(answer, "Hello, wörld!");
    }

    #[test]
    fn test_trailing_frame_without_newline() {
        let (answer, _) = decode_all(&[b"data: {\"answer\": \"a\"}\ndata: {\"answer\": \"b\"}"]);
        assert_eq!(answer, "ab");
    }

    #[test]
    fn test_prefix_without_space() {
        let (answer, malformed) = decode_all(&[b"data:{\"answer\": \"x\"}\n"]);
        assert_eq!(answer, "x");
        assert_eq!(malformed, 0);
    }

    #[test]
    fn test_error_event() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"data: {\"event\": \"error\", \"status\": 400, \"message\": \"quota exceeded\"}\n");
        assert_eq!(frames, vec![Frame::Error("quota exceeded".to_string())]);

        let mut answer = AnswerBuffer::new();
        let err = answer.apply(frames[0].clone()).unwrap_err();
        assert!(matches!(err, ClientError::Stream(ref m) if m == "quota exceeded"));
    }

    #[test]
    fn test_control_frames_leave_answer_untouched() {
        let mut answer = AnswerBuffer::new();
        answer
            .apply(Frame::Other(serde_json::json!({"event": "message_end"})))
            .unwrap();
        answer.apply(Frame::Other(serde_json::json!({"id": 7}))).unwrap();

        assert_eq!(answer.frames(), 0);
        assert_eq!(answer.finish(), "");
    }

    #[test]
    fn test_empty_stream() {
        let (answer, malformed) = decode_all(&[]);
        assert_eq!(answer, "");
        assert_eq!(malformed, 0);
    }
}
