//! Server-sent event framing.
//!
//! The backend streams UTF-8 text blocks separated by a blank line, each
//! carrying an `event:` line and a `data:` line with a JSON body. The decoder
//! here is incremental: bytes arrive in arbitrary chunk boundaries and records
//! are emitted as soon as their terminating blank line is seen. A record with
//! no data line is dropped; JSON validity is the consumer's concern (see
//! [`crate::events`]) so one corrupt record never aborts a healthy stream.

use futures_util::StreamExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Terminal failure of an event stream.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("stream transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl StreamError {
    /// Wire-style error kind: `http_<status>` or `stream_error`.
    pub fn kind(&self) -> String {
        match self {
            Self::Status { status, .. } => format!("http_{status}"),
            Self::Transport(_) => "stream_error".to_string(),
        }
    }
}

/// One framed record: the event name and its raw (unparsed) data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub event: String,
    pub data: String,
}

impl RawRecord {
    /// Parse a single text block. Returns `None` when no data line is present.
    fn parse(block: &str) -> Option<Self> {
        let mut event = String::new();
        let mut data = String::new();
        for line in block.lines() {
            if let Some(rest) = line.strip_prefix("event:") {
                event = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("data:") {
                data = rest.trim().to_string();
            }
        }
        if data.is_empty() {
            return None;
        }
        Some(Self { event, data })
    }
}

/// Incremental blank-line-delimited record decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of stream text and drain every complete record.
    pub fn feed(&mut self, chunk: &str) -> Vec<RawRecord> {
        self.buffer.push_str(chunk);
        let mut records = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..pos + 2).collect();
            if let Some(record) = RawRecord::parse(&block) {
                records.push(record);
            }
        }
        records
    }
}

/// Consume a streamed HTTP response as SSE records.
///
/// A non-2xx initial response is an immediate terminal error carrying the
/// status and body text. A mid-stream read error is terminal unless the read
/// was ended by `cancel`, in which case the function returns `Ok(())` and no
/// further callbacks fire. Normal end-of-stream also returns `Ok(())`.
pub async fn stream_records(
    response: reqwest::Response,
    cancel: &CancellationToken,
    mut on_record: impl FnMut(RawRecord),
) -> Result<(), StreamError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StreamError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let mut decoder = SseDecoder::new();
    let mut body = response.bytes_stream();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            chunk = body.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                for record in decoder.feed(&String::from_utf8_lossy(&bytes)) {
                    on_record(record);
                }
            }
            Some(Err(err)) => return Err(StreamError::Transport(err)),
            None => return Ok(()),
        }
    }
}
