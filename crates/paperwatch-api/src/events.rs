//! Typed events for the three backend streams.
//!
//! Decoding is lenient by contract: a record whose JSON body does not parse is
//! skipped, unknown event names are ignored, and missing fields fall back to
//! defaults. Forward compatibility beats strictness on these streams.

use serde_json::Value;

use crate::model::AnalysisResult;
use crate::sse::RawRecord;

/// Discriminant of a `progress` record on the per-paper analysis stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressKind {
    Started,
    WorkflowStarted,
    NodeStarted,
    NodeFinished,
    Other(String),
}

impl ProgressKind {
    fn parse(status: &str) -> Self {
        match status {
            "started" => Self::Started,
            "workflow_started" => Self::WorkflowStarted,
            "node_started" => Self::NodeStarted,
            "node_finished" => Self::NodeFinished,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Events delivered by `GET /papers/{id}/process/stream`.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    Progress { status: ProgressKind, message: String },
    Thinking { thought: String },
    Answer { answer: String },
    Result(Box<AnalysisResult>),
    Error { error: String, message: String },
    Done,
    /// Keepalive emitted while the workflow is quiet. Carries nothing.
    Ping,
}

impl ProcessEvent {
    pub fn from_record(record: &RawRecord) -> Option<Self> {
        let data: Value = serde_json::from_str(&record.data).ok()?;
        match record.event.as_str() {
            "progress" => Some(Self::Progress {
                status: ProgressKind::parse(str_field(&data, "status")),
                message: str_field(&data, "message").to_string(),
            }),
            "thinking" => Some(Self::Thinking {
                thought: str_field(&data, "thought").to_string(),
            }),
            "answer" => Some(Self::Answer {
                answer: str_field(&data, "answer").to_string(),
            }),
            "result" => serde_json::from_value(data)
                .ok()
                .map(|result| Self::Result(Box::new(result))),
            "error" => Some(Self::Error {
                error: str_field(&data, "error").to_string(),
                message: str_field(&data, "message").to_string(),
            }),
            "done" => Some(Self::Done),
            "ping" => Some(Self::Ping),
            _ => None,
        }
    }

    /// True for `error` and `done` — nothing meaningful follows either.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done)
    }
}

/// Events delivered by `GET /papers/fetch/stream`.
#[derive(Debug, Clone)]
pub enum FetchEvent {
    Started,
    Fetching { message: String },
    Fetched { count: u64, message: String },
    Saving { message: String },
    Done { fetched: u64, saved: u64, message: String },
    Error { error: String },
}

impl FetchEvent {
    pub fn from_record(record: &RawRecord) -> Option<Self> {
        let data: Value = serde_json::from_str(&record.data).ok()?;
        match record.event.as_str() {
            "started" => Some(Self::Started),
            "fetching" => Some(Self::Fetching {
                message: str_field(&data, "message").to_string(),
            }),
            "fetched" => Some(Self::Fetched {
                count: u64_field(&data, "count"),
                message: str_field(&data, "message").to_string(),
            }),
            "saving" => Some(Self::Saving {
                message: str_field(&data, "message").to_string(),
            }),
            "done" => Some(Self::Done {
                fetched: u64_field(&data, "fetched"),
                saved: u64_field(&data, "saved"),
                message: str_field(&data, "message").to_string(),
            }),
            "error" => Some(Self::Error {
                error: str_field(&data, "error").to_string(),
            }),
            _ => None,
        }
    }
}

/// Events delivered by the server-side batcher on
/// `GET /papers/process/batch/stream`.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        total: u64,
    },
    PaperProcessing {
        paper_id: i64,
        title: String,
    },
    PaperCompleted {
        paper_id: i64,
        title: String,
        processed: u64,
        total: u64,
    },
    PaperFailed {
        paper_id: i64,
        error: String,
        failed: u64,
        total: u64,
    },
    Done {
        processed: u64,
        failed: u64,
        total: u64,
    },
}

impl BatchEvent {
    pub fn from_record(record: &RawRecord) -> Option<Self> {
        let data: Value = serde_json::from_str(&record.data).ok()?;
        match record.event.as_str() {
            "started" => Some(Self::Started {
                total: u64_field(&data, "total"),
            }),
            "paper_processing" => Some(Self::PaperProcessing {
                paper_id: i64_field(&data, "paper_id"),
                title: str_field(&data, "title").to_string(),
            }),
            "paper_completed" => Some(Self::PaperCompleted {
                paper_id: i64_field(&data, "paper_id"),
                title: str_field(&data, "title").to_string(),
                processed: u64_field(&data, "processed"),
                total: u64_field(&data, "total"),
            }),
            "paper_failed" => Some(Self::PaperFailed {
                paper_id: i64_field(&data, "paper_id"),
                error: str_field(&data, "error").to_string(),
                failed: u64_field(&data, "failed"),
                total: u64_field(&data, "total"),
            }),
            "done" => Some(Self::Done {
                processed: u64_field(&data, "processed"),
                failed: u64_field(&data, "failed"),
                total: u64_field(&data, "total"),
            }),
            _ => None,
        }
    }
}

fn str_field<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn u64_field(data: &Value, key: &str) -> u64 {
    data.get(key).and_then(Value::as_u64).unwrap_or_default()
}

fn i64_field(data: &Value, key: &str) -> i64 {
    data.get(key).and_then(Value::as_i64).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(event: &str, data: &str) -> RawRecord {
        RawRecord {
            event: event.to_string(),
            data: data.to_string(),
        }
    }

    #[test]
    fn progress_statuses_map_to_kinds() {
        let ev = ProcessEvent::from_record(&record(
            "progress",
            r#"{"status":"node_started","message":"Running node: Paper Analysis"}"#,
        ))
        .unwrap();
        match ev {
            ProcessEvent::Progress { status, message } => {
                assert_eq!(status, ProgressKind::NodeStarted);
                assert_eq!(message, "Running node: Paper Analysis");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unrecognized_progress_status_is_preserved() {
        let ev = ProcessEvent::from_record(&record(
            "progress",
            r#"{"status":"node_retried","message":"x"}"#,
        ))
        .unwrap();
        match ev {
            ProcessEvent::Progress { status, .. } => {
                assert_eq!(status, ProgressKind::Other("node_retried".to_string()));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_swallowed() {
        assert!(ProcessEvent::from_record(&record("thinking", "{not json")).is_none());
        assert!(FetchEvent::from_record(&record("done", "{{")).is_none());
        assert!(BatchEvent::from_record(&record("started", "")).is_none());
    }

    #[test]
    fn unknown_event_names_are_ignored() {
        assert!(ProcessEvent::from_record(&record("telemetry", "{}")).is_none());
        assert!(FetchEvent::from_record(&record("telemetry", "{}")).is_none());
    }

    #[test]
    fn result_event_parses_structured_payload() {
        let ev = ProcessEvent::from_record(&record(
            "result",
            r#"{"paper_essence":"core idea","relevance_score":8,
                "concept_bridging":{"source_concept":"s","target_concept":"t","mechanism_transfer":"m"}}"#,
        ))
        .unwrap();
        match ev {
            ProcessEvent::Result(result) => {
                assert_eq!(result.relevance_score, 8);
                assert_eq!(result.concept_bridging.target_concept, "t");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn ping_and_done_are_terminalness_aware() {
        let ping = ProcessEvent::from_record(&record("ping", r#"{"ts":"now"}"#)).unwrap();
        assert!(!ping.is_terminal());
        let done = ProcessEvent::from_record(&record("done", r#"{"status":"completed"}"#)).unwrap();
        assert!(done.is_terminal());
    }

    #[test]
    fn fetch_done_carries_counts() {
        let ev = FetchEvent::from_record(&record(
            "done",
            r#"{"fetched":12,"saved":4,"message":"saved 4 new papers"}"#,
        ))
        .unwrap();
        match ev {
            FetchEvent::Done { fetched, saved, .. } => {
                assert_eq!(fetched, 12);
                assert_eq!(saved, 4);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
