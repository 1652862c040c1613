//! Per-paper stream session state machine.
//!
//! One `PaperSession` owns a paper's analysis lifecycle on the client:
//! `Idle → Streaming → {Done, Failed}`, with `Failed → Streaming` only via an
//! explicit retry. At most one session per paper is ever active; the engine
//! enforces that, the [`PaperSession::begin`] guard backs it up.

use paperwatch_api::{AnalysisResult, ProcessEvent, ProcessingStatus, ProgressKind};

use crate::pipeline::{StepList, StepTemplate, DEFAULT_PIPELINE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Streaming,
    Done,
    Failed,
}

/// Client-local view of the server-authoritative processing status.
///
/// While a stream is active the client overlays its own value; the overlay is
/// cleared exactly on the `done` event, reverting to whatever the server says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOverlay {
    Authoritative,
    Overridden(ProcessingStatus),
}

/// Terminal error of a session: the wire kind plus the verbatim message.
#[derive(Debug, Clone)]
pub struct SessionFailure {
    pub kind: String,
    pub message: String,
}

impl SessionFailure {
    /// Human-readable message selected by error kind, with a generic
    /// fallback for kinds this client does not know.
    pub fn display_message(&self) -> &'static str {
        ErrorKind::parse(&self.kind).user_message()
    }
}

/// Known workflow error kinds. Anything else maps to [`ErrorKind::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EntityTooLarge,
    Timeout,
    RateLimit,
    Workflow,
    Unknown,
}

impl ErrorKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "entity_too_large" => Self::EntityTooLarge,
            "timeout" => Self::Timeout,
            "rate_limit" => Self::RateLimit,
            "workflow_error" => Self::Workflow,
            _ => Self::Unknown,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EntityTooLarge => "PDF is too large for the analysis workflow",
            Self::Timeout => "Analysis timed out; retry later",
            Self::RateLimit => "Analysis service is rate limited; wait before retrying",
            Self::Workflow => "The analysis workflow reported an error",
            Self::Unknown => "Analysis failed unexpectedly",
        }
    }
}

/// Effect a stream event asks the session owner to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// The stream ended normally: refetch this paper's authoritative record.
    Refresh,
}

/// Resolved display status for a paper, precedence:
/// active stream > local overlay > server status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTag {
    Streaming,
    Pending,
    Processing,
    Done,
    Failed,
}

impl StatusTag {
    /// Resolve for a paper with no client-side session at all.
    pub fn from_server(status: Option<ProcessingStatus>) -> Self {
        status.map(Self::from_status).unwrap_or(Self::Pending)
    }

    fn from_status(status: ProcessingStatus) -> Self {
        match status {
            ProcessingStatus::Pending => Self::Pending,
            ProcessingStatus::Processing => Self::Processing,
            ProcessingStatus::Done => Self::Done,
            ProcessingStatus::Failed => Self::Failed,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Streaming => "Analyzing",
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaperSession {
    paper_id: i64,
    phase: SessionPhase,
    steps: StepList,
    thought: String,
    answer: String,
    result: Option<AnalysisResult>,
    failure: Option<SessionFailure>,
    overlay: StatusOverlay,
    template: &'static [StepTemplate],
}

impl PaperSession {
    pub fn new(paper_id: i64) -> Self {
        Self::with_template(paper_id, DEFAULT_PIPELINE)
    }

    pub fn with_template(paper_id: i64, template: &'static [StepTemplate]) -> Self {
        Self {
            paper_id,
            phase: SessionPhase::Idle,
            steps: StepList::empty(),
            thought: String::new(),
            answer: String::new(),
            result: None,
            failure: None,
            overlay: StatusOverlay::Authoritative,
            template,
        }
    }

    pub fn paper_id(&self) -> i64 {
        self.paper_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_streaming(&self) -> bool {
        self.phase == SessionPhase::Streaming
    }

    pub fn steps(&self) -> &StepList {
        &self.steps
    }

    /// Accumulated reasoning text, append-only.
    pub fn thought(&self) -> &str {
        &self.thought
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn failure(&self) -> Option<&SessionFailure> {
        self.failure.as_ref()
    }

    pub fn overlay(&self) -> StatusOverlay {
        self.overlay
    }

    /// Enter `Streaming`, resetting all per-stream state.
    ///
    /// A no-op returning `false` while already streaming: retrying a paper
    /// mid-stream must not spawn a second session.
    pub fn begin(&mut self) -> bool {
        if self.phase == SessionPhase::Streaming {
            return false;
        }
        self.phase = SessionPhase::Streaming;
        self.steps = StepList::empty();
        self.thought.clear();
        self.answer.clear();
        self.result = None;
        self.failure = None;
        self.overlay = StatusOverlay::Overridden(ProcessingStatus::Processing);
        true
    }

    /// Feed one stream event through the state machine.
    pub fn apply(&mut self, event: &ProcessEvent) -> Option<SessionSignal> {
        match event {
            ProcessEvent::Progress { status, message } => {
                match status {
                    ProgressKind::Started => self.steps = StepList::start(self.template),
                    ProgressKind::WorkflowStarted => self.steps.complete_setup(),
                    ProgressKind::NodeStarted => self.steps.node_started(node_name(message)),
                    ProgressKind::NodeFinished => self.steps.node_finished(node_name(message)),
                    ProgressKind::Other(_) => {}
                }
                None
            }
            ProcessEvent::Thinking { thought } => {
                self.thought.push_str(thought);
                None
            }
            ProcessEvent::Answer { answer } => {
                self.answer.push_str(answer);
                None
            }
            ProcessEvent::Result(result) => {
                self.result = Some((**result).clone());
                self.steps.complete_all();
                None
            }
            ProcessEvent::Error { error, message } => {
                self.fail(error.clone(), message.clone());
                None
            }
            ProcessEvent::Done => {
                self.overlay = StatusOverlay::Authoritative;
                self.phase = SessionPhase::Done;
                Some(SessionSignal::Refresh)
            }
            ProcessEvent::Ping => None,
        }
    }

    /// Terminal failure, from an `error` event or a transport-level error.
    pub fn fail(&mut self, kind: impl Into<String>, message: impl Into<String>) {
        self.failure = Some(SessionFailure {
            kind: kind.into(),
            message: message.into(),
        });
        self.steps.fail_active();
        self.overlay = StatusOverlay::Overridden(ProcessingStatus::Failed);
        self.phase = SessionPhase::Failed;
    }

    /// Display status, resolved against the server-reported value.
    pub fn status_tag(&self, server: Option<ProcessingStatus>) -> StatusTag {
        if self.phase == SessionPhase::Streaming {
            return StatusTag::Streaming;
        }
        match self.overlay {
            StatusOverlay::Overridden(status) => StatusTag::from_status(status),
            StatusOverlay::Authoritative => server
                .map(StatusTag::from_status)
                .unwrap_or(StatusTag::Pending),
        }
    }
}

/// Node titles arrive embedded in the progress message
/// ("Running node: Paper Analysis"); take the text after the last separator.
fn node_name(message: &str) -> &str {
    message
        .rsplit_once(": ")
        .map(|(_, name)| name)
        .unwrap_or(message)
        .trim()
}
