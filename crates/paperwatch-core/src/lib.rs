//! Client-side core of paperwatch.
//!
//! Four pieces, leaves first: the step [`pipeline`] a paper's analysis moves
//! through, the per-paper stream [`session`] state machine, the
//! bounded-concurrency batch [`coordinator`], and the shared paper list
//! [`store`]. The [`engine`] wires them to the transport layer and reports
//! everything to the owning UI over a channel.

pub mod coordinator;
pub mod engine;
pub mod pipeline;
pub mod session;
pub mod store;

pub use coordinator::{BatchCoordinator, SessionLauncher, MAX_CONCURRENT};
pub use engine::{Engine, EngineEvent};
pub use pipeline::{ProgressStep, StepList, StepStatus, StepTemplate, DEFAULT_PIPELINE};
pub use session::{
    ErrorKind, PaperSession, SessionFailure, SessionPhase, SessionSignal, StatusOverlay, StatusTag,
};
pub use store::PaperStore;
