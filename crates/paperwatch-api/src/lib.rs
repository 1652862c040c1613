//! Transport layer for the paperwatch backend.
//!
//! The backend is the system of record: it stores papers, queries arXiv, and
//! proxies the LLM analysis workflow. This crate covers both halves of its
//! surface — plain JSON routes ([`ApiClient`]) and the server-sent event
//! streams that deliver per-paper analysis progress ([`events`], [`sse`]).

pub mod client;
pub mod events;
pub mod model;
pub mod sse;

pub use client::{ApiClient, ApiError, BatchTrigger, PaperQuery, DEFAULT_BASE_URL};
pub use events::{BatchEvent, FetchEvent, ProcessEvent, ProgressKind};
pub use model::{
    AnalysisResult, AppSettings, ConceptBridging, ImportOutcome, Paper, ProcessingStatus, Stats,
};
pub use sse::{RawRecord, SseDecoder, StreamError};
