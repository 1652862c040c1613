use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::events::{BatchEvent, FetchEvent, ProcessEvent};
use crate::model::{AppSettings, ImportOutcome, Paper, Stats};
use crate::sse::{stream_records, StreamError};

/// Default backend location; override with `PAPERWATCH_API`.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

static ARXIV_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}\.\d{4,5}(?:v\d+)?)").expect("arXiv id pattern"));

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid arXiv URL or ID: {0}")]
    InvalidArxivId(String),
}

/// Filters for `GET /papers`.
#[derive(Debug, Clone, Copy)]
pub struct PaperQuery {
    pub skip: u32,
    pub limit: u32,
    pub min_score: Option<u8>,
    pub processed_only: bool,
}

impl Default for PaperQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 50,
            min_score: None,
            processed_only: false,
        }
    }
}

/// Response of `POST /papers/process/batch`.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchTrigger {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Deserialize)]
struct PendingIds {
    #[serde(default)]
    paper_ids: Vec<i64>,
}

/// Typed client for the paperwatch backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// List papers, most relevant first (server ordering).
    pub async fn list_papers(&self, query: &PaperQuery) -> Result<Vec<Paper>, ApiError> {
        let mut request = self
            .http
            .get(self.url("/papers"))
            .query(&[("skip", query.skip), ("limit", query.limit)]);
        if let Some(min_score) = query.min_score {
            request = request.query(&[("min_score", min_score)]);
        }
        if query.processed_only {
            request = request.query(&[("processed_only", "true")]);
        }
        let response = expect_ok(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Fetch one authoritative paper record (point-update source).
    pub async fn get_paper(&self, id: i64) -> Result<Paper, ApiError> {
        let response = expect_ok(
            self.http
                .get(self.url(&format!("/papers/{id}")))
                .send()
                .await?,
        )
        .await?;
        Ok(response.json().await?)
    }

    pub async fn get_paper_by_arxiv(&self, arxiv_id: &str) -> Result<Paper, ApiError> {
        let response = expect_ok(
            self.http
                .get(self.url(&format!("/papers/arxiv/{arxiv_id}")))
                .send()
                .await?,
        )
        .await?;
        Ok(response.json().await?)
    }

    pub async fn delete_paper(&self, id: i64) -> Result<(), ApiError> {
        expect_ok(
            self.http
                .delete(self.url(&format!("/papers/{id}")))
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }

    /// IDs of every paper awaiting processing. The server resets stuck
    /// `processing` rows to `pending` as a side effect before answering.
    pub async fn pending_ids(&self) -> Result<Vec<i64>, ApiError> {
        let response = expect_ok(self.http.get(self.url("/papers/pending")).send().await?).await?;
        let pending: PendingIds = response.json().await?;
        Ok(pending.paper_ids)
    }

    /// Import a paper by arXiv URL or bare ID. The ID is validated locally
    /// before the request goes out.
    pub async fn import_paper(&self, arxiv_url: &str) -> Result<ImportOutcome, ApiError> {
        if extract_arxiv_id(arxiv_url).is_none() {
            return Err(ApiError::InvalidArxivId(arxiv_url.to_string()));
        }
        let response = expect_ok(
            self.http
                .post(self.url("/papers/import"))
                .query(&[("arxiv_url", arxiv_url)])
                .send()
                .await?,
        )
        .await?;
        Ok(response.json().await?)
    }

    /// Background fetch trigger (non-streaming).
    pub async fn trigger_fetch(&self) -> Result<(), ApiError> {
        expect_ok(self.http.post(self.url("/papers/fetch")).send().await?).await?;
        Ok(())
    }

    /// Fire-and-forget single-paper processing trigger (non-streaming fallback).
    pub async fn trigger_process(&self, id: i64) -> Result<(), ApiError> {
        expect_ok(
            self.http
                .post(self.url(&format!("/papers/{id}/process")))
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }

    /// Kick off the server-side batcher.
    pub async fn trigger_batch(&self) -> Result<BatchTrigger, ApiError> {
        let response = expect_ok(
            self.http
                .post(self.url("/papers/process/batch"))
                .send()
                .await?,
        )
        .await?;
        Ok(response.json().await?)
    }

    pub async fn stats(&self) -> Result<Stats, ApiError> {
        let response = expect_ok(self.http.get(self.url("/stats")).send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn settings(&self) -> Result<AppSettings, ApiError> {
        let response = expect_ok(self.http.get(self.url("/settings")).send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn update_settings(&self, settings: &AppSettings) -> Result<AppSettings, ApiError> {
        let response = expect_ok(
            self.http
                .put(self.url("/settings"))
                .json(settings)
                .send()
                .await?,
        )
        .await?;
        Ok(response.json().await?)
    }

    /// Stream one paper's analysis. Events are delivered in transport order;
    /// cancellation stops delivery without a terminal error.
    pub async fn process_stream(
        &self,
        id: i64,
        cancel: &CancellationToken,
        mut on_event: impl FnMut(ProcessEvent),
    ) -> Result<(), StreamError> {
        log::debug!("opening analysis stream for paper {id}");
        let response = self
            .http
            .get(self.url(&format!("/papers/{id}/process/stream")))
            .send()
            .await?;
        stream_records(response, cancel, |record| {
            if let Some(event) = ProcessEvent::from_record(&record) {
                on_event(event);
            } else {
                log::trace!("dropping record: event={:?}", record.event);
            }
        })
        .await
    }

    /// Stream the arXiv fetch phase.
    pub async fn fetch_stream(
        &self,
        cancel: &CancellationToken,
        mut on_event: impl FnMut(FetchEvent),
    ) -> Result<(), StreamError> {
        let response = self
            .http
            .get(self.url("/papers/fetch/stream"))
            .send()
            .await?;
        stream_records(response, cancel, |record| {
            if let Some(event) = FetchEvent::from_record(&record) {
                on_event(event);
            }
        })
        .await
    }

    /// Stream the server-side batcher.
    pub async fn batch_stream(
        &self,
        cancel: &CancellationToken,
        mut on_event: impl FnMut(BatchEvent),
    ) -> Result<(), StreamError> {
        let response = self
            .http
            .get(self.url("/papers/process/batch/stream"))
            .send()
            .await?;
        stream_records(response, cancel, |record| {
            if let Some(event) = BatchEvent::from_record(&record) {
                on_event(event);
            }
        })
        .await
    }
}

async fn expect_ok(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Extract a bare arXiv ID from a URL or raw ID string.
pub fn extract_arxiv_id(input: &str) -> Option<&str> {
    let input = input.trim();
    if input.contains("arxiv.org") {
        ARXIV_ID_RE.find(input).map(|m| m.as_str())
    } else {
        // Bare IDs must match from the start; "v2 of 2501.01234" is not an ID.
        ARXIV_ID_RE
            .find(input)
            .filter(|m| m.start() == 0)
            .map(|m| m.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_abs_and_pdf_urls() {
        assert_eq!(
            extract_arxiv_id("https://arxiv.org/abs/2501.01234"),
            Some("2501.01234")
        );
        assert_eq!(
            extract_arxiv_id("https://arxiv.org/pdf/2501.01234v2"),
            Some("2501.01234v2")
        );
    }

    #[test]
    fn extracts_bare_ids_only_at_start() {
        assert_eq!(extract_arxiv_id("2501.01234v1"), Some("2501.01234v1"));
        assert_eq!(extract_arxiv_id("  2501.01234 "), Some("2501.01234"));
        assert_eq!(extract_arxiv_id("see 2501.01234"), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(extract_arxiv_id("not-an-id"), None);
        assert_eq!(extract_arxiv_id("https://arxiv.org/abs/oldstyle"), None);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:8000/api/");
        assert_eq!(client.base_url(), "http://localhost:8000/api");
        assert_eq!(client.url("/stats"), "http://localhost:8000/api/stats");
    }
}
