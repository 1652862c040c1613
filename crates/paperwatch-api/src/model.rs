use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Server-side processing state of a paper.
///
/// The server owns this field; the client may overlay it transiently while a
/// stream is active (see `paperwatch-core::session::StatusOverlay`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl ProcessingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }
}

/// A tracked arXiv paper as the backend reports it.
///
/// Content fields are immutable once fetched; analysis fields stay `None`
/// until the workflow completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub id: i64,
    pub arxiv_id: String,
    pub title: String,
    pub authors: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub categories: String,
    pub published: NaiveDateTime,
    pub updated: NaiveDateTime,
    pub pdf_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,

    // Analysis fields, populated on completion
    #[serde(default)]
    pub paper_essence: Option<String>,
    #[serde(default)]
    pub concept_bridging: Option<String>,
    #[serde(default)]
    pub visual_verification: Option<String>,
    #[serde(default)]
    pub relevance_score: Option<u8>,
    #[serde(default)]
    pub relevance_reason: Option<String>,
    #[serde(default)]
    pub heuristic_suggestion: Option<String>,

    #[serde(default)]
    pub processing_status: Option<ProcessingStatus>,
    #[serde(default)]
    pub is_processed: bool,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub processed_at: Option<NaiveDateTime>,
}

impl Paper {
    /// Score threshold used by the backend's high-relevance stat.
    pub fn is_high_relevance(&self) -> bool {
        self.relevance_score.is_some_and(|s| s >= 9)
    }

    /// True when the paper was left mid-analysis by a dead session and needs
    /// to be re-entered into a batch (recovery scan input).
    pub fn is_stuck(&self) -> bool {
        self.processing_status == Some(ProcessingStatus::Processing) && !self.is_processed
    }
}

/// Concept-bridging section of an analysis result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConceptBridging {
    #[serde(default)]
    pub source_concept: String,
    #[serde(default)]
    pub target_concept: String,
    #[serde(default)]
    pub mechanism_transfer: String,
}

/// Final structured result delivered by the `result` stream event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub paper_essence: String,
    #[serde(default)]
    pub concept_bridging: ConceptBridging,
    #[serde(default)]
    pub visual_verification: String,
    #[serde(default)]
    pub relevance_score: u8,
    #[serde(default)]
    pub relevance_reason: String,
    #[serde(default)]
    pub heuristic_suggestion: String,
    #[serde(default)]
    pub thought_process: Option<String>,
}

/// Aggregate counters from `GET /stats`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Stats {
    pub total_papers: u64,
    pub processed_papers: u64,
    pub high_relevance_papers: u64,
    pub pending_processing: u64,
}

/// Outcome of `POST /papers/import`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub paper_id: Option<i64>,
    #[serde(default)]
    pub arxiv_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_new: bool,
}

/// Application settings: the configured research focus driving relevance
/// scoring, plus arXiv category selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub research_focus: Option<String>,
    #[serde(default)]
    pub research_idea: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub arxiv_categories: Option<String>,
    #[serde(default)]
    pub focus_keywords: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper_json() -> serde_json::Value {
        serde_json::json!({
            "id": 7,
            "arxiv_id": "2501.01234v1",
            "title": "KV Cache Compression at Scale",
            "authors": "A. Author, B. Author",
            "abstract": "We compress caches.",
            "categories": "cs.LG, cs.CL",
            "published": "2025-01-03T12:00:00",
            "updated": "2025-01-04T08:30:00",
            "pdf_url": "https://arxiv.org/pdf/2501.01234v1",
            "processing_status": "pending",
            "is_processed": false,
            "created_at": "2025-01-05T00:00:00"
        })
    }

    #[test]
    fn paper_deserializes_with_absent_analysis_fields() {
        let paper: Paper = serde_json::from_value(paper_json()).unwrap();
        assert_eq!(paper.id, 7);
        assert_eq!(paper.abstract_text, "We compress caches.");
        assert!(paper.relevance_score.is_none());
        assert_eq!(paper.processing_status, Some(ProcessingStatus::Pending));
        assert!(!paper.is_high_relevance());
        assert!(!paper.is_stuck());
    }

    #[test]
    fn stuck_detection_requires_processing_and_unprocessed() {
        let mut json = paper_json();
        json["processing_status"] = "processing".into();
        let paper: Paper = serde_json::from_value(json.clone()).unwrap();
        assert!(paper.is_stuck());

        json["is_processed"] = true.into();
        let paper: Paper = serde_json::from_value(json).unwrap();
        assert!(!paper.is_stuck());
    }

    #[test]
    fn high_relevance_threshold_is_nine() {
        let mut json = paper_json();
        json["relevance_score"] = 9.into();
        let paper: Paper = serde_json::from_value(json).unwrap();
        assert!(paper.is_high_relevance());

        let mut json = paper_json();
        json["relevance_score"] = 8.into();
        let paper: Paper = serde_json::from_value(json).unwrap();
        assert!(!paper.is_high_relevance());
    }

    #[test]
    fn analysis_result_tolerates_partial_payload() {
        let result: AnalysisResult =
            serde_json::from_str(r#"{"relevance_score": 6, "paper_essence": "x"}"#).unwrap();
        assert_eq!(result.relevance_score, 6);
        assert_eq!(result.paper_essence, "x");
        assert!(result.concept_bridging.source_concept.is_empty());
    }
}
