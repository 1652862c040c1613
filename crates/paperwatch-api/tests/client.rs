use httpmock::prelude::*;
use serde_json::json;

use paperwatch_api::{ApiClient, ApiError, PaperQuery};

fn paper_body(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "arxiv_id": format!("2501.0123{id}"),
        "title": "Streaming KV Cache Compression",
        "authors": "A. Author",
        "abstract": "We stream.",
        "categories": "cs.LG",
        "published": "2025-01-03T12:00:00",
        "updated": "2025-01-03T12:00:00",
        "pdf_url": "https://arxiv.org/pdf/2501.01234",
        "processing_status": "pending",
        "is_processed": false,
        "created_at": "2025-01-05T00:00:00"
    })
}

#[tokio::test]
async fn list_papers_sends_filters_and_decodes() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/papers")
                .query_param("skip", "0")
                .query_param("limit", "50")
                .query_param("min_score", "5");
            then.status(200).json_body(json!([paper_body(1), paper_body(2)]));
        })
        .await;

    let client = ApiClient::new(server.url("/api"));
    let query = PaperQuery {
        min_score: Some(5),
        ..PaperQuery::default()
    };
    let papers = client.list_papers(&query).await.unwrap();

    mock.assert_async().await;
    assert_eq!(papers.len(), 2);
    assert_eq!(papers[0].id, 1);
    assert_eq!(papers[1].id, 2);
}

#[tokio::test]
async fn get_paper_maps_404_to_status_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/papers/99");
            then.status(404).body(r#"{"detail":"Paper not found"}"#);
        })
        .await;

    let client = ApiClient::new(server.url("/api"));
    let err = client.get_paper(99).await.unwrap_err();
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn pending_ids_unwraps_listing() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/papers/pending");
            then.status(200).json_body(json!({ "paper_ids": [3, 1, 8] }));
        })
        .await;

    let client = ApiClient::new(server.url("/api"));
    let ids = client.pending_ids().await.unwrap();
    assert_eq!(ids, vec![3, 1, 8]);
}

#[tokio::test]
async fn import_rejects_invalid_id_without_a_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/papers/import");
            then.status(200).json_body(json!({}));
        })
        .await;

    let client = ApiClient::new(server.url("/api"));
    let err = client.import_paper("not-an-arxiv-id").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidArxivId(_)));
    assert_eq!(mock.hits_async().await, 0);
}

#[tokio::test]
async fn delete_paper_accepts_2xx() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/papers/7");
            then.status(200)
                .json_body(json!({"message": "Paper deleted successfully", "paper_id": 7}));
        })
        .await;

    let client = ApiClient::new(server.url("/api"));
    client.delete_paper(7).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn stats_decodes_counters() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/stats");
            then.status(200).json_body(json!({
                "total_papers": 40,
                "processed_papers": 25,
                "high_relevance_papers": 3,
                "pending_processing": 15
            }));
        })
        .await;

    let client = ApiClient::new(server.url("/api"));
    let stats = client.stats().await.unwrap();
    assert_eq!(stats.total_papers, 40);
    assert_eq!(stats.high_relevance_papers, 3);
}
