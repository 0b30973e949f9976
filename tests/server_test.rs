//! HTTP routes served on an ephemeral port with scripted capabilities.

mod common;

use std::sync::Arc;

use common::{ScriptedClassifier, ScriptedGrouping, email, task};
use serde_json::{Value, json};
use triage_rs::engine::{BatchCoordinator, ClassifyOperation, DedupService};
use triage_rs::llm::{Classifier, GroupingService};
use triage_rs::server::{AppState, router};
use triage_rs::store::{ItemStore, MemoryStore};

struct TestServer {
    base: String,
    store: Arc<MemoryStore>,
    http: reqwest::Client,
}

async fn start(grouping: ScriptedGrouping) -> TestServer {
    let store = Arc::new(MemoryStore::with_items([
        email("e1", "Team lunch moved"),
        email("e2", "You won a prize"),
        task("t1", "Q3 memo", "fyi").summary("Q3 memo is out"),
        task("t2", "Read the memo", "fyi").summary("Memo for Q3"),
    ]));
    let classifier = ScriptedClassifier::new()
        .answer("Team lunch moved", "fyi", "Lunch moved to Thursday")
        .answer("You won a prize", "spam", "Prize scam");

    let items = Arc::clone(&store) as Arc<dyn ItemStore>;
    let operation = ClassifyOperation::new(
        Arc::clone(&items),
        Arc::new(classifier) as Arc<dyn Classifier>,
    );
    let state = AppState {
        coordinator: Arc::new(BatchCoordinator::new(Arc::new(operation))),
        dedup: Arc::new(DedupService::new(
            items,
            Arc::new(grouping) as Arc<dyn GroupingService>,
        )),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    TestServer {
        base: format!("http://{addr}"),
        store,
        http: reqwest::Client::new(),
    }
}

impl TestServer {
    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.http
            .post(format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let server = start(ScriptedGrouping::new()).await;
    let body: Value = server
        .http
        .get(format!("{}/health", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn batch_classify_returns_aggregate() {
    let server = start(ScriptedGrouping::new()).await;

    let response = server
        .post("/batch/classify", json!({ "item_ids": ["e1", "missing", "e2"] }))
        .await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total"], 3);
    assert_eq!(body["successful"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["results"][0]["item_id"], "e1");
    assert_eq!(body["results"][0]["data"]["category"], "fyi");
    assert_eq!(body["results"][1]["success"], false);
    assert_eq!(body["results"][2]["data"]["category"], "spam");
}

#[tokio::test]
async fn empty_batch_is_a_bad_request() {
    let server = start(ScriptedGrouping::new()).await;

    let response = server.post("/batch/classify", json!({ "item_ids": [] })).await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("item_ids"));

    let stream = server
        .post("/batch/classify/stream", json!({ "item_ids": [] }))
        .await;
    assert_eq!(stream.status(), 400);
}

#[tokio::test]
async fn streaming_batch_sends_progress_events() {
    let server = start(ScriptedGrouping::new()).await;

    let response = server
        .post(
            "/batch/classify/stream",
            json!({ "item_ids": ["e1", "e2"], "context": "office manager" }),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-accel-buffering"], "no");
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let body = response.text().await.unwrap();
    let events: Vec<Value> = body
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();

    assert_eq!(body.matches("event: progress").count(), events.len());
    assert_eq!(events.len(), 6);
    assert_eq!(events[0]["current"], 0);
    assert_eq!(events[2]["item_id"], "e1");
    assert_eq!(events[2]["status"], "completed");
    let last = events.last().unwrap();
    assert_eq!(last["current"], 2);
    assert_eq!(last["progress_percent"], 100.0);
    assert_eq!(last["data"]["successful"], 2);
    assert!(last.get("item_id").is_none() || last["item_id"].is_null());
}

#[tokio::test]
async fn dedup_merges_over_http() {
    let grouping = ScriptedGrouping::new().reply(
        "fyi",
        r#"{"duplicate_groups": [["t1", "t2"]], "reasoning": "same memo"}"#,
    );
    let server = start(grouping).await;

    let response = server.post("/dedup", json!({ "category": "fyi" })).await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["tasks_checked"], 2);
    assert_eq!(body["duplicate_groups"], 1);
    assert_eq!(body["tasks_merged"], 1);
    assert_eq!(body["merged_details"][0]["primary_id"], "t1");
    assert_eq!(server.store.len().await, 3);
}

#[tokio::test]
async fn malformed_grouping_reply_is_a_bad_gateway() {
    let grouping = ScriptedGrouping::new().reply("fyi", "no duplicates here");
    let server = start(grouping).await;

    let response = server.post("/dedup", json!({ "category": "fyi" })).await;
    assert_eq!(response.status(), 502);
    assert_eq!(server.store.len().await, 4);
}

#[tokio::test]
async fn dedup_all_returns_one_summary_per_category() {
    let server = start(ScriptedGrouping::new()).await;

    let response = server.post("/dedup/all", json!({})).await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    let categories: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["category"].as_str().unwrap())
        .collect();
    assert!(categories.contains(&"inbox"));
    assert!(categories.contains(&"fyi"));
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let server = start(ScriptedGrouping::new()).await;

    let cases = [
        ("/batch/classify", json!({})),
        ("/batch/classify", json!({ "item_ids": "e1" })),
        ("/batch/classify/stream", json!({ "item_ids": 7 })),
        ("/dedup", json!({})),
    ];
    for (path, body) in cases {
        let response = server.post(path, body.clone()).await;
        assert_eq!(response.status(), 400, "{path} {body}");
        let error: Value = response.json().await.unwrap();
        assert!(error["error"].is_string(), "{path} {body}");
    }
    assert_eq!(server.store.len().await, 4);
}
