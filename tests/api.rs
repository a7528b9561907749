mod common;

use std::{net::TcpListener, sync::Arc, time::Duration};

use actix_web::web;
use common::{extraction_settings, search_settings, spawn_completion_endpoint, spawn_search_endpoint, MockEndpoint};
use fetchify::{
    dal::result_store::{MemoryResultStore, ResultStore},
    services::{build_search_http_client, AppContext, BatchRuns, ExtractionClient, RateLimiter},
    startup::run,
};
use reqwest::{redirect::Policy, StatusCode};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

struct TestApp {
    address: String,
    store: Arc<MemoryResultStore>,
    search: MockEndpoint,
    client: reqwest::Client,
}

fn spawn_app() -> TestApp {
    spawn_app_with_limiter(RateLimiter::new(10, 100).unwrap())
}

fn spawn_app_with_limiter(rate_limiter: RateLimiter) -> TestApp {
    let search = spawn_search_endpoint(200);
    let completion = spawn_completion_endpoint(Some("contact@acme.com"));

    let settings = search_settings(&search.base_url);
    let store = Arc::new(MemoryResultStore::new());
    let context = web::Data::new(AppContext {
        store: store.clone(),
        extractor: Arc::new(
            ExtractionClient::new(&extraction_settings(&completion.base_url), "sk-test").unwrap(),
        ),
        rate_limiter: Arc::new(rate_limiter),
        search_http: build_search_http_client(&settings).unwrap(),
        search_settings: settings,
        search_api_key: "serp-key".to_string(),
        runs: BatchRuns::default(),
        shutdown: CancellationToken::new(),
    });

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let server = run(listener, context).expect("Failed to start server");
    tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        search,
        client: reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .unwrap(),
    }
}

impl TestApp {
    async fn post_batch(&self, template: &str, entities: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/app/batch", self.address))
            .form(&[("template", template), ("entities", entities)])
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn dashboard(&self) -> reqwest::Response {
        self.client
            .get(format!("{}/app/dashboard", self.address))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .expect("Dashboard did not answer")
    }

    async fn records(&self) -> Vec<Value> {
        self.client
            .get(format!("{}/app/records", self.address))
            .send()
            .await
            .expect("Failed to execute request")
            .json()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn root_greets() {
    let app = spawn_app();

    let response = app.client.get(&app.address).send().await.unwrap();

    assert!(response.status().is_success());
}

#[tokio::test]
async fn batch_with_bad_template_is_rejected() {
    let app = spawn_app();

    let response = app.post_batch("contact email", "Acme").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().contains("{company}"));
    assert_eq!(app.search.request_count(), 0);
}

#[tokio::test]
async fn batch_fetches_unique_entities_and_extracts_them() {
    let app = spawn_app();

    let response = app.post_batch("{company} contact email", "Acme\nAcme\nGlobex\n").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let mut records = vec![];
    for _ in 0..50 {
        records = app.records().await;
        if records.len() == 2 && records.iter().all(|r| !r["extracted_value"].is_null()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|r| r["extracted_value"] == json!("contact@acme.com")));
    assert_eq!(app.search.request_count(), 2);

    let status = app
        .client
        .get(format!("{}{}", app.address, location))
        .send()
        .await
        .unwrap();
    assert_eq!(status.status(), StatusCode::OK);
    assert!(status.text().await.unwrap().contains("Values extracted"));
}

#[tokio::test]
async fn reset_puts_record_back_in_the_pending_set() {
    let app = spawn_app();
    app.store.upsert_raw("Acme", &json!({})).await.unwrap();
    app.store.set_extracted("Acme", "old@acme.com").await.unwrap();

    let response = app
        .client
        .post(format!("{}/app/records/reset", app.address))
        .form(&[("entity_key", "Acme")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app
        .client
        .post(format!("{}/app/extract", app.address))
        .header("Accept", "application/json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report: Value = response.json().await.unwrap();
    assert_eq!(report["extraction"]["succeeded"], 1);

    let records = app.records().await;
    assert_eq!(records[0]["extracted_value"], "contact@acme.com");
}

#[tokio::test]
async fn unknown_batch_is_not_found() {
    let app = spawn_app();

    let response = app
        .client
        .get(format!(
            "{}/app/batch/00000000-0000-0000-0000-000000000000",
            app.address
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_counts_unique_entities_of_a_batch() {
    let app = spawn_app();

    let response = app.post_batch("{company} contact email", "Acme\nAcme\n\nGlobex\n").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app.dashboard().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("<td>2</td>"));
    assert!(body.contains("searches left"));
}

#[tokio::test]
async fn dashboard_answers_while_a_batch_waits_for_daily_quota() {
    let app = spawn_app_with_limiter(RateLimiter::new(10, 1).unwrap());

    app.post_batch("{company} contact email", "Acme\nGlobex").await;
    for _ in 0..50 {
        if app.search.request_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(app.search.request_count(), 1);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let response = app.dashboard().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("0 searches left"));
}

#[tokio::test]
async fn extraction_from_the_dashboard_form_redirects_back() {
    let app = spawn_app();
    app.store.upsert_raw("Acme", &json!({})).await.unwrap();

    let response = app
        .client
        .post(format!("{}/app/extract", app.address))
        .header("Accept", "text/html,application/xhtml+xml")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()["location"].to_str().unwrap(),
        "/app/dashboard"
    );
    assert_eq!(app.records().await[0]["extracted_value"], "contact@acme.com");
}
