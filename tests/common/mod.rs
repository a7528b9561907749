//! Local stand-ins for the search and completion endpoints.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::TcpListener,
    sync::{Arc, Mutex},
};

use actix_web::{web, App, HttpResponse, HttpServer};
use fetchify::configuration::{ExtractionSettings, SearchSettings};
use serde_json::json;

pub type Recorded = Arc<Mutex<Vec<HashMap<String, String>>>>;

pub struct MockEndpoint {
    pub base_url: String,
    pub requests: Recorded,
}

impl MockEndpoint {
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Answers `GET /search` with `status`, echoing the query parameters on success.
pub fn spawn_search_endpoint(status: u16) -> MockEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let requests: Recorded = Arc::default();

    let recorded = requests.clone();
    let server = HttpServer::new(move || {
        let recorded = recorded.clone();
        App::new().route(
            "/search",
            web::get().to(move |query: web::Query<HashMap<String, String>>| {
                let recorded = recorded.clone();
                async move {
                    let params = query.into_inner();
                    recorded.lock().unwrap().push(params.clone());

                    match status {
                        200 => HttpResponse::Ok().json(json!({
                            "search_parameters": params,
                            "organic_results": [
                                { "title": "Contact", "snippet": "Reach us at contact@acme.com" }
                            ]
                        })),
                        code => HttpResponse::build(
                            actix_web::http::StatusCode::from_u16(code).unwrap(),
                        )
                        .json(json!({ "error": "Invalid API key." })),
                    }
                }
            }),
        )
    })
    .workers(1)
    .listen(listener)
    .unwrap()
    .run();
    tokio::spawn(server);

    MockEndpoint {
        base_url: format!("http://127.0.0.1:{}/search", port),
        requests,
    }
}

/// Answers `POST /chat/completions` with `reply` as the single choice, or with a 400 error.
pub fn spawn_completion_endpoint(reply: Option<&'static str>) -> MockEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let requests: Recorded = Arc::default();

    let recorded = requests.clone();
    let server = HttpServer::new(move || {
        let recorded = recorded.clone();
        App::new().route(
            "/chat/completions",
            web::post().to(move |body: web::Json<serde_json::Value>| {
                let recorded = recorded.clone();
                async move {
                    let body = body.into_inner();
                    let mut fields = HashMap::new();
                    for key in ["model", "max_tokens", "temperature"] {
                        fields.insert(key.to_string(), body[key].to_string());
                    }
                    fields.insert(
                        "prompt".to_string(),
                        body["messages"][0]["content"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string(),
                    );
                    recorded.lock().unwrap().push(fields);

                    match reply {
                        Some(content) => HttpResponse::Ok().json(json!({
                            "id": "chatcmpl-1",
                            "object": "chat.completion",
                            "created": 1_700_000_000,
                            "model": "gpt-4o-mini",
                            "choices": [{
                                "index": 0,
                                "message": { "role": "assistant", "content": content },
                                "finish_reason": "stop"
                            }]
                        })),
                        None => HttpResponse::BadRequest().json(json!({
                            "error": {
                                "message": "The model does not exist",
                                "type": "invalid_request_error",
                                "param": null,
                                "code": "model_not_found"
                            }
                        })),
                    }
                }
            }),
        )
    })
    .workers(1)
    .listen(listener)
    .unwrap()
    .run();
    tokio::spawn(server);

    MockEndpoint {
        base_url: format!("http://127.0.0.1:{}", port),
        requests,
    }
}

pub fn search_settings(base_url: &str) -> SearchSettings {
    SearchSettings {
        base_url: base_url.to_string(),
        engine: "google".to_string(),
        result_count: 10,
        locale: "us".to_string(),
        timeout_secs: 5,
        query_template: "{company} contact email".to_string(),
    }
}

pub fn extraction_settings(api_base: &str) -> ExtractionSettings {
    ExtractionSettings {
        api_base: Some(api_base.to_string()),
        model: "gpt-4o-mini".to_string(),
        target_field: "contact email address".to_string(),
        max_tokens: 50,
        timeout_secs: 5,
    }
}
