mod support;

use std::sync::Arc;

use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::Value;

use newscast::llm::unavailable::UnavailableProvider;
use newscast::llm::AiService;
use newscast::processing::BatchOptions;
use newscast::server::{build_rocket, AppState, Cors};
use support::{entry, StaticFeed, StubProvider};

async fn client_with(provider: Arc<dyn newscast::llm::AiProvider>, feed: StaticFeed) -> Client {
    let state = AppState::new(
        Arc::new(AiService::new(provider)),
        Arc::new(feed),
        10,
        BatchOptions::default(),
    );
    let rocket = build_rocket(
        rocket::Config::figment(),
        state,
        Cors::new(vec!["http://localhost:3000".to_string()]),
    );
    Client::tracked(rocket).await.expect("valid rocket instance")
}

async fn stub_client() -> Client {
    let feed = StaticFeed {
        entries: (0..3).map(|i| entry(i, &format!("Body {}", i))).collect(),
        fail: false,
    };
    client_with(Arc::new(StubProvider::default()), feed).await
}

#[rocket::async_test]
async fn root_reports_running() {
    let client = stub_client().await;
    let response = client.get("/").dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["message"], "News Assistant API is running");
}

#[rocket::async_test]
async fn status_names_active_provider() {
    let client = stub_client().await;
    let response = client.get("/api/status").dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["provider"], "Stub");
}

#[rocket::async_test]
async fn news_returns_summarized_articles() {
    let client = stub_client().await;
    let response = client.get("/api/news").dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    let articles = body.as_array().unwrap();
    assert_eq!(articles.len(), 3);
    assert_eq!(articles[0]["title"], "Story 0");
    assert_eq!(articles[0]["summary"], "Summary of: Body 0");
    assert_eq!(articles[0]["original_content"], "Body 0");
    assert_eq!(articles[2]["link"], "https://news.example.com/2");
}

#[rocket::async_test]
async fn news_feed_failure_is_500_with_detail() {
    let feed = StaticFeed {
        entries: Vec::new(),
        fail: true,
    };
    let client = client_with(Arc::new(StubProvider::default()), feed).await;
    let response = client.get("/api/news").dispatch().await;

    assert_eq!(response.status(), Status::InternalServerError);
    let body: Value = response.into_json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("502"));
}

#[rocket::async_test]
async fn news_with_unavailable_provider_keeps_articles() {
    let feed = StaticFeed {
        entries: vec![entry(0, "Body")],
        fail: false,
    };
    let client = client_with(Arc::new(UnavailableProvider::new("Invalid AI Provider")), feed).await;
    let response = client.get("/api/news").dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body[0]["summary"], "AI Service Unavailable: Invalid AI Provider");
}

#[rocket::async_test]
async fn chat_returns_answer() {
    let client = stub_client().await;
    let response = client
        .post("/api/chat")
        .header(ContentType::JSON)
        .body(r#"{"content":"Article text","query":"What happened?"}"#)
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["answer"], "Stub answer");
}

#[rocket::async_test]
async fn chat_failure_is_still_200_with_sentinel() {
    let client = client_with(Arc::new(StubProvider::failing_chat("boom")), StaticFeed {
        entries: Vec::new(),
        fail: false,
    })
    .await;
    let response = client
        .post("/api/chat")
        .header(ContentType::JSON)
        .body(r#"{"content":"a","query":"q"}"#)
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert!(body["answer"]
        .as_str()
        .unwrap()
        .starts_with("Error processing query with Stub"));
}

#[rocket::async_test]
async fn malformed_chat_body_is_rejected() {
    let client = stub_client().await;
    let response = client
        .post("/api/chat")
        .header(ContentType::JSON)
        .body(r#"{"content":"missing query"}"#)
        .dispatch()
        .await;

    assert_eq!(response.status().class(), rocket::http::StatusClass::ClientError);
}

#[rocket::async_test]
async fn speak_returns_wav() {
    let client = stub_client().await;
    let response = client
        .post("/api/speak")
        .header(ContentType::JSON)
        .body(r#"{"text":"Hello world"}"#)
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::WAV));
    let bytes = response.into_bytes().await.unwrap();
    assert_eq!(&bytes[0..4], b"RIFF");
}

#[rocket::async_test]
async fn speak_empty_text_is_500() {
    let client = stub_client().await;
    let response = client
        .post("/api/speak")
        .header(ContentType::JSON)
        .body(r#"{"text":""}"#)
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::InternalServerError);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["detail"], "Failed to generate audio");
}

#[rocket::async_test]
async fn voice_chat_returns_wav() {
    let client = stub_client().await;
    let response = client
        .post("/api/voice-chat")
        .header(ContentType::JSON)
        .body(r#"{"content":"Article text","query":"Tell me more"}"#)
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::WAV));
}

#[rocket::async_test]
async fn voice_chat_failure_is_500() {
    let client = client_with(Arc::new(StubProvider::failing_chat("down")), StaticFeed {
        entries: Vec::new(),
        fail: false,
    })
    .await;
    let response = client
        .post("/api/voice-chat")
        .header(ContentType::JSON)
        .body(r#"{"content":"a","query":"q"}"#)
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::InternalServerError);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["detail"], "Failed to generate voice response");
}

#[rocket::async_test]
async fn cors_headers_for_allowed_origin() {
    let client = stub_client().await;
    let response = client
        .options("/api/chat")
        .header(Header::new("Origin", "http://localhost:3000"))
        .header(Header::new("Access-Control-Request-Method", "POST"))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::NoContent);
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Origin"),
        Some("http://localhost:3000")
    );
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Credentials"),
        Some("true")
    );

    let other = client
        .get("/")
        .header(Header::new("Origin", "https://elsewhere.example"))
        .dispatch()
        .await;
    assert!(other.headers().get_one("Access-Control-Allow-Origin").is_none());
}
