//! Suggestion service against mocked provider endpoints

use fromptly::config::Config;
use fromptly::error::RefineError;
use fromptly::llm::factory::create_client;
use fromptly::model::GENERIC_FALLBACK;
use fromptly::service::worker::handle_request;
use fromptly::service::{ServiceReply, ServiceRequest, SuggestionService};
use mockito::Matcher;

fn config_for(provider: &str, model: &str, base_url: &str, api_key: &str) -> Config {
    let mut config = Config::default();
    config.llm.provider = provider.to_string();
    config.llm.model = model.to_string();
    config.llm.api_key_env = None;
    config.llm.api_key = Some(api_key.to_string());
    config.llm.base_url = Some(base_url.to_string());
    config
}

fn service(config: &Config) -> SuggestionService {
    SuggestionService::new(create_client(config, false).unwrap())
}

#[tokio::test]
async fn test_gemini_refine_parses_canonical_json() {
    let mut server = mockito::Server::new_async().await;
    let body = serde_json::json!({
        "candidates": [{
            "content": {
                "parts": [{
                    "text": "{\"suggestion\": \"Create a responsive card grid with 24px gaps\", \"options\": [\"with hover lift\", \"3 per row\"]}"
                }]
            }
        }]
    });
    let mock = server
        .mock(
            "POST",
            Matcher::Regex(r"^/models/gemini-2\.5-flash:generateContent".to_string()),
        )
        .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
        .match_body(Matcher::Regex("Create a card grid layout".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let config = config_for("gemini", "gemini-2.5-flash", &server.url(), "test-key");
    let result = service(&config)
        .refine("Create a card grid layout")
        .await
        .unwrap();

    assert_eq!(result.suggestion, "Create a responsive card grid with 24px gaps");
    assert_eq!(result.options, vec!["with hover lift", "3 per row"]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_anthropic_reply_with_embedded_json() {
    let mut server = mockito::Server::new_async().await;
    let body = serde_json::json!({
        "content": [{
            "type": "text",
            "text": "Here is a better prompt:\n{\"suggestion\": \"Build a sticky navbar with a blurred background\"}\nHope it helps!"
        }]
    });
    let mock = server
        .mock("POST", "/messages")
        .match_header("x-api-key", "sk-ant-test")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let config = config_for(
        "anthropic",
        "claude-sonnet-4-5-20250929",
        &server.url(),
        "sk-ant-test",
    );
    let result = service(&config).refine("make a navbar").await.unwrap();

    assert_eq!(
        result.suggestion,
        "Build a sticky navbar with a blurred background"
    );
    assert!(result.options.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_is_transport_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body("Too Many Requests")
        .create_async()
        .await;

    let config = config_for("openai", "gpt-4o-mini", &server.url(), "sk-test");
    let err = service(&config).refine("make a navbar").await.unwrap_err();

    match err {
        RefineError::Transport { status, .. } => assert_eq!(status, Some(429)),
        other => panic!("expected transport error, got {:?}", other),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_placeholder_key_fails_before_any_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let config = config_for(
        "gemini",
        "gemini-2.5-flash",
        &server.url(),
        "YOUR_GEMINI_API_KEY_HERE",
    );
    let err = service(&config).refine("make a navbar").await.unwrap_err();

    assert!(err.is_configuration());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unparseable_text_falls_back_to_heuristic() {
    let mut server = mockito::Server::new_async().await;
    let body = serde_json::json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": "1. Build a pricing table with three tiers\n2. Highlight the middle tier"
            }
        }]
    });
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let config = config_for("openai-compatible", "llama3", &server.url(), "");
    let result = service(&config).refine("pricing table").await.unwrap();

    assert_eq!(result.suggestion, "Build a pricing table with three tiers");
}

#[tokio::test]
async fn test_missing_payload_yields_generic_fallback() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", Matcher::Regex(r"^/models/".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"candidates": []}"#)
        .create_async()
        .await;

    let config = config_for("gemini", "gemini-2.5-flash", &server.url(), "test-key");
    let result = service(&config).refine("anything").await.unwrap();

    assert_eq!(result.suggestion, GENERIC_FALLBACK);
    assert!(result.options.is_empty());
}

#[tokio::test]
async fn test_error_reply_on_the_wire() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let config = config_for("openai", "gpt-4o-mini", &server.url(), "sk-test");
    let reply = handle_request(
        &service(&config),
        ServiceRequest::RefineOptions {
            prompt: "a login form".to_string(),
        },
    )
    .await;

    assert!(matches!(reply, ServiceReply::Error(_)));
    let wire = serde_json::to_value(&reply).unwrap();
    assert_eq!(wire["error"]["kind"], "transport");
}

#[tokio::test]
async fn test_transport_error_hides_api_key() {
    // Nothing listens on port 9; the request fails while connecting
    let mut config = config_for(
        "gemini",
        "gemini-2.5-flash",
        "http://127.0.0.1:9",
        "AIzaSECRET123",
    );
    config.llm.timeout_secs = 1;

    let reply = handle_request(
        &service(&config),
        ServiceRequest::RefinePrompt {
            prompt: "a login form".to_string(),
        },
    )
    .await;

    let wire = serde_json::to_string(&reply).unwrap();
    assert!(wire.contains("\"transport\""));
    assert!(!wire.contains("AIzaSECRET123"), "{}", wire);
}
