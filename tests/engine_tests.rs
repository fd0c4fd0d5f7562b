//! Response engine behavior against a mock HTTP backend.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use codemaster::api::{CompletionResult, Provider, ProviderKind, ProviderRegistry, ResponseEngine};
use codemaster::config::Config;

fn provider_at(kind: ProviderKind, endpoint: String, key: &str) -> Provider {
    Provider::new(
        kind,
        kind.default_model().to_string(),
        Some(endpoint),
        key.to_string(),
    )
}

fn engine_with(providers: Vec<Provider>, preferred: Option<ProviderKind>) -> ResponseEngine {
    ResponseEngine::new(ProviderRegistry::new(providers, preferred), &Config::default())
}

#[tokio::test]
async fn openai_wire_normalizes_the_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-3.5-turbo",
            "max_tokens": 2000,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [
                { "message": { "role": "assistant", "content": "Hello there!" } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_with(
        vec![provider_at(
            ProviderKind::OpenAi,
            format!("{}/v1/chat/completions", server.uri()),
            "sk-test",
        )],
        Some(ProviderKind::OpenAi),
    );

    let result = engine.respond("hi", &[]).await;
    assert_eq!(result, CompletionResult::Reply("Hello there!".to_string()));
}

#[tokio::test]
async fn anthropic_wire_uses_its_own_headers_and_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "Claude says hi" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_with(
        vec![provider_at(
            ProviderKind::Anthropic,
            format!("{}/v1/messages", server.uri()),
            "sk-ant-test",
        )],
        Some(ProviderKind::Anthropic),
    );

    let result = engine.respond("hi", &[]).await;
    assert_eq!(result, CompletionResult::Reply("Claude says hi".to_string()));
}

#[tokio::test]
async fn preferred_without_credentials_falls_back_to_first_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "from groq" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Preferred provider (openai) has no key; groq does.
    let engine = engine_with(
        vec![
            provider_at(ProviderKind::OpenAi, format!("{}/never", server.uri()), ""),
            provider_at(
                ProviderKind::Groq,
                format!("{}/openai/v1/chat/completions", server.uri()),
                "gsk-test",
            ),
        ],
        Some(ProviderKind::OpenAi),
    );

    let result = engine.respond("hi", &[]).await;
    assert_eq!(result, CompletionResult::Reply("from groq".to_string()));
}

#[tokio::test]
async fn no_credentials_fails_without_any_network_attempt() {
    let server = MockServer::start().await;
    // Any request hitting the server at all is a test failure.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let engine = engine_with(
        vec![
            provider_at(ProviderKind::OpenAi, format!("{}/a", server.uri()), ""),
            provider_at(ProviderKind::Groq, format!("{}/b", server.uri()), ""),
        ],
        Some(ProviderKind::Groq),
    );

    match engine.respond("hi", &[]).await {
        CompletionResult::Failed { provider, reason } => {
            assert_eq!(provider, None);
            assert!(reason.contains("No AI providers configured"));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn api_errors_degrade_to_a_displayable_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(500).set_body_string("upstream exploded"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_with(
        vec![provider_at(
            ProviderKind::Groq,
            format!("{}/chat", server.uri()),
            "gsk-test",
        )],
        Some(ProviderKind::Groq),
    );

    match engine.respond("hi", &[]).await {
        CompletionResult::Failed { provider, reason } => {
            assert_eq!(provider, Some(ProviderKind::Groq));
            assert!(reason.contains("groq"), "reason names the provider: {reason}");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    // Single attempt: the mock's expect(1) verifies no retry happened.
}

#[tokio::test]
async fn history_and_new_input_travel_in_the_request() {
    use codemaster::chat::{ConversationTurn, Role};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "messages": [
                {},
                { "role": "user", "content": "earlier question" },
                { "role": "assistant", "content": "earlier answer" },
                { "role": "user", "content": "new question" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "ok" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_with(
        vec![provider_at(
            ProviderKind::Groq,
            format!("{}/chat", server.uri()),
            "gsk-test",
        )],
        Some(ProviderKind::Groq),
    );

    let history = vec![
        ConversationTurn::new(Role::User, "earlier question".to_string()),
        ConversationTurn::new(Role::Assistant, "earlier answer".to_string()),
    ];
    let result = engine.respond("new question", &history).await;
    assert_eq!(result, CompletionResult::Reply("ok".to_string()));
}
