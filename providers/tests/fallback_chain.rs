//! Integration tests for the online fallback chain against mock HTTP providers.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use sentinel_knowledge::KnowledgeStore;
use sentinel_providers::{
    AnswerSource, HUGGINGFACE_API_KEY, HuggingFaceProvider, OPENAI_API_KEY, OpenAiProvider,
    ProviderCredentials, ProviderRouter,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn router(openai: &MockServer, hf: &MockServer) -> ProviderRouter {
    ProviderRouter::new(Arc::new(KnowledgeStore::from_pairs(Vec::new())))
        .with_provider(Arc::new(OpenAiProvider::new().with_base_url(openai.uri())))
        .with_provider(Arc::new(
            HuggingFaceProvider::new()
                .with_base_url(hf.uri())
                .with_model("acme/guard"),
        ))
}

#[tokio::test]
async fn test_only_huggingface_configured() {
    let openai = MockServer::start().await;
    let hf = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/acme/guard"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{ "generated_text": "Enable MFA everywhere." }])),
        )
        .expect(1)
        .mount(&hf)
        .await;

    let credentials = ProviderCredentials::new().with(HUGGINGFACE_API_KEY, "hf_test");
    let answer = router(&openai, &hf)
        .await
        .answer_online("how do I protect my accounts", &credentials)
        .await
        .unwrap();

    assert_eq!(answer.text, "Enable MFA everywhere.");
    assert_eq!(answer.source, AnswerSource::Online);
    assert_eq!(answer.provenance.provider, "huggingface");
    assert_eq!(answer.provenance.model.as_deref(), Some("acme/guard"));
}

#[tokio::test]
async fn test_openai_outage_falls_back_to_huggingface() {
    let openai = MockServer::start().await;
    let hf = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "generated_text": "Rotate the key." })),
        )
        .expect(1)
        .mount(&hf)
        .await;

    let credentials = ProviderCredentials::new()
        .with(OPENAI_API_KEY, "sk-test")
        .with(HUGGINGFACE_API_KEY, "hf_test");
    let answer = router(&openai, &hf)
        .await
        .answer_online("my api key leaked", &credentials)
        .await
        .unwrap();

    assert_eq!(answer.text, "Rotate the key.");
}

#[tokio::test]
async fn test_all_providers_fail() {
    let openai = MockServer::start().await;
    let hf = MockServer::start().await;

    for server in [&openai, &hf] {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(server)
            .await;
    }

    let credentials = ProviderCredentials::new()
        .with(OPENAI_API_KEY, "sk-test")
        .with(HUGGINGFACE_API_KEY, "hf_test");
    let answer = router(&openai, &hf)
        .await
        .answer_online("anything", &credentials)
        .await;

    assert_eq!(answer, None);
}
