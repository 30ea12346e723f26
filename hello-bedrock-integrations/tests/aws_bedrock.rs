//! Prompts `AwsBedrock` against a mocked Bedrock runtime endpoint.
use hello_bedrock_core::{CredentialRecord, SimplePrompt as _};
use hello_bedrock_integrations::aws_bedrock::{AwsBedrock, AwsBedrockBuilder};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path_regex},
};

const PROFILE_ID: &str = "us.meta.llama3-1-8b-instruct-v1:0";
const PROMPT: &str = "What's the meaning of 'Hello World' in programming?";

fn bedrock_for(server: &MockServer, mut builder: AwsBedrockBuilder) -> AwsBedrock {
    builder
        .region("us-east-2")
        .credentials(&CredentialRecord::new("AKIA_TEST", "secret123"))
        .endpoint_url(server.uri())
        .build()
        .unwrap()
}

async fn single_request_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let authorization = requests[0]
        .headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(
        authorization.contains("Credential=AKIA_TEST/"),
        "request was not signed with the explicit credentials: {authorization}"
    );

    serde_json::from_slice(&requests[0].body).unwrap()
}

#[test_log::test(tokio::test)]
async fn test_converse_roundtrip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/model/.+/converse$"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_json(json!({
                    "output": {
                        "message": {
                            "role": "assistant",
                            "content": [{"text": "It is the first program you write."}]
                        }
                    },
                    "stopReason": "end_turn",
                    "usage": {"inputTokens": 14, "outputTokens": 8, "totalTokens": 22},
                    "metrics": {"latencyMs": 120}
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let bedrock = bedrock_for(&server, AwsBedrock::build_converse(PROFILE_ID));

    let response = bedrock.prompt(PROMPT.into()).await.unwrap();
    assert_eq!(response, "It is the first program you write.");

    let body = single_request_body(&server).await;
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"][0]["text"], PROMPT);
    assert_eq!(body["inferenceConfig"]["maxTokens"], 500);

    let temperature = body["inferenceConfig"]["temperature"].as_f64().unwrap();
    assert!((temperature - 0.7).abs() < 1e-6, "temperature was {temperature}");
}

#[test_log::test(tokio::test)]
async fn test_llama_invoke_model_roundtrip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/model/.+/invoke$"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_json(json!({
                    "generation": "It is the first program you write.",
                    "prompt_token_count": 30,
                    "generation_token_count": 8,
                    "stop_reason": "stop"
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let bedrock = bedrock_for(&server, AwsBedrock::build_llama_family(PROFILE_ID));

    let response = bedrock.prompt(PROMPT.into()).await.unwrap();
    assert_eq!(response, "It is the first program you write.");

    let body = single_request_body(&server).await;
    assert_eq!(body["max_gen_len"], 500);
    assert!(
        body["prompt"]
            .as_str()
            .unwrap()
            .starts_with("<|begin_of_text|><|start_header_id|>user<|end_header_id|>")
    );
}

#[test_log::test(tokio::test)]
async fn test_throttling_is_transient_and_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/model/.+/converse$"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("content-type", "application/json")
                .insert_header("x-amzn-errortype", "ThrottlingException")
                .set_body_json(json!({
                    "message": "Too many requests, please wait before trying again."
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let bedrock = bedrock_for(&server, AwsBedrock::build_converse(PROFILE_ID));

    let err = bedrock.prompt(PROMPT.into()).await.unwrap_err();

    assert_eq!(err.kind(), "TransientError");
}

#[test_log::test(tokio::test)]
async fn test_access_denied_is_permanent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/model/.+/converse$"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("content-type", "application/json")
                .insert_header("x-amzn-errortype", "AccessDeniedException")
                .set_body_json(json!({
                    "message": "You don't have access to the model with the specified model ID."
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let bedrock = bedrock_for(&server, AwsBedrock::build_converse(PROFILE_ID));

    let err = bedrock.prompt(PROMPT.into()).await.unwrap_err();

    assert_eq!(err.kind(), "PermanentError");
    assert!(err.to_string().contains("don't have access"));
}
