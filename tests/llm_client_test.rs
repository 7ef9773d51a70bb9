mod common;

use common::{FakeReply, FakeServer};
use std::time::Duration;
use video_insights::error::InsightsError;
use video_insights::llm::{LlmClient, TextGenerator, DEFAULT_RETRIES};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_successful_completion() {
    let server = FakeServer::start(vec![FakeReply::completion("SQL: SELECT COUNT(*) FROM videos;")]).await;
    let client = LlmClient::new(&server.llm_config(TIMEOUT)).unwrap();

    let content = client
        .generate("Сколько всего видео?", 256, DEFAULT_RETRIES)
        .await
        .unwrap();
    assert_eq!(content, "SQL: SELECT COUNT(*) FROM videos;");
    assert_eq!(server.hits(), 1);

    let requests = server.requests();
    let request = &requests[0];
    assert!(request.starts_with("POST /chat/completions"));
    assert!(request.to_ascii_lowercase().contains("authorization: bearer test-key"));

    let body = request.split("\r\n\r\n").nth(1).unwrap();
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["model"], "test-model");
    assert_eq!(json["max_tokens"], 256);
    assert_eq!(json["messages"][0]["role"], "user");
    assert_eq!(json["messages"][0]["content"], "Сколько всего видео?");
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = FakeServer::start(vec![
        FakeReply::Status(500, "{\"error\":\"boom\"}".to_string()),
        FakeReply::completion("SQL: SELECT 1;"),
    ])
    .await;
    let client = LlmClient::new(&server.llm_config(TIMEOUT)).unwrap();

    let content = client.generate("Вопрос", 64, DEFAULT_RETRIES).await.unwrap();
    assert_eq!(content, "SQL: SELECT 1;");
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn test_persistent_server_error_exhausts_attempts() {
    let server = FakeServer::start(vec![FakeReply::Status(500, "upstream overloaded".to_string())]).await;
    let client = LlmClient::new(&server.llm_config(TIMEOUT)).unwrap();

    let err = client.generate("Вопрос", 64, 3).await.unwrap_err();
    match err {
        InsightsError::Generation(cause) => {
            assert!(cause.contains("after 3 attempts"), "{}", cause);
            assert!(cause.contains("500"), "{}", cause);
            assert!(cause.contains("upstream overloaded"), "{}", cause);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn test_unauthorized_is_retried_like_other_statuses() {
    let server = FakeServer::start(vec![FakeReply::Status(401, "{\"error\":\"bad key\"}".to_string())]).await;
    let client = LlmClient::new(&server.llm_config(TIMEOUT)).unwrap();

    let err = client.generate("Вопрос", 64, 2).await.unwrap_err();
    assert!(matches!(err, InsightsError::Generation(ref cause) if cause.contains("401")));
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn test_empty_choices_fail_without_retry() {
    let server = FakeServer::start(vec![FakeReply::ok_json("{\"choices\": []}")]).await;
    let client = LlmClient::new(&server.llm_config(TIMEOUT)).unwrap();

    let err = client.generate("Вопрос", 64, DEFAULT_RETRIES).await.unwrap_err();
    assert!(matches!(err, InsightsError::Generation(ref cause) if cause.contains("empty response")));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_blank_content_counts_as_empty() {
    let server = FakeServer::start(vec![FakeReply::completion("   ")]).await;
    let client = LlmClient::new(&server.llm_config(TIMEOUT)).unwrap();

    let err = client.generate("Вопрос", 64, DEFAULT_RETRIES).await.unwrap_err();
    assert!(matches!(err, InsightsError::Generation(ref cause) if cause.contains("empty response")));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_timeouts_are_retried_then_reported() {
    let server = FakeServer::start(vec![FakeReply::Hang]).await;
    let client = LlmClient::new(&server.llm_config(Duration::from_millis(200))).unwrap();

    let err = client.generate("Вопрос", 64, 3).await.unwrap_err();
    assert!(matches!(err, InsightsError::Generation(ref cause) if cause.contains("timed out")));
    assert!(!err.is_user_facing());
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn test_zero_retries_still_makes_one_attempt() {
    let server = FakeServer::start(vec![FakeReply::completion("VALID")]).await;
    let client = LlmClient::new(&server.llm_config(TIMEOUT)).unwrap();

    assert_eq!(client.generate("Вопрос", 10, 0).await.unwrap(), "VALID");
    assert_eq!(server.hits(), 1);
}
