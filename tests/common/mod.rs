#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use video_insights::config::{LlmConfig, PipelineConfig};
use video_insights::db::{ensure_read_only, QueryExecutor, ScalarValue};
use video_insights::error::{InsightsError, Result};
use video_insights::llm::TextGenerator;

pub const COMPLEX_SQL: &str = "SELECT v.creator_id, SUM(s.delta_views_count) FROM video_snapshots s JOIN videos v ON s.video_id=v.id WHERE s.created_at >= '2025-11-28' AND s.created_at <= '2025-11-29' GROUP BY v.creator_id HAVING COUNT(*) > 1;";

/// Scripted generator: replies are queued per prompt kind.
#[derive(Default)]
pub struct ScriptedGenerator {
    sql: Mutex<VecDeque<std::result::Result<String, String>>>,
    tasks: Mutex<VecDeque<std::result::Result<String, String>>>,
    judgments: Mutex<VecDeque<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sql(self, reply: &str) -> Self {
        self.sql.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn sql_failure(self, cause: &str) -> Self {
        self.sql.lock().unwrap().push_back(Err(cause.to_string()));
        self
    }

    pub fn task(self, reply: &str) -> Self {
        self.tasks.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn judgment(self, reply: &str) -> Self {
        self.judgments.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn judgment_failure(self, cause: &str) -> Self {
        self.judgments.lock().unwrap().push_back(Err(cause.to_string()));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn judgment_prompts(&self) -> Vec<String> {
        self.prompts()
            .into_iter()
            .filter(|p| is_judgment(p))
            .collect()
    }

    pub fn generation_prompts(&self) -> Vec<String> {
        self.prompts()
            .into_iter()
            .filter(|p| !is_judgment(p))
            .collect()
    }
}

fn is_judgment(prompt: &str) -> bool {
    prompt.starts_with("Проверь, отвечает ли")
}

fn is_task(prompt: &str) -> bool {
    prompt.starts_with("Ты — аналитик данных")
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, _max_tokens: u32, _retries: u32) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let queue = if is_judgment(prompt) {
            &self.judgments
        } else if is_task(prompt) {
            &self.tasks
        } else {
            &self.sql
        };
        match queue.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(cause)) => Err(InsightsError::Generation(cause)),
            None => Err(InsightsError::Generation("script exhausted".to_string())),
        }
    }
}

/// Executor double: applies the real read-only guard, then returns a fixed value.
pub struct FakeExecutor {
    value: ScalarValue,
    executed: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub fn returning(value: ScalarValue) -> Self {
        Self {
            value,
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for FakeExecutor {
    async fn execute_scalar(&self, sql: &str) -> Result<ScalarValue> {
        ensure_read_only(sql)?;
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(self.value.clone())
    }
}

pub fn pipeline_config() -> PipelineConfig {
    PipelineConfig::default()
}

/// Canned behaviour of the fake chat-completions endpoint
#[derive(Clone)]
pub enum FakeReply {
    Status(u16, String),
    /// Accept the request and never answer
    Hang,
}

impl FakeReply {
    pub fn ok_json(body: &str) -> Self {
        FakeReply::Status(200, body.to_string())
    }

    pub fn completion(content: &str) -> Self {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        });
        FakeReply::Status(200, body.to_string())
    }
}

pub struct FakeServer {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeServer {
    /// Replies are served in order; the last one repeats.
    pub async fn start(replies: Vec<FakeReply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let server_hits = Arc::clone(&hits);
        let server_requests = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                let index = server_hits.fetch_add(1, Ordering::SeqCst);
                let reply = replies
                    .get(index)
                    .or_else(|| replies.last())
                    .cloned()
                    .unwrap_or(FakeReply::Hang);
                let requests = Arc::clone(&server_requests);
                tokio::spawn(handle_connection(stream, reply, requests));
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            hits,
            requests,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn llm_config(&self, timeout: Duration) -> LlmConfig {
        LlmConfig {
            api_key: "test-key".to_string(),
            base_url: self.base_url.clone(),
            model: "test-model".to_string(),
            temperature: 0.1,
            timeout,
            backoff_unit: Duration::from_millis(1),
        }
    }
}

async fn handle_connection(mut stream: TcpStream, reply: FakeReply, requests: Arc<Mutex<Vec<String>>>) {
    let request = read_request(&mut stream).await;
    requests.lock().unwrap().push(request);

    match reply {
        FakeReply::Hang => {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        FakeReply::Status(code, body) => {
            let response = format!(
                "HTTP/1.1 {} Fake\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                code,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    }
}

/// Read headers plus a Content-Length body.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buffer.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buffer);
        if let Some(headers_end) = text.find("\r\n\r\n") {
            let content_length = text[..headers_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buffer.len() >= headers_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buffer).to_string()
}
