//! Configuration
//!
//! Everything is read from the process environment (after `.env` has been
//! loaded by the binaries). Lookups go through a closure so tests can supply
//! their own variables without touching the process environment.

use crate::error::{InsightsError, Result};
use crate::strategy::GenerationStrategy;
use sqlx::postgres::PgConnectOptions;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connection settings for the chat-completions endpoint
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    /// Retry `n` sleeps `n * 2` of these units
    pub backoff_unit: Duration,
}

/// Knobs of the generation and validation pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub strategy: GenerationStrategy,
    pub max_tokens: u32,
    pub task_max_tokens: u32,
    pub judge_max_tokens: u32,
    pub generation_retries: u32,
    pub retry_budget: u32,
    pub semantic_check: bool,
    pub fail_open_on_ambiguous_verdict: bool,
    pub fail_open_on_budget_exhaustion: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: GenerationStrategy::Direct,
            max_tokens: 256,
            task_max_tokens: 256,
            judge_max_tokens: 10,
            generation_retries: 3,
            retry_budget: 2,
            semantic_check: true,
            fail_open_on_ambiguous_verdict: true,
            fail_open_on_budget_exhaustion: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub connect_options: PgConnectOptions,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub database: Option<DatabaseConfig>,
    pub telegram_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let api_key = env
            .get("LLM_API_KEY")
            .or_else(|| env.get("OPENAI_API_KEY"))
            .ok_or_else(|| InsightsError::Config("LLM_API_KEY (or OPENAI_API_KEY) is not set".to_string()))?;

        let llm = LlmConfig {
            api_key,
            base_url: env
                .get("LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: env.get("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: env.parse_or("LLM_TEMPERATURE", 0.1)?,
            timeout: Duration::from_secs(env.parse_or("LLM_TIMEOUT_SECS", 30)?),
            backoff_unit: Duration::from_millis(env.parse_or("LLM_BACKOFF_MS", 1000)?),
        };

        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            strategy: env.parse_or("PIPELINE_STRATEGY", defaults.strategy)?,
            max_tokens: env.parse_or("LLM_MAX_TOKENS", defaults.max_tokens)?,
            task_max_tokens: env.parse_or("LLM_TASK_MAX_TOKENS", defaults.task_max_tokens)?,
            judge_max_tokens: env.parse_or("LLM_JUDGE_MAX_TOKENS", defaults.judge_max_tokens)?,
            generation_retries: env.parse_or("LLM_RETRIES", defaults.generation_retries)?,
            retry_budget: env.parse_or("PIPELINE_RETRY_BUDGET", defaults.retry_budget)?,
            semantic_check: env.flag_or("PIPELINE_SEMANTIC_CHECK", defaults.semantic_check)?,
            fail_open_on_ambiguous_verdict: env
                .flag_or("PIPELINE_FAIL_OPEN_VERDICT", defaults.fail_open_on_ambiguous_verdict)?,
            fail_open_on_budget_exhaustion: env
                .flag_or("PIPELINE_FAIL_OPEN_BUDGET", defaults.fail_open_on_budget_exhaustion)?,
        };

        Ok(Self {
            llm,
            pipeline,
            database: database_config(&env)?,
            telegram_token: env.get("TELEGRAM_BOT_TOKEN"),
        })
    }
}

/// `DATABASE_URL` wins; otherwise the connection is assembled from the
/// individual `DB_*` variables. Neither present means no database.
fn database_config<F>(env: &Env<F>) -> Result<Option<DatabaseConfig>>
where
    F: Fn(&str) -> Option<String>,
{
    let connect_options = if let Some(url) = env.get("DATABASE_URL") {
        PgConnectOptions::from_str(&url)
            .map_err(|e| InsightsError::Config(format!("Invalid DATABASE_URL: {}", e)))?
    } else if let Some(host) = env.get("DB_HOST") {
        let mut options = PgConnectOptions::new()
            .host(&host)
            .port(env.parse_or("DB_PORT", 5432)?);
        if let Some(name) = env.get("DB_NAME") {
            options = options.database(&name);
        }
        if let Some(user) = env.get("DB_USER") {
            options = options.username(&user);
        }
        if let Some(password) = env.get("DB_PASSWORD") {
            options = options.password(&password);
        }
        options
    } else {
        return Ok(None);
    };

    Ok(Some(DatabaseConfig {
        connect_options,
        max_connections: env.parse_or("DB_MAX_CONNECTIONS", 5)?,
        acquire_timeout: Duration::from_secs(env.parse_or("DB_ACQUIRE_TIMEOUT_SECS", 30)?),
    }))
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Blank values count as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .map_err(|e| InsightsError::Config(format!("Invalid value for {}: '{}' ({})", key, raw, e))),
            None => Ok(default),
        }
    }

    fn flag_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(InsightsError::Config(format!(
                    "Invalid value for {}: '{}' (expected true/false)",
                    key, raw
                ))),
            },
            None => Ok(default),
        }
    }
}
