//! Generation strategies
//!
//! `Direct` asks for SQL straight away; `TwoStage` first asks the model to
//! restate the question as a task and then asks for SQL from that task.
//! Both hand raw model text back to the orchestrator.

use crate::config::PipelineConfig;
use crate::error::{InsightsError, Result};
use crate::llm::TextGenerator;
use crate::prompts::PromptEnvelope;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStrategy {
    #[default]
    Direct,
    TwoStage,
}

impl GenerationStrategy {
    /// Number of generation calls one round of this strategy makes
    pub fn calls_per_round(&self) -> u32 {
        match self {
            GenerationStrategy::Direct => 1,
            GenerationStrategy::TwoStage => 2,
        }
    }

    pub async fn generate(
        &self,
        generator: &dyn TextGenerator,
        envelope: &PromptEnvelope,
        config: &PipelineConfig,
    ) -> Result<String> {
        match self {
            GenerationStrategy::Direct => {
                generator
                    .generate(&envelope.direct_sql(), config.max_tokens, config.generation_retries)
                    .await
            }
            GenerationStrategy::TwoStage => {
                let task = generator
                    .generate(
                        &envelope.task_description(),
                        config.task_max_tokens,
                        config.generation_retries,
                    )
                    .await?;
                debug!("Task description: {}", task.trim());
                generator
                    .generate(
                        &envelope.sql_from_task(&task),
                        config.max_tokens,
                        config.generation_retries,
                    )
                    .await
            }
        }
    }
}

impl fmt::Display for GenerationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationStrategy::Direct => write!(f, "direct"),
            GenerationStrategy::TwoStage => write!(f, "two_stage"),
        }
    }
}

impl FromStr for GenerationStrategy {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "single" => Ok(GenerationStrategy::Direct),
            "two_stage" | "two-stage" | "twostage" => Ok(GenerationStrategy::TwoStage),
            other => Err(InsightsError::Config(format!(
                "Unknown generation strategy '{}' (expected direct or two_stage)",
                other
            ))),
        }
    }
}
