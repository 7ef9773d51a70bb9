//! Semantic re-validation
//!
//! Asks the generation service whether a complex candidate actually answers
//! the question. The judgment is advisory: anything unclear, including a
//! failed call, comes back as `Inconclusive`.

use crate::llm::TextGenerator;
use crate::prompts::{PromptEnvelope, VERDICT_REGENERATE};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

lazy_static! {
    static ref VALID_WORD: Regex = Regex::new(r"(?i)\bVALID\b").expect("verdict pattern");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Valid,
    Regenerate,
    Inconclusive,
}

/// Map a judgment answer to a verdict. `REGENERATE` wins when both words
/// appear; `INVALID` alone is not a `VALID`.
pub fn parse_verdict(answer: &str) -> Verdict {
    if answer.to_uppercase().contains(VERDICT_REGENERATE) {
        Verdict::Regenerate
    } else if VALID_WORD.is_match(answer) {
        Verdict::Valid
    } else {
        Verdict::Inconclusive
    }
}

pub struct SemanticRevalidator {
    generator: Arc<dyn TextGenerator>,
    max_tokens: u32,
    retries: u32,
}

impl SemanticRevalidator {
    pub fn new(generator: Arc<dyn TextGenerator>, max_tokens: u32, retries: u32) -> Self {
        Self {
            generator,
            max_tokens,
            retries,
        }
    }

    pub async fn check(&self, envelope: &PromptEnvelope, sql: &str) -> Verdict {
        let prompt = envelope.judgment(sql);
        match self.generator.generate(&prompt, self.max_tokens, self.retries).await {
            Ok(answer) => {
                let verdict = parse_verdict(&answer);
                info!("Semantic check verdict {:?} (answer: {:?})", verdict, answer.trim());
                verdict
            }
            Err(e) => {
                warn!("Semantic check failed, treating as inconclusive: {}", e);
                Verdict::Inconclusive
            }
        }
    }
}
