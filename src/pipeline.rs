//! Query generation pipeline
//!
//! Explicit state machine turning a question into one SQL statement:
//!
//! ```text
//! Start -> Generating -> Extracting -> Repairing -> StructuralCheck
//!       -> ComplexityCheck -> [SemanticCheck] -> Done | Failed
//! ```
//!
//! A negative semantic verdict sends the machine back to `Generating` while
//! the retry budget lasts. Once it is spent the last candidate is returned
//! (unless fail-open on budget exhaustion is switched off).

use crate::config::PipelineConfig;
use crate::error::{InsightsError, Result};
use crate::llm::TextGenerator;
use crate::prompts::PromptEnvelope;
use crate::revalidator::{SemanticRevalidator, Verdict};
use crate::sql::{extract_sql, repair_numeric_literals, score_complexity, validate_structure, ComplexityReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const OUTPUT_PREVIEW_CHARS: usize = 200;

/// Validity of a candidate, in the order it is established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityState {
    Unparsed,
    StructurallyInvalid,
    StructurallyValid,
    ComplexityUnknown,
    ComplexityClassified,
    SemanticallyChecked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateStatement {
    pub sql: String,
    pub state: ValidityState,
    pub history: Vec<ValidityState>,
    pub complexity: Option<ComplexityReport>,
    pub verdict: Option<Verdict>,
}

impl CandidateStatement {
    fn new(sql: String) -> Self {
        Self {
            sql,
            state: ValidityState::Unparsed,
            history: vec![ValidityState::Unparsed],
            complexity: None,
            verdict: None,
        }
    }

    fn advance(&mut self, next: ValidityState) {
        self.state = next;
        self.history.push(next);
    }

    pub fn is_complex(&self) -> bool {
        self.complexity.as_ref().map_or(false, |c| c.is_complex())
    }
}

/// Bounded number of regenerations the semantic check may request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    remaining: u32,
}

impl RetryBudget {
    pub fn new(initial: u32) -> Self {
        Self { remaining: initial }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Spend one retry; `false` once nothing is left.
    pub fn try_consume(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Start,
    Generating,
    Extracting,
    Repairing,
    StructuralCheck,
    ComplexityCheck,
    SemanticCheck,
    Done,
    Failed,
}

#[derive(Debug)]
pub enum PipelineState {
    Start,
    Generating,
    Extracting(String),
    Repairing(String),
    StructuralCheck(CandidateStatement),
    ComplexityCheck(CandidateStatement),
    SemanticCheck(CandidateStatement),
    Done(CandidateStatement),
    Failed(InsightsError),
}

impl PipelineState {
    pub fn kind(&self) -> StateKind {
        match self {
            PipelineState::Start => StateKind::Start,
            PipelineState::Generating => StateKind::Generating,
            PipelineState::Extracting(_) => StateKind::Extracting,
            PipelineState::Repairing(_) => StateKind::Repairing,
            PipelineState::StructuralCheck(_) => StateKind::StructuralCheck,
            PipelineState::ComplexityCheck(_) => StateKind::ComplexityCheck,
            PipelineState::SemanticCheck(_) => StateKind::SemanticCheck,
            PipelineState::Done(_) => StateKind::Done,
            PipelineState::Failed(_) => StateKind::Failed,
        }
    }
}

/// Successful pipeline outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuery {
    pub statement: CandidateStatement,
    /// Generation rounds, including the first one
    pub rounds: u32,
    pub regenerations: u32,
    pub trace: Vec<StateKind>,
}

impl GeneratedQuery {
    pub fn sql(&self) -> &str {
        &self.statement.sql
    }
}

/// Per-request bookkeeping
struct RunContext {
    envelope: PromptEnvelope,
    budget: RetryBudget,
    rounds: u32,
    regenerations: u32,
    trace: Vec<StateKind>,
}

pub struct Pipeline {
    generator: Arc<dyn TextGenerator>,
    revalidator: SemanticRevalidator,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(generator: Arc<dyn TextGenerator>, config: PipelineConfig) -> Self {
        let revalidator = SemanticRevalidator::new(
            Arc::clone(&generator),
            config.judge_max_tokens,
            config.generation_retries,
        );
        Self {
            generator,
            revalidator,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the state machine to `Done` or `Failed`.
    pub async fn run(&self, user_query: &str) -> Result<GeneratedQuery> {
        info!(
            "Generating SQL ({} strategy) for: {}",
            self.config.strategy, user_query
        );

        let mut ctx = RunContext {
            envelope: PromptEnvelope::new(user_query),
            budget: RetryBudget::new(self.config.retry_budget),
            rounds: 0,
            regenerations: 0,
            trace: Vec::new(),
        };

        let mut state = PipelineState::Start;
        loop {
            ctx.trace.push(state.kind());
            state = match state {
                PipelineState::Done(statement) => {
                    info!(
                        "SQL ready after {} round(s): {}",
                        ctx.rounds, statement.sql
                    );
                    return Ok(GeneratedQuery {
                        statement,
                        rounds: ctx.rounds,
                        regenerations: ctx.regenerations,
                        trace: ctx.trace,
                    });
                }
                PipelineState::Failed(err) => {
                    error!("SQL generation failed after {} round(s): {}", ctx.rounds, err);
                    return Err(err);
                }
                other => self.step(other, &mut ctx).await,
            };
        }
    }

    async fn step(&self, state: PipelineState, ctx: &mut RunContext) -> PipelineState {
        match state {
            PipelineState::Start => PipelineState::Generating,

            PipelineState::Generating => {
                ctx.rounds += 1;
                debug!("Generation round {}", ctx.rounds);
                match self
                    .config
                    .strategy
                    .generate(self.generator.as_ref(), &ctx.envelope, &self.config)
                    .await
                {
                    Ok(raw) => PipelineState::Extracting(raw),
                    Err(err) => PipelineState::Failed(err),
                }
            }

            PipelineState::Extracting(raw) => {
                match extract_sql(&raw, ctx.envelope.user_query()) {
                    Some(sql) => PipelineState::Repairing(sql),
                    None => PipelineState::Failed(InsightsError::NoSqlExtracted(preview(&raw))),
                }
            }

            PipelineState::Repairing(sql) => {
                let repaired = repair_numeric_literals(&sql);
                if repaired != sql {
                    debug!("Repaired numeric literals: {}", repaired);
                }
                PipelineState::StructuralCheck(CandidateStatement::new(repaired))
            }

            PipelineState::StructuralCheck(mut candidate) => {
                let check = validate_structure(&candidate.sql);
                if check.is_valid {
                    candidate.advance(ValidityState::StructurallyValid);
                    PipelineState::ComplexityCheck(candidate)
                } else {
                    candidate.advance(ValidityState::StructurallyInvalid);
                    warn!("Structural check failed ({}): {}", check.reason, candidate.sql);
                    PipelineState::Failed(InsightsError::StructuralInvalid(check.reason))
                }
            }

            PipelineState::ComplexityCheck(mut candidate) => {
                candidate.advance(ValidityState::ComplexityUnknown);
                let report = score_complexity(&candidate.sql);
                debug!("Complexity score {} ({:?})", report.score, report.signals);
                let complex = report.is_complex();
                candidate.complexity = Some(report);
                candidate.advance(ValidityState::ComplexityClassified);

                if complex && self.config.semantic_check {
                    PipelineState::SemanticCheck(candidate)
                } else {
                    PipelineState::Done(candidate)
                }
            }

            PipelineState::SemanticCheck(mut candidate) => {
                let verdict = self.revalidator.check(&ctx.envelope, &candidate.sql).await;
                candidate.verdict = Some(verdict);
                candidate.advance(ValidityState::SemanticallyChecked);
                self.after_verdict(candidate, verdict, ctx)
            }

            // Terminal states are handled by `run`
            terminal @ (PipelineState::Done(_) | PipelineState::Failed(_)) => terminal,
        }
    }

    fn after_verdict(
        &self,
        candidate: CandidateStatement,
        verdict: Verdict,
        ctx: &mut RunContext,
    ) -> PipelineState {
        let wants_regeneration = match verdict {
            Verdict::Valid => false,
            Verdict::Inconclusive => !self.config.fail_open_on_ambiguous_verdict,
            Verdict::Regenerate => true,
        };

        if !wants_regeneration {
            return PipelineState::Done(candidate);
        }

        if ctx.budget.try_consume() {
            info!(
                "Regenerating SQL ({} retries left): {}",
                ctx.budget.remaining(),
                candidate.sql
            );
            ctx.regenerations += 1;
            ctx.envelope.reject(candidate.sql);
            return PipelineState::Generating;
        }

        if self.config.fail_open_on_budget_exhaustion {
            warn!("Retry budget exhausted, returning last candidate: {}", candidate.sql);
            PipelineState::Done(candidate)
        } else {
            PipelineState::Failed(InsightsError::SemanticRejected(candidate.sql))
        }
    }
}

fn preview(raw: &str) -> String {
    let mut text: String = raw.trim().chars().take(OUTPUT_PREVIEW_CHARS).collect();
    if raw.trim().chars().count() > OUTPUT_PREVIEW_CHARS {
        text.push('…');
    }
    text
}
