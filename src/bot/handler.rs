//! Chat message handling
//!
//! Turns one incoming text into one reply. Error details are logged but
//! never shown to the user.

use crate::db::{QueryExecutor, ScalarValue};
use crate::error::Result;
use crate::pipeline::Pipeline;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const WELCOME_TEXT: &str = "Привет! Я бот для анализа данных о видео.

Задайте вопрос на русском языке, и я верну результат в виде числа.

Примеры вопросов:
• Сколько всего видео есть в системе?
• Сколько видео набрало больше 100000 просмотров?
• На сколько просмотров в сумме выросли все видео 28 ноября 2025?
• Сколько разных видео получали новые просмотры 27 ноября 2025?";

pub const EMPTY_QUERY_TEXT: &str = "Пожалуйста, задайте вопрос.";

pub const REPHRASE_TEXT: &str = "Произошла ошибка при обработке запроса.
Пожалуйста, попробуйте переформулировать вопрос или обратитесь к администратору.";

pub const INTERNAL_ERROR_TEXT: &str = "Произошла внутренняя ошибка.
Пожалуйста, попробуйте позже или обратитесь к администратору.";

pub struct ChatHandler {
    pipeline: Arc<Pipeline>,
    executor: Arc<dyn QueryExecutor>,
}

impl ChatHandler {
    pub fn new(pipeline: Arc<Pipeline>, executor: Arc<dyn QueryExecutor>) -> Self {
        Self { pipeline, executor }
    }

    /// Question in, scalar out.
    pub async fn answer(&self, question: &str) -> Result<ScalarValue> {
        let generated = self.pipeline.run(question).await?;
        self.executor.execute_scalar(generated.sql()).await
    }

    pub async fn reply(&self, text: &str) -> String {
        let question = text.trim();

        if is_command(question, "start") || is_command(question, "help") {
            return WELCOME_TEXT.to_string();
        }
        if question.is_empty() {
            return EMPTY_QUERY_TEXT.to_string();
        }

        match self.answer(question).await {
            Ok(value) => {
                info!("Answered {:?} with {}", question, value);
                value.to_string()
            }
            Err(e) if e.is_user_facing() => {
                warn!("Could not answer {:?}: {}", question, e);
                REPHRASE_TEXT.to_string()
            }
            Err(e) => {
                error!("Internal failure answering {:?}: {}", question, e);
                INTERNAL_ERROR_TEXT.to_string()
            }
        }
    }
}

/// Matches `/name` and `/name@SomeBot`, optionally followed by arguments.
fn is_command(text: &str, name: &str) -> bool {
    text.split_whitespace()
        .next()
        .and_then(|word| word.strip_prefix('/'))
        .map_or(false, |command| command.split('@').next() == Some(name))
}
