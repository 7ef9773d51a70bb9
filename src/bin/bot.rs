//! Telegram bot front end
//!
//! Run with: cargo run --bin bot

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use video_insights::bot::{poll_timeout, run_polling, ChatHandler, TelegramClient, DEFAULT_API_URL};
use video_insights::config::AppConfig;
use video_insights::context::AppContext;
use video_insights::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();

    let config = AppConfig::from_env()?;
    let token = config
        .telegram_token
        .clone()
        .context("TELEGRAM_BOT_TOKEN is not set (see .env)")?;
    let api_url = std::env::var("TELEGRAM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

    let context = AppContext::init(config)?;
    // Connect up front so a bad database configuration fails at startup.
    let executor = context.executor().await?;
    let handler = Arc::new(ChatHandler::new(context.pipeline(), executor));
    let client = Arc::new(TelegramClient::new(&api_url, &token, poll_timeout())?);

    tokio::select! {
        _ = run_polling(client, handler) => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            info!("Shutdown requested");
        }
    }

    context.shutdown().await;
    Ok(())
}
