//! Chat front end
//!
//! Long-polls Telegram for text messages and answers each one in its own
//! task. Requests share nothing but the handler's pipeline and executor.

pub mod handler;
pub mod telegram;

pub use handler::*;
pub use telegram::*;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const POLL_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_ERROR_PAUSE: Duration = Duration::from_secs(5);

pub fn poll_timeout() -> Duration {
    POLL_TIMEOUT
}

/// Poll forever; transport errors are logged and polling resumes.
pub async fn run_polling(client: Arc<TelegramClient>, handler: Arc<ChatHandler>) {
    info!("Bot started, waiting for messages");
    let mut offset = 0;

    loop {
        let updates = match client.get_updates(offset, POLL_TIMEOUT).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!("Polling failed: {}", e);
                tokio::time::sleep(POLL_ERROR_PAUSE).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(message) = update.message else { continue };
            let Some(text) = message.text else {
                debug!("Skipping non-text message {}", message.message_id);
                continue;
            };

            let client = Arc::clone(&client);
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let reply = handler.reply(&text).await;
                if let Err(e) = client
                    .send_message(message.chat.id, &reply, Some(message.message_id))
                    .await
                {
                    warn!("Failed to reply in chat {}: {}", message.chat.id, e);
                }
            });
        }
    }
}
