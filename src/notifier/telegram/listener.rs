// notifier/telegram/listener.rs

use crate::notifier::telegram::TelegramNotifier;
use crate::notifier::telegram::command_handler::handle_command;
use serde::Deserialize;
use std::sync::atomic::Ordering;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct TelegramApiResponse {
    result: Vec<TelegramUpdate>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    chat: TelegramChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

/// Polls for Telegram updates and feeds messages from the operator chat to the handler.
pub async fn listen_for_commands(notifier: &TelegramNotifier) {
    let url = notifier.method_url("getUpdates");
    loop {
        let offset = notifier.offset.load(Ordering::SeqCst);
        let response = notifier
            .client
            .get(&url)
            .query(&[("offset", offset.to_string())])
            .send()
            .await;

        match response {
            Ok(resp) => match resp.json::<TelegramApiResponse>().await {
                Ok(api_response) => {
                    for update in api_response.result {
                        if let Some(message) = update.message.as_ref() {
                            if message.chat.id != notifier.chat_id {
                                debug!("Ignoring message from chat {}", message.chat.id);
                            } else if let Some(text) = message.text.as_deref() {
                                handle_command(text, notifier).await;
                            }
                        }
                        notifier.offset.store(update.update_id + 1, Ordering::SeqCst);
                    }
                }
                Err(e) => warn!("❌ Cannot decode Telegram updates: {}", e),
            },
            Err(e) => warn!("❌ getUpdates failed: {}", e),
        }
        sleep(Duration::from_secs(1)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_updates_with_and_without_messages() {
        let raw = r#"{
            "ok": true,
            "result": [
                {"update_id": 10, "message": {"message_id": 1, "chat": {"id": 42, "type": "private"}, "text": "/start"}},
                {"update_id": 11, "edited_message": {"message_id": 1}},
                {"update_id": 12, "message": {"message_id": 2, "chat": {"id": 7}, "sticker": {}}}
            ]
        }"#;
        let response: TelegramApiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.result.len(), 3);
        let first = response.result[0].message.as_ref().unwrap();
        assert_eq!(first.chat.id, 42);
        assert_eq!(first.text.as_deref(), Some("/start"));
        assert!(response.result[1].message.is_none());
        assert!(response.result[2].message.as_ref().unwrap().text.is_none());
    }
}
