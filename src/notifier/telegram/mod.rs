pub mod command_handler;
pub mod listener;
pub mod sender;

use crate::model::{ListingId, NotifyError};
use crate::notifier::DeliverySink;
use crate::scheduler::{ScheduleHandle, SchedulerPhase};
use chrono::Local;
use command_handler::Conversation;
use reqwest::Client;
use std::path::Path;
use std::sync::atomic::AtomicI64;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::watch;

pub const TELEGRAM_API: &str = "https://api.telegram.org";

pub struct TelegramNotifier {
    pub bot_token: String,
    pub chat_id: i64,
    pub client: Client,
    pub offset: Arc<AtomicI64>,
    pub schedule: ScheduleHandle,
    pub phase: watch::Receiver<SchedulerPhase>,
    pub listings: Vec<ListingId>,
    pub start_time: Instant,
    pub conversation: Mutex<Conversation>,
}

impl TelegramNotifier {
    pub fn new(
        bot_token: String,
        chat_id: i64,
        schedule: ScheduleHandle,
        phase: watch::Receiver<SchedulerPhase>,
        listings: Vec<ListingId>,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            bot_token,
            chat_id,
            client,
            offset: Arc::new(AtomicI64::new(0)),
            schedule,
            phase,
            listings,
            start_time: Instant::now(),
            conversation: Mutex::new(Conversation::default()),
        })
    }

    pub fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", TELEGRAM_API, self.bot_token, method)
    }

    pub async fn notify_text(&self, text: &str) -> Result<(), NotifyError> {
        sender::send_text(self, text).await
    }

    pub async fn listen_for_commands(&self) {
        listener::listen_for_commands(self).await;
    }

    pub async fn set_my_commands(&self) -> Result<(), NotifyError> {
        let commands = serde_json::json!({
            "commands": [
                { "command": "start", "description": "Schedule a daily price scrape" },
                { "command": "status", "description": "Show scheduler status" },
                { "command": "cancel", "description": "Abort scheduling" },
                { "command": "ping", "description": "Check connection" },
                { "command": "help", "description": "Command list" }
            ]
        });
        self.client
            .post(self.method_url("setMyCommands"))
            .json(&commands)
            .send()
            .await?;
        Ok(())
    }

    pub fn spawn_listener(notifier: Arc<TelegramNotifier>) {
        tokio::spawn(async move {
            tracing::info!("▶️ Starting Telegram listener...");
            notifier.listen_for_commands().await;
            tracing::info!("🛑 Telegram listener ended.");
        });
    }
}

#[async_trait::async_trait]
impl DeliverySink for TelegramNotifier {
    async fn deliver(&self, path: &Path, listing: &ListingId) -> Result<(), NotifyError> {
        let caption = format!(
            "Prices for {}.\nUpdated {}",
            listing,
            Local::now().format("%Y-%m-%d %H:%M")
        );
        sender::send_document(self, path, &caption).await
    }
}
