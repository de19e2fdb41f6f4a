mod config;
mod export;
mod fetch;
mod keep_alive;
mod model;
mod notifier;
mod orchestrator;
mod parser;
mod scheduler;
mod utils;

use config::{load_config, AppConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use notifier::TelegramNotifier;
use scheduler::{ScheduleHandle, Scheduler, SchedulerPhase, ScrapeJob, SystemClock};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Panic occurred: {}", panic_info);
    }));

    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config: Arc<AppConfig> = match load_config(&path) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error ({}): {}", path, e);
            return;
        }
    };
    info!(
        "Loaded {} listing(s), concurrency {}, engine {:?}",
        config.listing_ids().len(),
        config.concurrency_limit,
        config.scraper.engine
    );

    let (schedule, spec_rx) = ScheduleHandle::new(config.schedule);
    let (phase_tx, phase_rx) = watch::channel(SchedulerPhase::Idle);

    let notifier = match TelegramNotifier::new(
        config.telegram_bot_token.clone(),
        config.telegram_chat_id,
        schedule,
        phase_rx,
        config.listing_ids(),
    ) {
        Ok(n) => Arc::new(n),
        Err(e) => {
            error!("Failed to create Telegram client: {}", e);
            return;
        }
    };

    if let Some(addr) = &config.keep_alive_addr {
        if let Err(e) = keep_alive::spawn(addr) {
            warn!("Keep-alive server not started on {}: {}", addr, e);
        }
    }

    TelegramNotifier::spawn_listener(notifier.clone());
    if let Err(e) = notifier.set_my_commands().await {
        warn!("Command menu registration failed: {}", e);
    }

    info!("Sending startup message...");
    let greeting = match config.schedule {
        Some(spec) => format!("rate-sniper started, {}.", spec),
        None => "rate-sniper started. Send /start to schedule a scrape.".to_string(),
    };
    if let Err(e) = notifier.notify_text(&greeting).await {
        warn!("Startup notification failed: {}", e);
    }

    let job = ScrapeJob::from_config(&config, notifier);
    Scheduler::new(SystemClock, job, spec_rx, phase_tx).run().await;
}
