// notifier/telegram/command_handler.rs

use crate::model::ScheduleSpec;
use crate::notifier::telegram::TelegramNotifier;
use chrono::NaiveTime;
use tracing::{info, warn};

const TIME_PROMPT: &str = "Enter the daily start time as 'HH:MM' (or 'YYYY-MM-DD HH:MM').\n\n\
    Note: every listing is fetched once per day with a pause of several seconds, \
    so long ranges take hours. Plan accordingly.";
const DAYS_PROMPT: &str = "How many days ahead should be scraped? (e.g. 7, 15, 30, 90)";
const HELP: &str = "Available commands:\n\
    /start - schedule a daily price scrape\n\
    /status - scheduler status\n\
    /cancel - abort scheduling\n\
    /ping - check connection\n\
    /help - command list";

/// Where the operator is in the scheduling dialogue.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Conversation {
    #[default]
    Idle,
    WaitingForTime,
    WaitingForDays(NaiveTime),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Reply(String),
    AskTime,
    Schedule(ScheduleSpec),
    Status,
}

/// Advances the dialogue by one message. Malformed input keeps the current step.
pub fn step(state: &mut Conversation, text: &str) -> Action {
    let text = text.trim();
    if let Some(command) = text.strip_prefix('/') {
        let command = command.split(['@', ' ']).next().unwrap_or_default();
        return match command {
            "start" => {
                *state = Conversation::WaitingForTime;
                Action::AskTime
            }
            "cancel" => {
                *state = Conversation::Idle;
                Action::Reply("Scheduling cancelled. The current schedule is unchanged.".to_string())
            }
            "status" => Action::Status,
            "ping" => Action::Reply("I am online!".to_string()),
            "help" => Action::Reply(HELP.to_string()),
            _ => Action::Reply("Unknown command. Type /help for a list of commands.".to_string()),
        };
    }

    match *state {
        Conversation::Idle => Action::Reply("Send /start to schedule a price scrape.".to_string()),
        Conversation::WaitingForTime => match ScheduleSpec::parse_time(text) {
            Ok(time) => {
                *state = Conversation::WaitingForDays(time);
                Action::Reply(format!("Start time set to {}. {}", time.format("%H:%M"), DAYS_PROMPT))
            }
            Err(e) => Action::Reply(format!("{}. Please try again.", e)),
        },
        Conversation::WaitingForDays(time) => match ScheduleSpec::parse_days(text) {
            Ok(days) => {
                *state = Conversation::Idle;
                Action::Schedule(ScheduleSpec::new(time, days))
            }
            Err(e) => Action::Reply(format!("{}. Please try again.", e)),
        },
    }
}

fn status_message(notifier: &TelegramNotifier) -> String {
    let uptime = notifier.start_time.elapsed().as_secs();
    let phase = *notifier.phase.borrow();
    let listings: Vec<&str> = notifier.listings.iter().map(|l| l.as_str()).collect();
    format!(
        "Scheduler: {}\nListings ({}): {}\nUptime: {:02}:{:02}:{:02}",
        phase,
        listings.len(),
        listings.join(", "),
        uptime / 3600,
        (uptime % 3600) / 60,
        uptime % 60
    )
}

/// Handles an incoming message and triggers the corresponding action.
pub async fn handle_command(command_text: &str, notifier: &TelegramNotifier) {
    info!("📩 Handling message: {}", command_text);
    let action = {
        let mut conversation = notifier
            .conversation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        step(&mut conversation, command_text)
    };

    let reply = match action {
        Action::Reply(text) => text,
        Action::AskTime => match notifier.schedule.current() {
            Some(current) => format!("Current schedule: {}.\n\n{}", current, TIME_PROMPT),
            None => TIME_PROMPT.to_string(),
        },
        Action::Status => status_message(notifier),
        Action::Schedule(spec) => {
            notifier.schedule.replace(spec);
            format!("Scheduled {}. Send /start again to change it.", spec)
        }
    };
    if let Err(e) = notifier.notify_text(&reply).await {
        warn!("❌ Reply failed: {}", e);
    }
}
