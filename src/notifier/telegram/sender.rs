// notifier/telegram/sender.rs

use crate::model::NotifyError;
use crate::notifier::telegram::TelegramNotifier;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Sends a simple text message via Telegram.
pub async fn send_text(notifier: &TelegramNotifier, text: &str) -> Result<(), NotifyError> {
    let params = [
        ("chat_id", notifier.chat_id.to_string()),
        ("text", text.to_string()),
    ];
    let response = notifier
        .client
        .post(notifier.method_url("sendMessage"))
        .form(&params)
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_else(|_| "unknown".into());
        warn!("❌ Telegram text error [{}]: {}", status, body);
        return Err(NotifyError::Api { status: status.as_u16(), body });
    }
    info!("✅ Telegram text sent [{}]", status);
    Ok(())
}

/// Uploads a report file as a document with a caption.
pub async fn send_document(
    notifier: &TelegramNotifier,
    path: &Path,
    caption: &str,
) -> Result<(), NotifyError> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("report.csv")
        .to_string();
    let part = Part::bytes(bytes).file_name(file_name).mime_str("text/csv")?;
    let form = Form::new()
        .text("chat_id", notifier.chat_id.to_string())
        .text("caption", caption.to_string())
        .part("document", part);

    info!("📤 Sending {} to Telegram", path.display());
    let response = match timeout(
        DOCUMENT_TIMEOUT,
        notifier
            .client
            .post(notifier.method_url("sendDocument"))
            .timeout(DOCUMENT_TIMEOUT)
            .multipart(form)
            .send(),
    )
    .await
    {
        Ok(Ok(resp)) => resp,
        Ok(Err(e)) => return Err(NotifyError::Http(e)),
        Err(_) => {
            warn!("⏳ Telegram sendDocument timed out");
            return Err(NotifyError::Unreachable);
        }
    };

    let status = response.status();
    let body = response.text().await.unwrap_or_else(|_| "unknown".into());
    if !status.is_success() {
        warn!("❌ Telegram API responded [{}]: {}", status, body);
        return Err(NotifyError::Api { status: status.as_u16(), body });
    }
    info!("✅ File {} sent [{}]", path.display(), status);
    Ok(())
}
