pub mod telegram;

pub use telegram::TelegramNotifier;

use crate::model::{ListingId, NotifyError};
use std::path::Path;

/// Takes a finished report off-system. Called once per report, never retried.
#[async_trait::async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, path: &Path, listing: &ListingId) -> Result<(), NotifyError>;
}
