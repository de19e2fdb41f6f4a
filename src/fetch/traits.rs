use crate::model::FetchError;
use std::sync::Arc;
use std::time::Duration;

/// Starts a browsing engine for one scrape cycle.
#[async_trait::async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn Browser>, FetchError>;
}

/// A running engine shared by all workers of a cycle.
#[async_trait::async_trait]
pub trait Browser: Send + Sync {
    async fn new_session(&self, user_agent: &str) -> Result<Box<dyn BrowserSession>, FetchError>;
    async fn shutdown(&self);
}

/// One page/tab owned by a single worker.
#[async_trait::async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), FetchError>;
    /// Waits until `selector` matches and returns its text.
    async fn wait_for_text(&mut self, selector: &str, timeout: Duration) -> Result<String, FetchError>;
    async fn move_pointer(&mut self, x: f64, y: f64) -> Result<(), FetchError>;
    async fn close(self: Box<Self>);
}
