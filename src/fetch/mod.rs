pub mod chromium;
pub mod fetcher;
pub mod http;
pub mod pacing;
pub mod traits;

pub use fetcher::PriceFetcher;
pub use pacing::Pacing;
pub use traits::{Browser, BrowserLauncher, BrowserSession};

use crate::config::{EngineKind, ScraperConfig};
use std::sync::Arc;

/// Launcher for the engine selected in the config.
pub fn launcher_for(config: &ScraperConfig) -> Arc<dyn BrowserLauncher> {
    match config.engine {
        EngineKind::Chromium => Arc::new(chromium::ChromiumLauncher::new(config)),
        EngineKind::Http => Arc::new(http::HttpLauncher),
    }
}
