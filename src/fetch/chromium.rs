// Headless Chromium engine driven over CDP.
use crate::config::ScraperConfig;
use crate::fetch::traits::{Browser, BrowserLauncher, BrowserSession};
use crate::model::FetchError;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig, BrowserConfigBuilder};
use chromiumoxide::handler::viewport::Viewport as CdpViewport;
use chromiumoxide::layout::Point;
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

const ELEMENT_POLL: Duration = Duration::from_millis(250);

pub struct ChromiumLauncher {
    headless: bool,
    window: (u32, u32),
    args: Vec<String>,
    request_timeout: Duration,
}

impl ChromiumLauncher {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            headless: config.headless,
            window: (config.viewport.width, config.viewport.height),
            args: config.browser_args.clone(),
            request_timeout: config.navigation_timeout(),
        }
    }

    /// CDP requests may run as long as a navigation; the emulated viewport
    /// matches the window so pointer moves stay on the page.
    fn builder(&self) -> BrowserConfigBuilder {
        let (width, height) = self.window;
        let builder = BrowserConfig::builder()
            .window_size(width, height)
            .viewport(CdpViewport { width, height, ..Default::default() })
            .request_timeout(self.request_timeout)
            .args(self.args.clone());
        if self.headless { builder } else { builder.with_head() }
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Arc<dyn Browser>, FetchError> {
        let config = self.builder().build().map_err(FetchError::Launch)?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| FetchError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {}", e);
                }
            }
        });

        info!("Chromium launched (headless: {})", self.headless);
        Ok(Arc::new(ChromiumBrowser {
            browser: Mutex::new(browser),
            handler_task: Mutex::new(Some(handler_task)),
        }))
    }
}

pub struct ChromiumBrowser {
    browser: Mutex<CdpBrowser>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait::async_trait]
impl Browser for ChromiumBrowser {
    async fn new_session(&self, user_agent: &str) -> Result<Box<dyn BrowserSession>, FetchError> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Session(e.to_string()))?;

        if let Err(e) = page.set_user_agent(user_agent.to_string()).await {
            let _ = page.close().await;
            return Err(FetchError::Session(format!("cannot set user agent: {}", e)));
        }
        Ok(Box::new(ChromiumSession { page }))
    }

    async fn shutdown(&self) {
        {
            let mut browser = self.browser.lock().await;
            if let Err(e) = browser.close().await {
                warn!("Chromium close failed: {}", e);
            }
            if let Err(e) = browser.wait().await {
                warn!("Chromium did not exit cleanly: {}", e);
            }
        }
        if let Some(task) = self.handler_task.lock().await.take() {
            task.abort();
        }
        info!("Chromium shut down");
    }
}

pub struct ChromiumSession {
    page: Page,
}

#[async_trait::async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, limit: Duration) -> Result<(), FetchError> {
        match timeout(limit, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(FetchError::Navigation(e.to_string())),
            Err(_) => Err(FetchError::Timeout { what: "navigation", after: limit }),
        }
    }

    async fn wait_for_text(&mut self, selector: &str, limit: Duration) -> Result<String, FetchError> {
        let page = &self.page;
        let poll = async {
            loop {
                if let Ok(element) = page.find_element(selector).await {
                    return match element.inner_text().await {
                        Ok(Some(text)) => Ok(text),
                        Ok(None) => Err(FetchError::ElementNotFound(selector.to_string())),
                        Err(e) => Err(FetchError::Extraction(e.to_string())),
                    };
                }
                sleep(ELEMENT_POLL).await;
            }
        };
        match timeout(limit, poll).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout { what: "price element", after: limit }),
        }
    }

    async fn move_pointer(&mut self, x: f64, y: f64) -> Result<(), FetchError> {
        self.page
            .move_mouse(Point::new(x, y))
            .await
            .map(|_| ())
            .map_err(|e| FetchError::Session(e.to_string()))
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.page.close().await {
            warn!("Failed to close page: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Viewport;

    #[test]
    fn builder_carries_configured_limits() {
        let config = ScraperConfig {
            navigation_timeout_secs: 75,
            viewport: Viewport { width: 1366, height: 768 },
            ..ScraperConfig::default()
        };
        let settings = format!("{:?}", ChromiumLauncher::new(&config).builder());

        assert!(settings.contains("request_timeout: 75s"), "{settings}");
        assert!(settings.contains("width: 1366"), "{settings}");
        assert!(settings.contains("height: 768"), "{settings}");
        assert!(!settings.contains("width: 800"), "{settings}");
    }

    #[test]
    fn default_config_gets_sixty_second_requests() {
        let settings = format!("{:?}", ChromiumLauncher::new(&ScraperConfig::default()).builder());
        assert!(settings.contains("request_timeout: 60s"), "{settings}");
        assert!(settings.contains("width: 1280"), "{settings}");
    }
}
