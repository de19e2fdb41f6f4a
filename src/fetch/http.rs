// Plain HTTP engine: no JavaScript, the price must be present in the served HTML.
use crate::fetch::traits::{Browser, BrowserLauncher, BrowserSession};
use crate::model::FetchError;
use crate::parser::PriceParser;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct HttpLauncher;

#[async_trait::async_trait]
impl BrowserLauncher for HttpLauncher {
    async fn launch(&self) -> Result<Arc<dyn Browser>, FetchError> {
        // Fails here rather than per session if TLS cannot be initialised.
        Client::builder()
            .build()
            .map_err(|e| FetchError::Launch(e.to_string()))?;
        Ok(Arc::new(HttpBrowser))
    }
}

pub struct HttpBrowser;

#[async_trait::async_trait]
impl Browser for HttpBrowser {
    async fn new_session(&self, user_agent: &str) -> Result<Box<dyn BrowserSession>, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .cookie_store(true)
            .build()
            .map_err(|e| FetchError::Session(e.to_string()))?;
        Ok(Box::new(HttpSession { client, body: None }))
    }

    async fn shutdown(&self) {}
}

pub struct HttpSession {
    client: Client,
    body: Option<String>,
}

#[async_trait::async_trait]
impl BrowserSession for HttpSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), FetchError> {
        self.body = None;
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Navigation(format!("HTTP {}", status)));
        }
        let body = response.text().await.map_err(|e| classify(e, timeout))?;
        debug!("Loaded {} bytes from {}", body.len(), url);
        self.body = Some(body);
        Ok(())
    }

    async fn wait_for_text(&mut self, selector: &str, _timeout: Duration) -> Result<String, FetchError> {
        let body = self
            .body
            .as_deref()
            .ok_or_else(|| FetchError::Extraction("no page loaded".into()))?;
        let parser = PriceParser::new(selector).map_err(|e| FetchError::Extraction(e.to_string()))?;
        parser
            .extract(body)
            .ok_or_else(|| FetchError::ElementNotFound(selector.to_string()))
    }

    async fn move_pointer(&mut self, _x: f64, _y: f64) -> Result<(), FetchError> {
        Ok(())
    }

    async fn close(self: Box<Self>) {}
}

fn classify(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout { what: "navigation", after: timeout }
    } else {
        FetchError::Navigation(error.to_string())
    }
}
