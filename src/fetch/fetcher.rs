use crate::config::ScraperConfig;
use crate::fetch::pacing::Pacing;
use crate::fetch::traits::BrowserSession;
use crate::model::{FetchError, ListingId, PriceValue};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Fetches one (listing, date) price through an open session.
pub struct PriceFetcher {
    base_url: String,
    query: String,
    price_selector: String,
    navigation_timeout: Duration,
    element_timeout: Duration,
    pacing: Arc<Pacing>,
}

impl PriceFetcher {
    pub fn new(config: &ScraperConfig, pacing: Arc<Pacing>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            query: config.query.trim_start_matches(['?', '&']).to_string(),
            price_selector: config.price_selector.clone(),
            navigation_timeout: config.navigation_timeout(),
            element_timeout: config.element_timeout(),
            pacing,
        }
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    /// Check-in on `date`, check-out the following day.
    pub fn build_url(&self, listing: &ListingId, date: NaiveDate) -> String {
        let checkout = date.succ_opt().unwrap_or(date);
        let mut url = format!(
            "{}/{}.html?checkin={}&checkout={}",
            self.base_url,
            listing,
            date.format("%Y-%m-%d"),
            checkout.format("%Y-%m-%d"),
        );
        if !self.query.is_empty() {
            url.push('&');
            url.push_str(&self.query);
        }
        url
    }

    /// Never fails: any error becomes `Unavailable`. Pacing applies either way.
    pub async fn fetch(
        &self,
        session: &mut dyn BrowserSession,
        listing: &ListingId,
        date: NaiveDate,
    ) -> PriceValue {
        let value = match self.extract(session, listing, date).await {
            Ok(price) => {
                info!("Price found for {} on {}: {}", listing, date, price);
                let (x, y) = self.pacing.next_pointer();
                if let Err(e) = session.move_pointer(x, y).await {
                    debug!("Pointer simulation failed for {}: {}", listing, e);
                }
                PriceValue::Price(price)
            }
            Err(e) => {
                warn!("Fetch failed for {} on {}: {}", listing, date, e);
                PriceValue::Unavailable
            }
        };

        let delay = self.pacing.next_delay();
        debug!("Pacing {:?} after {} on {}", delay, listing, date);
        sleep(delay).await;
        value
    }

    async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        listing: &ListingId,
        date: NaiveDate,
    ) -> Result<String, FetchError> {
        let url = self.build_url(listing, date);
        debug!("Navigating to {}", url);
        session.navigate(&url, self.navigation_timeout).await?;

        let text = session.wait_for_text(&self.price_selector, self.element_timeout).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(FetchError::Extraction(format!("empty text in '{}'", self.price_selector)));
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ScriptedSession {
        replies: VecDeque<Result<String, FetchError>>,
        visited: Vec<String>,
        pointer_moves: usize,
    }

    impl ScriptedSession {
        fn new(replies: Vec<Result<String, FetchError>>) -> Self {
            Self { replies: replies.into(), visited: Vec::new(), pointer_moves: 0 }
        }
    }

    #[async_trait::async_trait]
    impl BrowserSession for ScriptedSession {
        async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<(), FetchError> {
            self.visited.push(url.to_string());
            Ok(())
        }

        async fn wait_for_text(&mut self, _selector: &str, _timeout: Duration) -> Result<String, FetchError> {
            self.replies
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::ElementNotFound("none left".into())))
        }

        async fn move_pointer(&mut self, _x: f64, _y: f64) -> Result<(), FetchError> {
            self.pointer_moves += 1;
            Ok(())
        }

        async fn close(self: Box<Self>) {}
    }

    fn fetcher() -> PriceFetcher {
        let config = ScraperConfig::default();
        let pacing = Arc::new(Pacing::seeded(&config, 5));
        PriceFetcher::new(&config, pacing)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn url_uses_next_day_checkout() {
        let url = fetcher().build_url(&ListingId::new("zamek"), date("2024-12-31"));
        assert_eq!(
            url,
            "https://www.booking.com/hotel/pl/zamek.html?checkin=2024-12-31&checkout=2025-01-01\
             &group_adults=2&no_rooms=1&group_children=0"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn success_trims_text_and_simulates_pointer() {
        let fetcher = fetcher();
        let mut session = ScriptedSession::new(vec![Ok("  zł 420 \n".into())]);
        let started = tokio::time::Instant::now();

        let value = fetcher.fetch(&mut session, &ListingId::new("a"), date("2024-06-01")).await;

        assert_eq!(value, PriceValue::Price("zł 420".into()));
        assert_eq!(session.pointer_moves, 1);
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_becomes_unavailable_and_still_paces() {
        let fetcher = fetcher();
        let mut session = ScriptedSession::new(vec![Err(FetchError::Timeout {
            what: "price element",
            after: Duration::from_secs(20),
        })]);
        let started = tokio::time::Instant::now();

        let value = fetcher.fetch(&mut session, &ListingId::new("a"), date("2024-06-01")).await;

        assert_eq!(value, PriceValue::Unavailable);
        assert_eq!(session.pointer_moves, 0);
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn blank_element_is_unavailable() {
        let fetcher = fetcher();
        let mut session = ScriptedSession::new(vec![Ok("   ".into())]);
        let value = fetcher.fetch(&mut session, &ListingId::new("a"), date("2024-06-01")).await;
        assert_eq!(value, PriceValue::Unavailable);
        assert_eq!(session.visited.len(), 1);
    }
}
