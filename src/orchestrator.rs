//! Scrape orchestration: one worker per listing, at most `concurrency_limit`
//! workers at a time, each walking its dates serially through one session.

use crate::fetch::{Browser, PriceFetcher};
use crate::model::{DateRange, ListingId, ListingReport, PriceObservation, PriceValue};
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

pub struct Orchestrator {
    fetcher: Arc<PriceFetcher>,
}

impl Orchestrator {
    pub fn new(fetcher: Arc<PriceFetcher>) -> Self {
        Self { fetcher }
    }

    /// Returns one report per distinct listing, in input order. Every report
    /// holds exactly one observation per date, whatever happened while fetching.
    pub async fn run(
        &self,
        browser: Arc<dyn Browser>,
        listings: &[ListingId],
        dates: &DateRange,
        concurrency_limit: usize,
    ) -> Vec<ListingReport> {
        let mut unique: Vec<ListingId> = Vec::with_capacity(listings.len());
        for listing in listings {
            if !unique.contains(listing) {
                unique.push(listing.clone());
            }
        }
        if unique.is_empty() {
            info!("No listings to scrape");
            return Vec::new();
        }

        let limit = concurrency_limit.clamp(1, unique.len());
        info!(
            "Scraping {} listing(s) x {} date(s) from {} with {} slot(s)",
            unique.len(),
            dates.len(),
            dates.start(),
            limit
        );

        let slots = Arc::new(Semaphore::new(limit));
        let handles: Vec<_> = unique
            .iter()
            .map(|listing| {
                let listing = listing.clone();
                let dates = dates.clone();
                let slots = Arc::clone(&slots);
                let browser = Arc::clone(&browser);
                let fetcher = Arc::clone(&self.fetcher);
                tokio::spawn(async move {
                    let Ok(_slot) = slots.acquire_owned().await else {
                        return ListingReport::unavailable(listing, &dates);
                    };
                    scrape_listing(browser.as_ref(), &fetcher, listing, &dates).await
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(unique)
            .map(|(joined, listing)| match joined {
                Ok(report) => report,
                Err(e) => {
                    error!("Worker for {} aborted: {}", listing, e);
                    ListingReport::unavailable(listing, dates)
                }
            })
            .collect()
    }
}

async fn scrape_listing(
    browser: &dyn Browser,
    fetcher: &PriceFetcher,
    listing: ListingId,
    dates: &DateRange,
) -> ListingReport {
    let user_agent = fetcher.pacing().next_fingerprint();
    info!("Processing listing: {}", listing);

    let mut session = match browser.new_session(&user_agent).await {
        Ok(session) => session,
        Err(e) => {
            warn!("Cannot open session for {}: {}", listing, e);
            return ListingReport::unavailable(listing, dates);
        }
    };

    let mut observations = Vec::with_capacity(dates.len());
    let walk = AssertUnwindSafe(async {
        for date in dates.iter() {
            let value = fetcher.fetch(session.as_mut(), &listing, date).await;
            observations.push(PriceObservation { date, value });
        }
    })
    .catch_unwind()
    .await;
    // Pages have no Drop cleanup, so the session is closed on every path.
    session.close().await;

    if walk.is_err() {
        error!("Worker for {} panicked after {} date(s)", listing, observations.len());
        let done = observations.len();
        observations.extend(
            dates
                .iter()
                .skip(done)
                .map(|date| PriceObservation { date, value: PriceValue::Unavailable }),
        );
    }

    let report = ListingReport { listing, observations };
    info!(
        "Finished listing {}: {}/{} prices found",
        report.listing,
        report.available_count(),
        report.observations.len()
    );
    report
}
