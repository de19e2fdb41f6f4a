// One triggered cycle: launch engine, scrape, export, deliver, clean up.
use crate::config::AppConfig;
use crate::export::ReportExporter;
use crate::fetch::{launcher_for, BrowserLauncher, Pacing, PriceFetcher};
use crate::model::{DateRange, ListingId, ListingReport, ScheduleSpec};
use crate::notifier::DeliverySink;
use crate::orchestrator::Orchestrator;
use crate::scheduler::CycleRunner;
use crate::utils::Timer;
use chrono::{Local, NaiveDate};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub aborted: bool,
    pub listings: usize,
    pub exported: usize,
    pub export_failures: usize,
    pub delivered: usize,
    pub delivery_failures: usize,
}

pub struct ScrapeJob {
    launcher: Arc<dyn BrowserLauncher>,
    orchestrator: Orchestrator,
    exporter: ReportExporter,
    sink: Arc<dyn DeliverySink>,
    listings: Vec<ListingId>,
    concurrency_limit: usize,
    combined_location: Option<String>,
}

impl ScrapeJob {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        orchestrator: Orchestrator,
        exporter: ReportExporter,
        sink: Arc<dyn DeliverySink>,
        listings: Vec<ListingId>,
        concurrency_limit: usize,
    ) -> Self {
        Self {
            launcher,
            orchestrator,
            exporter,
            sink,
            listings,
            concurrency_limit,
            combined_location: None,
        }
    }

    pub fn from_config(config: &AppConfig, sink: Arc<dyn DeliverySink>) -> Self {
        let pacing = Arc::new(Pacing::new(&config.scraper));
        let fetcher = Arc::new(PriceFetcher::new(&config.scraper, pacing));
        let job = Self::new(
            launcher_for(&config.scraper),
            Orchestrator::new(fetcher),
            ReportExporter::new(&config.output_dir),
            sink,
            config.listing_ids(),
            config.concurrency_limit,
        );
        if config.combined_report {
            job.with_combined_report(config.location.clone())
        } else {
            job
        }
    }

    pub fn with_combined_report(mut self, location: impl Into<String>) -> Self {
        self.combined_location = Some(location.into());
        self
    }

    pub async fn run_once(&self, spec: ScheduleSpec, today: NaiveDate) -> CycleSummary {
        let _timer = Timer::start(format!("scrape cycle for {}", today));
        let dates = DateRange::new(today, spec.days());
        let mut summary = CycleSummary { listings: self.listings.len(), ..Default::default() };
        if self.listings.is_empty() {
            info!("No listings configured, engine not started");
            return summary;
        }

        let browser = match self.launcher.launch().await {
            Ok(browser) => browser,
            Err(e) => {
                error!("Cycle aborted, engine unavailable: {}", e);
                summary.aborted = true;
                return summary;
            }
        };
        let reports = self
            .orchestrator
            .run(Arc::clone(&browser), &self.listings, &dates, self.concurrency_limit)
            .await;
        browser.shutdown().await;

        for report in &reports {
            match self.exporter.export(report) {
                Ok(path) => {
                    summary.exported += 1;
                    self.deliver(&path, &report.listing, &mut summary).await;
                }
                Err(e) => {
                    warn!("Export failed for {}: {}", report.listing, e);
                    summary.export_failures += 1;
                }
            }
        }

        if let Some(location) = &self.combined_location {
            self.deliver_combined(&reports, location, &mut summary).await;
        }

        info!(
            "Cycle summary: {} listing(s), {} exported, {} export failure(s), {} delivered, {} delivery failure(s)",
            summary.listings,
            summary.exported,
            summary.export_failures,
            summary.delivered,
            summary.delivery_failures
        );
        summary
    }

    async fn deliver_combined(&self, reports: &[ListingReport], location: &str, summary: &mut CycleSummary) {
        match self.exporter.export_combined(reports, location, Local::now().naive_local()) {
            Ok(path) => self.deliver(&path, &ListingId::new(location), summary).await,
            Err(e) => {
                warn!("Combined export failed: {}", e);
                summary.export_failures += 1;
            }
        }
    }

    /// Single attempt; the file is removed whatever the outcome.
    async fn deliver(&self, path: &Path, listing: &ListingId, summary: &mut CycleSummary) {
        match self.sink.deliver(path, listing).await {
            Ok(()) => {
                info!("Delivered report for {}", listing);
                summary.delivered += 1;
            }
            Err(e) => {
                warn!("Delivery failed for {}: {}", listing, e);
                summary.delivery_failures += 1;
            }
        }
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("Cannot remove {}: {}", path.display(), e);
        }
    }
}

#[async_trait::async_trait]
impl CycleRunner for ScrapeJob {
    async fn run_cycle(&self, spec: ScheduleSpec, today: NaiveDate) {
        let summary = self.run_once(spec, today).await;
        if summary.aborted {
            warn!("Cycle for {} produced no reports", today);
        }
    }
}
