//! Daily wall-clock trigger driving scrape cycles.
//!
//! The active `ScheduleSpec` lives in a single-slot watch channel: the
//! operator front-end replaces it through a [`ScheduleHandle`], only the
//! scheduler loop reads it. Cycles run inline in the loop, so a cycle is
//! never interrupted or overlapped; ticks during a cycle are simply missed.

pub mod clock;
pub mod job;

pub use clock::{Clock, SystemClock};
pub use job::ScrapeJob;

use crate::model::ScheduleSpec;
use chrono::{NaiveDate, NaiveTime};
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    Armed(ScheduleSpec),
    Running(ScheduleSpec),
}

impl fmt::Display for SchedulerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerPhase::Idle => f.write_str("idle, no schedule set"),
            SchedulerPhase::Armed(spec) => write!(f, "armed, {}", spec),
            SchedulerPhase::Running(spec) => write!(f, "running, {}", spec),
        }
    }
}

/// One full orchestrate/export/deliver pass.
#[async_trait::async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self, spec: ScheduleSpec, today: NaiveDate);
}

/// Write side of the schedule slot. Last write wins.
#[derive(Clone)]
pub struct ScheduleHandle {
    tx: watch::Sender<Option<ScheduleSpec>>,
}

impl ScheduleHandle {
    pub fn new(initial: Option<ScheduleSpec>) -> (Self, watch::Receiver<Option<ScheduleSpec>>) {
        let (tx, rx) = watch::channel(initial);
        (Self { tx }, rx)
    }

    pub fn replace(&self, spec: ScheduleSpec) {
        let previous = self.tx.send_replace(Some(spec));
        match previous {
            Some(old) if old != spec => info!("Schedule replaced: {} -> {}", old, spec),
            Some(_) => info!("Schedule unchanged: {}", spec),
            None => info!("Schedule set: {}", spec),
        }
    }

    pub fn current(&self) -> Option<ScheduleSpec> {
        *self.tx.borrow()
    }
}

pub struct Scheduler<C, R> {
    clock: C,
    runner: R,
    spec_rx: watch::Receiver<Option<ScheduleSpec>>,
    phase_tx: watch::Sender<SchedulerPhase>,
    last_fire: Option<(NaiveDate, NaiveTime)>,
}

impl<C: Clock, R: CycleRunner> Scheduler<C, R> {
    pub fn new(
        clock: C,
        runner: R,
        spec_rx: watch::Receiver<Option<ScheduleSpec>>,
        phase_tx: watch::Sender<SchedulerPhase>,
    ) -> Self {
        Self { clock, runner, spec_rx, phase_tx, last_fire: None }
    }

    /// Polls forever at [`POLL_INTERVAL`].
    pub async fn run(mut self) {
        let mut ticker = interval(POLL_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Scheduler loop started");
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One poll: fires the runner when the clock is inside the trigger minute
    /// and that (date, trigger) pair has not fired yet. Returns whether it fired.
    pub async fn tick(&mut self) -> bool {
        let current = *self.spec_rx.borrow_and_update();
        let Some(spec) = current else {
            self.set_phase(SchedulerPhase::Idle);
            return false;
        };
        self.set_phase(SchedulerPhase::Armed(spec));

        let now = self.clock.now();
        let key = (now.date(), spec.trigger());
        if !spec.matches(now.time()) || self.last_fire == Some(key) {
            return false;
        }
        self.last_fire = Some(key);

        info!("Trigger fired at {} ({})", now.format("%Y-%m-%d %H:%M:%S"), spec);
        self.set_phase(SchedulerPhase::Running(spec));
        self.runner.run_cycle(spec, now.date()).await;

        let next = (*self.spec_rx.borrow()).unwrap_or(spec);
        self.set_phase(SchedulerPhase::Armed(next));
        info!("Cycle complete, waiting for next trigger ({})", next);
        true
    }

    fn set_phase(&self, phase: SchedulerPhase) {
        self.phase_tx.send_if_modified(|current| {
            if *current == phase {
                false
            } else {
                *current = phase;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::clock::FakeClock;
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingRunner {
        fired: Arc<Mutex<Vec<(ScheduleSpec, NaiveDate)>>>,
        on_run: Option<(ScheduleHandle, ScheduleSpec)>,
        run_secs: Option<(FakeClock, i64)>,
    }

    #[async_trait::async_trait]
    impl CycleRunner for RecordingRunner {
        async fn run_cycle(&self, spec: ScheduleSpec, today: NaiveDate) {
            self.fired.lock().unwrap().push((spec, today));
            if let Some((handle, replacement)) = &self.on_run {
                handle.replace(*replacement);
            }
            if let Some((clock, secs)) = &self.run_secs {
                clock.advance_secs(*secs);
            }
        }
    }

    struct Harness {
        scheduler: Scheduler<FakeClock, RecordingRunner>,
        clock: FakeClock,
        handle: ScheduleHandle,
        phase: watch::Receiver<SchedulerPhase>,
        fired: Arc<Mutex<Vec<(ScheduleSpec, NaiveDate)>>>,
    }

    fn harness(spec: Option<ScheduleSpec>, runner: RecordingRunner, clock: FakeClock) -> Harness {
        let (handle, spec_rx) = ScheduleHandle::new(spec);
        let (phase_tx, phase) = watch::channel(SchedulerPhase::Idle);
        let fired = Arc::clone(&runner.fired);
        let scheduler = Scheduler::new(clock.clone(), runner, spec_rx, phase_tx);
        Harness { scheduler, clock, handle, phase, fired }
    }

    fn spec(time: &str, days: &str) -> ScheduleSpec {
        ScheduleSpec::parse(time, days).unwrap()
    }

    fn simple(now: &str, spec: Option<ScheduleSpec>) -> Harness {
        harness(spec, RecordingRunner::default(), FakeClock::at(now))
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn fires_once_across_minute_boundary() {
        let mut h = simple("2024-06-01 08:59:59", Some(spec("09:00", "2")));

        assert!(!h.scheduler.tick().await);
        h.clock.advance_secs(1);
        assert!(h.scheduler.tick().await);
        h.clock.advance_secs(1);
        assert!(!h.scheduler.tick().await);

        let fired = h.fired.lock().unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].1, date("2024-06-01"));
    }

    #[tokio::test]
    async fn whole_trigger_minute_fires_once() {
        let mut h = simple("2024-06-01 09:00:00", Some(spec("09:00", "1")));
        for _ in 0..60 {
            h.scheduler.tick().await;
            h.clock.advance_secs(1);
        }
        assert_eq!(h.fired.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fires_again_next_day_with_fresh_date() {
        let mut h = simple("2024-06-01 09:00:10", Some(spec("09:00", "3")));
        assert!(h.scheduler.tick().await);
        h.clock.advance_secs(24 * 3600);
        assert!(h.scheduler.tick().await);

        let dates: Vec<_> = h.fired.lock().unwrap().iter().map(|(_, d)| *d).collect();
        assert_eq!(dates, vec![date("2024-06-01"), date("2024-06-02")]);
    }

    #[tokio::test]
    async fn idle_without_schedule() {
        let mut h = simple("2024-06-01 09:00:00", None);
        assert!(!h.scheduler.tick().await);
        assert_eq!(*h.phase.borrow(), SchedulerPhase::Idle);

        h.handle.replace(spec("09:00", "1"));
        assert!(h.scheduler.tick().await);
        assert_eq!(*h.phase.borrow(), SchedulerPhase::Armed(spec("09:00", "1")));
    }

    #[tokio::test]
    async fn long_cycle_inside_minute_does_not_refire() {
        let clock = FakeClock::at("2024-06-01 09:00:00");
        let runner = RecordingRunner { run_secs: Some((clock.clone(), 20)), ..Default::default() };
        let mut h = harness(Some(spec("09:00", "1")), runner, clock);

        assert!(h.scheduler.tick().await);
        assert!(!h.scheduler.tick().await);
        assert_eq!(h.fired.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replacement_during_run_applies_afterwards() {
        let (handle, spec_rx) = ScheduleHandle::new(Some(spec("09:00", "1")));
        let (phase_tx, phase) = watch::channel(SchedulerPhase::Idle);
        let clock = FakeClock::at("2024-06-01 09:00:00");
        let runner = RecordingRunner {
            on_run: Some((handle.clone(), spec("09:05", "4"))),
            ..Default::default()
        };
        let fired = Arc::clone(&runner.fired);
        let mut scheduler = Scheduler::new(clock.clone(), runner, spec_rx, phase_tx);

        assert!(scheduler.tick().await);
        assert_eq!(*phase.borrow(), SchedulerPhase::Armed(spec("09:05", "4")));
        assert_eq!(handle.current(), Some(spec("09:05", "4")));

        clock.advance_secs(5 * 60);
        assert!(scheduler.tick().await);
        let fired = fired.lock().unwrap();
        assert_eq!(fired.len(), 2);
        assert_eq!(fired[0].0.days().get(), 1);
        assert_eq!(fired[1].0.days().get(), 4);
    }

    #[tokio::test]
    async fn new_time_same_day_fires_again() {
        let mut h = simple("2024-06-01 09:00:00", Some(spec("09:00", "1")));
        assert!(h.scheduler.tick().await);

        h.handle.replace(spec("09:01", "1"));
        h.clock.advance_secs(60);
        assert!(h.scheduler.tick().await);
        assert_eq!(h.fired.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn phase_reports_running_during_cycle() {
        struct PhaseRecorder {
            phase: watch::Receiver<SchedulerPhase>,
            seen: Arc<Mutex<Option<SchedulerPhase>>>,
        }

        #[async_trait::async_trait]
        impl CycleRunner for PhaseRecorder {
            async fn run_cycle(&self, _spec: ScheduleSpec, _today: NaiveDate) {
                *self.seen.lock().unwrap() = Some(*self.phase.borrow());
            }
        }

        let (_handle, spec_rx) = ScheduleHandle::new(Some(spec("09:00", "1")));
        let (phase_tx, phase) = watch::channel(SchedulerPhase::Idle);
        let seen = Arc::new(Mutex::new(None));
        let recorder = PhaseRecorder { phase: phase.clone(), seen: Arc::clone(&seen) };
        let mut scheduler =
            Scheduler::new(FakeClock::at("2024-06-01 09:00:30"), recorder, spec_rx, phase_tx);

        assert!(scheduler.tick().await);
        assert_eq!(*seen.lock().unwrap(), Some(SchedulerPhase::Running(spec("09:00", "1"))));
    }
}
