use crate::config::{ScraperConfig, Viewport};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;

/// Randomized delays, user agents and pointer positions for fetches.
pub struct Pacing {
    rng: Mutex<StdRng>,
    min_delay_ms: u64,
    max_delay_ms: u64,
    user_agents: Vec<String>,
    viewport: (f64, f64),
}

impl Pacing {
    pub fn new(config: &ScraperConfig) -> Self {
        match config.pacing_seed {
            Some(seed) => Self::seeded(config, seed),
            None => Self::with_rng(config, StdRng::from_os_rng()),
        }
    }

    pub fn seeded(config: &ScraperConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &ScraperConfig, rng: StdRng) -> Self {
        let Viewport { width, height } = config.viewport;
        Self {
            rng: Mutex::new(rng),
            min_delay_ms: config.min_delay_ms.min(config.max_delay_ms),
            max_delay_ms: config.max_delay_ms,
            user_agents: config.user_agents.clone(),
            viewport: (f64::from(width.max(1)), f64::from(height.max(1))),
        }
    }

    fn with_locked<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }

    /// Uniform delay in `[min_delay, max_delay]`.
    pub fn next_delay(&self) -> Duration {
        let (min, max) = (self.min_delay_ms, self.max_delay_ms);
        Duration::from_millis(self.with_locked(|rng| rng.random_range(min..=max)))
    }

    /// User agent for a new session; stays fixed for that session's lifetime.
    pub fn next_fingerprint(&self) -> String {
        if self.user_agents.is_empty() {
            return String::new();
        }
        let len = self.user_agents.len();
        let i = self.with_locked(|rng| rng.random_range(0..len));
        self.user_agents[i].clone()
    }

    /// Random point inside the viewport.
    pub fn next_pointer(&self) -> (f64, f64) {
        let (w, h) = self.viewport;
        self.with_locked(|rng| (rng.random_range(0.0..w), rng.random_range(0.0..h)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn delays_stay_within_bounds() {
        let pacing = Pacing::seeded(&ScraperConfig::default(), 7);
        for _ in 0..500 {
            let delay = pacing.next_delay();
            assert!(delay >= Duration::from_secs(4), "{delay:?}");
            assert!(delay <= Duration::from_secs(10), "{delay:?}");
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let config = ScraperConfig::default();
        let a = Pacing::seeded(&config, 99);
        let b = Pacing::seeded(&config, 99);
        for _ in 0..20 {
            assert_eq!(a.next_delay(), b.next_delay());
            assert_eq!(a.next_fingerprint(), b.next_fingerprint());
        }
    }

    #[test]
    fn fingerprints_come_from_pool_and_vary() {
        let config = ScraperConfig::default();
        let pacing = Pacing::seeded(&config, 3);
        let seen: HashSet<String> = (0..200).map(|_| pacing.next_fingerprint()).collect();
        assert!(seen.iter().all(|ua| config.user_agents.contains(ua)));
        assert_eq!(seen.len(), config.user_agents.len());
    }

    #[test]
    fn configured_seed_is_honoured() {
        let config = ScraperConfig { pacing_seed: Some(17), ..ScraperConfig::default() };
        let a = Pacing::new(&config);
        let b = Pacing::seeded(&config, 17);
        assert_eq!(a.next_delay(), b.next_delay());
    }

    #[test]
    fn zero_width_delay_window_is_constant() {
        let config = ScraperConfig { min_delay_ms: 0, max_delay_ms: 0, ..ScraperConfig::default() };
        let pacing = Pacing::seeded(&config, 1);
        assert_eq!(pacing.next_delay(), Duration::ZERO);
    }

    #[test]
    fn pointer_lands_inside_viewport() {
        let pacing = Pacing::seeded(&ScraperConfig::default(), 11);
        for _ in 0..100 {
            let (x, y) = pacing.next_pointer();
            assert!((0.0..1280.0).contains(&x));
            assert!((0.0..720.0).contains(&y));
        }
    }
}
