// Utility functions
use chrono::NaiveDateTime;
use std::time::Instant;
use tracing::info;

/// Logs start and elapsed time of a labelled section when dropped.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("Starting: {}", label);
        Self { label, start: Instant::now() }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!("Finished: {} (took {:.2?})", self.label, self.start.elapsed());
    }
}

/// Turns an identifier into a file stem: letters, digits and `_` survive,
/// whitespace becomes `_`, everything else is dropped.
pub fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_alphanumeric() || c == '_' {
                Some(c)
            } else {
                None
            }
        })
        .collect();

    if stem.is_empty() { "listing".to_string() } else { stem }
}

/// Timestamp suitable for file names, e.g. `2024-06-01_09-00-00`.
pub fn file_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d_%H-%M-%S").to_string()
}
