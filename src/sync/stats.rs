use chrono::{DateTime, Local};

/// Format used for `last_run` on the status endpoint
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Statistics recorded at the end of every cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleStats {
    pub timestamp: String,
    pub follow_count: usize,
}

impl CycleStats {
    pub fn at(completed_at: DateTime<Local>, follow_count: usize) -> Self {
        Self {
            timestamp: completed_at.format(TIMESTAMP_FORMAT).to_string(),
            follow_count,
        }
    }

    pub fn now(follow_count: usize) -> Self {
        Self::at(Local::now(), follow_count)
    }
}

/// What happened during a single cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub posts_seen: usize,
    pub candidates: usize,
    pub followed: usize,
    pub unresolvable: usize,
    pub lookup_failures: usize,
    pub follow_failures: usize,
    pub fetch_failures: usize,
    pub follow_count: usize,
}
