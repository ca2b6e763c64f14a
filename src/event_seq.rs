use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

pub fn next_event_seq() -> u64 {
    EVENT_SEQ.fetch_add(1, Ordering::Relaxed)
}

/// Ordering stamp carried by every widget event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventStamp {
    pub seq: u64,
    pub at: DateTime<Utc>,
}

impl EventStamp {
    pub fn next() -> Self {
        Self {
            seq: next_event_seq(),
            at: Utc::now(),
        }
    }
}
