//! Age banding of candidate messages.
//!
//! The platform refuses bulk deletion of any message 14 days old or older,
//! so every candidate is routed by comparing its timestamp against a cutoff
//! fixed at session start.

use chrono::{DateTime, Utc};
use ping_types::MessageBand;

pub const BULK_DELETE_MAX_AGE_DAYS: i64 = 14;

/// The oldest instant (exclusive) still eligible for bulk deletion.
pub fn bulk_cutoff(session_start: DateTime<Utc>) -> DateTime<Utc> {
    session_start - chrono::Duration::days(BULK_DELETE_MAX_AGE_DAYS)
}

pub fn classify(created_at: DateTime<Utc>, session_start: DateTime<Utc>) -> MessageBand {
    MessageClassifier::new(session_start).classify(created_at)
}

/// Classifier with the cutoff computed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageClassifier {
    cutoff: DateTime<Utc>,
}

impl MessageClassifier {
    pub fn new(session_start: DateTime<Utc>) -> Self {
        Self::with_cutoff(bulk_cutoff(session_start))
    }

    pub fn with_cutoff(cutoff: DateTime<Utc>) -> Self {
        Self { cutoff }
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    pub fn classify(&self, created_at: DateTime<Utc>) -> MessageBand {
        if created_at > self.cutoff {
            MessageBand::Recent
        } else {
            MessageBand::Aged
        }
    }
}
