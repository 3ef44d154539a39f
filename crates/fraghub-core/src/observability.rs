use crate::error::CoreError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Why an engagement request was turned away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectionKind {
    NotActive,
    AlreadyVoted,
    AlreadyResponded,
    InvalidOption,
    IncompleteSubmission,
}

impl RejectionKind {
    pub fn of(err: &CoreError) -> Option<Self> {
        match err {
            CoreError::NotActive => Some(Self::NotActive),
            CoreError::AlreadyVoted => Some(Self::AlreadyVoted),
            CoreError::AlreadyResponded => Some(Self::AlreadyResponded),
            CoreError::InvalidOption => Some(Self::InvalidOption),
            CoreError::IncompleteSubmission(_) => Some(Self::IncompleteSubmission),
            _ => None,
        }
    }
}

/// Process-lifetime counters for ballots and survey completions.
#[derive(Debug, Default)]
pub struct EngagementMetrics {
    ballots_cast: AtomicU64,
    surveys_completed: AtomicU64,
    rejected_not_active: AtomicU64,
    rejected_already_voted: AtomicU64,
    rejected_already_responded: AtomicU64,
    rejected_invalid_option: AtomicU64,
    rejected_incomplete: AtomicU64,
}

static METRICS: EngagementMetrics = EngagementMetrics::new();

/// The shared counters every request handler reports into.
pub fn metrics() -> &'static EngagementMetrics {
    &METRICS
}

impl EngagementMetrics {
    pub const fn new() -> Self {
        Self {
            ballots_cast: AtomicU64::new(0),
            surveys_completed: AtomicU64::new(0),
            rejected_not_active: AtomicU64::new(0),
            rejected_already_voted: AtomicU64::new(0),
            rejected_already_responded: AtomicU64::new(0),
            rejected_invalid_option: AtomicU64::new(0),
            rejected_incomplete: AtomicU64::new(0),
        }
    }

    pub fn ballot_cast(&self) {
        self.ballots_cast.fetch_add(1, Ordering::Relaxed);
    }

    pub fn survey_completed(&self) {
        self.surveys_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rejected(&self, kind: RejectionKind) {
        let counter = match kind {
            RejectionKind::NotActive => &self.rejected_not_active,
            RejectionKind::AlreadyVoted => &self.rejected_already_voted,
            RejectionKind::AlreadyResponded => &self.rejected_already_responded,
            RejectionKind::InvalidOption => &self.rejected_invalid_option,
            RejectionKind::IncompleteSubmission => &self.rejected_incomplete,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count `err` if it is an engagement rejection; other errors are ignored.
    pub fn observe_error(&self, err: &CoreError) {
        if let Some(kind) = RejectionKind::of(err) {
            tracing::debug!(?kind, "engagement request rejected");
            self.rejected(kind);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ballots_cast: self.ballots_cast.load(Ordering::Relaxed),
            surveys_completed: self.surveys_completed.load(Ordering::Relaxed),
            rejections: RejectionCounts {
                not_active: self.rejected_not_active.load(Ordering::Relaxed),
                already_voted: self.rejected_already_voted.load(Ordering::Relaxed),
                already_responded: self.rejected_already_responded.load(Ordering::Relaxed),
                invalid_option: self.rejected_invalid_option.load(Ordering::Relaxed),
                incomplete_submission: self.rejected_incomplete.load(Ordering::Relaxed),
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RejectionCounts {
    pub not_active: u64,
    pub already_voted: u64,
    pub already_responded: u64,
    pub invalid_option: u64,
    pub incomplete_submission: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub ballots_cast: u64,
    pub surveys_completed: u64,
    pub rejections: RejectionCounts,
}
