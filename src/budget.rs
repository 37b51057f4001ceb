use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// When the error budget is cleared after an alert has been raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Reset as soon as a send was attempted, whatever its outcome.
    #[default]
    OnAttempt,
    /// Reset only once the alert was handed to the mail server.
    OnDelivery,
}

impl FromStr for ResetPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on_attempt" | "attempt" => Ok(Self::OnAttempt),
            "on_delivery" | "delivery" => Ok(Self::OnDelivery),
            other => Err(format!("expected on_attempt or on_delivery, got {other}")),
        }
    }
}

impl fmt::Display for ResetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnAttempt => f.write_str("on_attempt"),
            Self::OnDelivery => f.write_str("on_delivery"),
        }
    }
}

/// Failures counted since the last alert, shared by the fetch and post stages.
#[derive(Debug)]
pub struct ErrorBudget {
    count: AtomicUsize,
    threshold: usize,
}

impl ErrorBudget {
    pub fn new(threshold: usize) -> Self {
        Self {
            count: AtomicUsize::new(0),
            threshold: threshold.max(1),
        }
    }

    /// Adds one failure and returns the new count.
    pub fn record_failure(&self) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Atomically clears the counter if it reached the threshold.
    ///
    /// Returns the count that crossed the threshold. Two callers racing on the
    /// same crossing see exactly one `Some`.
    pub fn take_if_due(&self) -> Option<usize> {
        self.count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n >= self.threshold).then_some(0)
            })
            .ok()
    }

    /// Puts back failures taken by [`take_if_due`](Self::take_if_due) when an
    /// alert could not be delivered.
    pub fn restore(&self, taken: usize) {
        self.count.fetch_add(taken, Ordering::SeqCst);
    }
}
