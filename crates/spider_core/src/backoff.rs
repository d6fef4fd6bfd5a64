use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(3600);
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(20);

/// Which provider outcomes of a cycle decide the short backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackoffPolicy {
    /// Only the last provider processed in the cycle counts.
    #[default]
    LastProvider,
    /// Any errored provider in the cycle selects the short backoff.
    AnyProvider,
}

/// Two-tier pacing between period scans. No growth, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub period: Duration,
    pub error_backoff: Duration,
    pub policy: BackoffPolicy,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            policy: BackoffPolicy::default(),
        }
    }
}

impl Pacing {
    /// Delay before the next cycle, given whether each provider of the cycle
    /// errored, in processing order.
    pub fn next_delay(&self, errored: &[bool]) -> Duration {
        let backoff = match self.policy {
            BackoffPolicy::LastProvider => errored.last().copied().unwrap_or(false),
            BackoffPolicy::AnyProvider => errored.iter().any(|e| *e),
        };
        if backoff {
            self.error_backoff
        } else {
            self.period
        }
    }
}
