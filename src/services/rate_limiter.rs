//! Process-wide gate for outbound search calls.
//!
//! Two sliding windows are kept: one second and twenty-four hours. A call is admitted
//! only when both windows have room, and it is recorded in both before `acquire`
//! returns. A gate mutex stays locked while a caller sleeps, so callers from several
//! tasks are admitted strictly one after another. The windows themselves are locked
//! only briefly, which keeps `usage` answering while a caller waits.

use std::time::Duration;

use tokio::{
    sync::Mutex,
    time::{sleep, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::rate_window::RateWindow,
    errors::{ConfigError, RateLimitError},
};

pub const SHORT_WINDOW: Duration = Duration::from_secs(1);
pub const LONG_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

struct Windows {
    short: RateWindow,
    long: RateWindow,
}

pub struct RateLimiter {
    /// Held by one caller for its whole `acquire`, so callers are admitted in turn.
    gate: Mutex<()>,
    windows: Mutex<Windows>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateUsage {
    pub last_second: usize,
    pub last_day: usize,
    pub remaining_today: usize,
}

impl RateLimiter {
    pub fn new(max_per_second: usize, max_per_day: usize) -> Result<Self, ConfigError> {
        if max_per_second == 0 {
            return Err(ConfigError::ZeroCapacity { window: "per-second" });
        }
        if max_per_day == 0 {
            return Err(ConfigError::ZeroCapacity { window: "per-day" });
        }

        Ok(RateLimiter {
            gate: Mutex::new(()),
            windows: Mutex::new(Windows {
                short: RateWindow::new(max_per_second, SHORT_WINDOW),
                long: RateWindow::new(max_per_day, LONG_WINDOW),
            }),
        })
    }

    /// Waits until both windows admit a call, then records it.
    ///
    /// Returns `RateLimitError::Cancelled` without recording anything if `cancel`
    /// fires while waiting.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), RateLimitError> {
        let _turn = tokio::select! {
            guard = self.gate.lock() => guard,
            _ = cancel.cancelled() => return Err(RateLimitError::Cancelled),
        };

        loop {
            if cancel.is_cancelled() {
                return Err(RateLimitError::Cancelled);
            }

            let Some(wait) = self.try_record().await else {
                return Ok(());
            };

            tokio::select! {
                _ = sleep(wait) => {}
                _ = cancel.cancelled() => return Err(RateLimitError::Cancelled),
            }
        }
    }

    /// Records a call if both windows have room, otherwise returns how long to wait.
    /// The windows are only locked for the check, never across a sleep.
    async fn try_record(&self) -> Option<Duration> {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        windows.long.evict(now);
        windows.short.evict(now);

        // The daily wait is never shorter than the per-second one, so it goes first.
        let wait = windows
            .long
            .wait_time(now)
            .or_else(|| windows.short.wait_time(now));

        match wait {
            Some(wait) => {
                if wait > SHORT_WINDOW {
                    log::warn!(
                        "Daily search quota of {} reached, waiting {:?}",
                        windows.long.capacity(),
                        wait
                    );
                }
                Some(wait)
            }
            None => {
                windows.long.record(now);
                windows.short.record(now);

                let remaining = windows.long.capacity() - windows.long.len();
                if remaining * 10 <= windows.long.capacity() {
                    log::warn!("Running low on daily search quota, {} calls left", remaining);
                }
                None
            }
        }
    }

    pub async fn usage(&self) -> RateUsage {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        windows.long.evict(now);
        windows.short.evict(now);

        RateUsage {
            last_second: windows.short.len(),
            last_day: windows.long.len(),
            remaining_today: windows.long.capacity() - windows.long.len(),
        }
    }
}
