//! Session state and the timing rules that drive it

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

use crate::error::SessionError;

/// Largest accepted difference between server and local clocks
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Upper bound for reconnect delays
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Poll interval right after a color change
pub const POLL_FLOOR: Duration = Duration::from_millis(100);

/// Poll interval once the color has been quiet for a while
pub const POLL_CEILING: Duration = Duration::from_secs(5);

/// Upstream connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal: no further reconnects
    ShuttingDown,
}

/// Mutable state of one bridge session
#[derive(Debug)]
pub struct SessionState {
    pub connection: ConnectionState,
    /// A server `time` message passed the skew check
    pub verified_time: bool,
    /// Consecutive failed connection cycles
    pub attempt: u32,
    /// Last color word read from or written to the board
    pub color: Option<u32>,
    /// When `color` last changed
    pub last_change: Instant,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            verified_time: false,
            attempt: 0,
            color: None,
            last_change: Instant::now(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    pub fn is_shutting_down(&self) -> bool {
        self.connection == ConnectionState::ShuttingDown
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Reconnect delay for the given attempt: `min(60, 0.5 * 2^attempt)` seconds
pub fn backoff_delay(attempt: u32) -> Duration {
    let secs = 0.5 * 2f64.powi(attempt.min(16) as i32);
    Duration::from_secs_f64(secs).min(MAX_BACKOFF)
}

/// Next poll delay: `min(5, 0.1 + since_change / 5)` seconds
pub fn poll_interval(since_change: Duration) -> Duration {
    (POLL_FLOOR + since_change / 5).min(POLL_CEILING)
}

/// Delay from `now` to the next multiple of `interval` since the epoch
///
/// A `now` that sits exactly on the grid waits a full interval.
pub fn next_grid_delay(now: SystemTime, interval: Duration) -> Duration {
    let interval_ms = interval.as_millis().max(1);
    let now_ms = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let next_ms = (now_ms / interval_ms + 1) * interval_ms;
    Duration::from_millis((next_ms - now_ms) as u64)
}

/// Milliseconds since the Unix epoch
pub fn unix_millis(now: SystemTime) -> i64 {
    now.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Accept the server clock if it is within [`MAX_CLOCK_SKEW`] of ours
pub fn check_time(server_ms: i64, local_ms: i64) -> Result<(), SessionError> {
    let skew_ms = server_ms.saturating_sub(local_ms);
    if skew_ms.unsigned_abs() < MAX_CLOCK_SKEW.as_millis() as u64 {
        Ok(())
    } else {
        Err(SessionError::StaleTime { skew_ms })
    }
}
