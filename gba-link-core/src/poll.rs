//! Interruptible busy-polling.
//!
//! Both the multiboot ready wait and the cartridge presence wait are "repeat a
//! round trip until the answer looks right" loops. The device keeps no pending
//! state between polls, so stopping between two round trips never corrupts the
//! link. [`PollOptions`] adds an optional deadline, a pause between polls and a
//! [`CancelToken`] checked before every round trip. The default options poll
//! forever with no pause.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{LinkError, ProtocolError};

/// A cloneable flag another thread can raise to stop a wait loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Limits applied to every poll loop.
#[derive(Debug, Clone, Default)]
pub struct PollOptions {
    /// Give up after this long. `None` waits forever.
    pub timeout: Option<Duration>,

    /// Sleep between unsuccessful polls. `None` busy-polls.
    pub interval: Option<Duration>,

    /// Checked before each round trip.
    pub cancel: Option<CancelToken>,
}

impl PollOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Repeat `round_trip` until `done` accepts its response.
///
/// Returns the accepted response. Fails with [`ProtocolError::Cancelled`] or
/// [`ProtocolError::Timeout`] when the options say so; both are checked
/// before a round trip is started, never in the middle of one.
pub fn poll_until<F, P>(
    options: &PollOptions,
    mut round_trip: F,
    mut done: P,
) -> Result<u32, ProtocolError>
where
    F: FnMut() -> Result<u32, LinkError>,
    P: FnMut(u32) -> bool,
{
    let start = Instant::now();
    let mut attempts: u64 = 0;

    loop {
        if options.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            log::debug!("poll cancelled after {} attempts", attempts);
            return Err(ProtocolError::Cancelled);
        }
        if let Some(limit) = options.timeout {
            let elapsed = start.elapsed();
            if elapsed >= limit {
                return Err(ProtocolError::Timeout { attempts, elapsed });
            }
        }

        let response = round_trip()?;
        attempts += 1;
        if done(response) {
            log::trace!("poll satisfied after {} attempts", attempts);
            return Ok(response);
        }

        if let Some(pause) = options.interval {
            std::thread::sleep(pause);
        }
    }
}

#[cfg(test)]
#[path = "tests/poll_tests.rs"]
mod tests;
