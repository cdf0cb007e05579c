//! Thread-backed command timer.
//!
//! Implements [`CommandTimer`] with one short-lived `std::thread` per armed
//! deadline. On expiry the thread posts
//! [`EngineCommand::CommandTimeout`] into the engine queue, unless the
//! deadline was cancelled or superseded in the meantime. A timeout that
//! still slips through is dropped by the engine as stale.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

use log::{error, warn};

use crate::app::commands::EngineCommand;
use crate::app::ports::CommandTimer;
use crate::app::queue::EngineQueue;
use crate::command::TimerToken;

/// No deadline armed. Tokens start at 1.
const DISARMED: u32 = 0;

pub struct ThreadTimer {
    queue: Arc<EngineQueue>,
    armed: Arc<AtomicU32>,
}

impl ThreadTimer {
    pub fn new(queue: Arc<EngineQueue>) -> Self {
        Self {
            queue,
            armed: Arc::new(AtomicU32::new(DISARMED)),
        }
    }

    pub fn armed(&self) -> Option<TimerToken> {
        match self.armed.load(Ordering::Acquire) {
            DISARMED => None,
            raw => Some(TimerToken(raw)),
        }
    }
}

impl CommandTimer for ThreadTimer {
    fn start(&mut self, token: TimerToken, timeout_ms: u32) {
        self.armed.store(token.0, Ordering::Release);
        let queue = Arc::clone(&self.queue);
        let armed = Arc::clone(&self.armed);

        let spawned = thread::Builder::new()
            .name("ncilink-cmd-timer".into())
            .spawn(move || {
                thread::sleep(Duration::from_millis(u64::from(timeout_ms)));
                if armed
                    .compare_exchange(token.0, DISARMED, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    return;
                }
                if queue.post(EngineCommand::CommandTimeout(token)).is_err() {
                    warn!("CMD: timeout {} dropped, engine queue full", token.0);
                }
            });
        if let Err(e) = spawned {
            error!("CMD: timer thread for token {} failed: {}", token.0, e);
        }
    }

    fn cancel(&mut self, token: TimerToken) {
        // A newer deadline stays armed.
        let _ = self.armed.compare_exchange(
            token.0,
            DISARMED,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}
