use std::io;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;

use crate::config::CANCEL_POLL_INTERVAL;

/// Write-once, read-many cancellation flag shared with signal handlers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that trips on SIGINT or SIGTERM.
    ///
    /// The handlers only set the atomic flag; loops observe it between frames.
    pub fn from_signals() -> io::Result<Self> {
        let token = Self::new();
        for sig in [SIGINT, SIGTERM] {
            flag::register(sig, Arc::clone(&token.flag))?;
        }
        Ok(token)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Sleep for `duration`, waking early if cancelled.
    ///
    /// Returns `true` when the full duration elapsed without cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(CANCEL_POLL_INTERVAL));
        }
    }
}
