//! # Progress — Atomic Search Progress Counters
//!
//! Shared between the rayon workers of [`crate::search::search_parallel`]
//! and an optional background reporter thread. Counters are lock-free
//! atomics; the current chunk label sits behind a `Mutex` and is written
//! once per chunk.
//!
//! The reporter logs tested / found / rate / current chunk through `tracing`
//! at a fixed interval and exits when [`Progress::stop`] is called.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

/// Default interval between progress log lines.
pub const REPORT_INTERVAL: Duration = Duration::from_secs(30);

/// Granularity at which a sleeping reporter notices shutdown.
const POLL: Duration = Duration::from_millis(100);

pub struct Progress {
    pub tested: AtomicU64,
    pub found: AtomicU64,
    pub chunks_done: AtomicU64,
    pub current: Mutex<String>,
    start: Instant,
    shutdown: AtomicBool,
}

/// Point-in-time copy of the counters.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub tested: u64,
    pub found: u64,
    pub chunks_done: u64,
    pub current: String,
    pub elapsed: Duration,
}

impl Snapshot {
    /// Offsets tested per second.
    pub fn rate(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.tested as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

impl Progress {
    pub fn new() -> Arc<Self> {
        Arc::new(Progress {
            tested: AtomicU64::new(0),
            found: AtomicU64::new(0),
            chunks_done: AtomicU64::new(0),
            current: Mutex::new(String::new()),
            start: Instant::now(),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn set_current(&self, label: impl Into<String>) {
        if let Ok(mut c) = self.current.lock() {
            *c = label.into();
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tested: self.tested.load(Ordering::Relaxed),
            found: self.found.load(Ordering::Relaxed),
            chunks_done: self.chunks_done.load(Ordering::Relaxed),
            current: self
                .current
                .lock()
                .map(|c| c.clone())
                .unwrap_or_default(),
            elapsed: self.start.elapsed(),
        }
    }

    /// Spawn a thread that calls [`Progress::print_status`] every `interval`.
    pub fn start_reporter(self: &Arc<Self>, interval: Duration) -> thread::JoinHandle<()> {
        let progress = Arc::clone(self);
        thread::spawn(move || {
            let mut next = Instant::now() + interval;
            while !progress.is_stopped() {
                thread::sleep(POLL.min(interval));
                if Instant::now() >= next {
                    progress.print_status();
                    next += interval;
                }
            }
        })
    }

    pub fn print_status(&self) {
        let snap = self.snapshot();
        let secs = snap.elapsed.as_secs();
        info!(
            current = %snap.current,
            tested = snap.tested,
            found = snap.found,
            chunks = snap.chunks_done,
            rate = format_args!("{:.2}", snap.rate()),
            elapsed = format_args!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60),
            "search progress"
        );
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}
