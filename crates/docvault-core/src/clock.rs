//! Time and randomness seams
//!
//! Components that stamp times or draw nonces for storage paths take these as
//! injected dependencies so tests can pin both. AEAD nonces are deliberately not
//! routed through `RandomSource`; see `encryption`.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub trait RandomSource: Send + Sync {
    /// Fill `buf` with random bytes.
    fn fill(&self, buf: &mut [u8]);
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Thread-local CSPRNG seeded from the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRandom;

impl RandomSource for SystemRandom {
    fn fill(&self, buf: &mut [u8]) {
        rand::rng().fill_bytes(buf);
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.millis.store(to.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Deterministic byte source: each `fill` writes a big-endian counter.
#[derive(Debug, Default)]
pub struct SequenceRandom {
    counter: AtomicU64,
}

impl SequenceRandom {
    pub fn new(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start),
        }
    }
}

impl RandomSource for SequenceRandom {
    fn fill(&self, buf: &mut [u8]) {
        let value = self.counter.fetch_add(1, Ordering::SeqCst).to_be_bytes();
        buf.fill(0);
        let n = buf.len().min(value.len());
        let start = buf.len() - n;
        buf[start..].copy_from_slice(&value[value.len() - n..]);
    }
}
