//! Per-client upload throttling

mod limiter;

pub use limiter::TokenBucketLimiter;
