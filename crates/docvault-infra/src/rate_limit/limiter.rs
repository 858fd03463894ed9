use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use docvault_core::RateLimiter;
use tokio::sync::Mutex;

const DEFAULT_SHARD_COUNT: usize = 16;
/// Calls per shard between sweeps of fully refilled buckets
const SWEEP_INTERVAL: u64 = 1024;

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64, // tokens per second
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// A full bucket is indistinguishable from a fresh one and can be dropped.
    fn is_full(&mut self) -> bool {
        self.refill();
        self.tokens >= self.capacity
    }

    fn try_acquire(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Default)]
struct Shard {
    buckets: HashMap<String, TokenBucket>,
    calls: u64,
}

impl Shard {
    fn evict_full(&mut self) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| !bucket.is_full());
        before - self.buckets.len()
    }
}

/// Sharded per-client token bucket limiter.
///
/// Clients hash onto separate shards so concurrent uploads from different
/// clients rarely contend on the same lock. Each shard periodically drops
/// buckets that have refilled to capacity, so memory tracks active clients.
#[derive(Clone)]
pub struct TokenBucketLimiter {
    shards: Vec<Arc<Mutex<Shard>>>,
    burst: f64,
    refill_per_sec: f64,
}

impl TokenBucketLimiter {
    /// `burst` uploads at once, refilling at `refill_per_sec`.
    pub fn new(burst: u32, refill_per_sec: f64) -> Self {
        Self::with_shards(burst, refill_per_sec, DEFAULT_SHARD_COUNT)
    }

    pub fn with_shards(burst: u32, refill_per_sec: f64, shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Arc::new(Mutex::new(Shard::default())))
            .collect();
        Self {
            shards,
            burst: f64::from(burst),
            refill_per_sec,
        }
    }

    fn shard(&self, client_id: &str) -> &Arc<Mutex<Shard>> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        client_id.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// Try to take one token for `client_id` without waiting
    pub async fn try_acquire(&self, client_id: &str) -> bool {
        let mut shard = self.shard(client_id).lock().await;
        shard.calls += 1;
        if shard.calls % SWEEP_INTERVAL == 0 {
            let evicted = shard.evict_full();
            tracing::trace!(evicted, "Swept idle rate limit buckets");
        }

        let bucket = shard
            .buckets
            .entry(client_id.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst, self.refill_per_sec));

        let acquired = bucket.try_acquire();
        tracing::trace!(
            acquired,
            tokens_remaining = bucket.tokens,
            "Upload rate limit check"
        );
        acquired
    }

    /// Tokens currently available to `client_id`
    pub async fn available_tokens(&self, client_id: &str) -> f64 {
        let mut shard = self.shard(client_id).lock().await;
        match shard.buckets.get_mut(client_id) {
            Some(bucket) => {
                bucket.refill();
                bucket.tokens
            }
            None => self.burst,
        }
    }

    /// Drop every bucket that has refilled to capacity; returns how many went
    pub async fn evict_idle(&self) -> usize {
        let mut evicted = 0;
        for shard in &self.shards {
            evicted += shard.lock().await.evict_full();
        }
        evicted
    }

    /// Number of clients currently holding a bucket
    pub async fn tracked_clients(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.lock().await.buckets.len();
        }
        total
    }
}

#[async_trait]
impl RateLimiter for TokenBucketLimiter {
    async fn check(&self, client_id: &str) -> bool {
        self.try_acquire(client_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn burst_then_reject() {
        let limiter = TokenBucketLimiter::new(2, 0.0);
        assert!(limiter.check("client-a").await);
        assert!(limiter.check("client-a").await);
        assert!(!limiter.check("client-a").await);
    }

    #[tokio::test]
    async fn clients_are_independent() {
        let limiter = TokenBucketLimiter::new(1, 0.0);
        assert!(limiter.check("client-a").await);
        assert!(!limiter.check("client-a").await);
        assert!(limiter.check("client-b").await);
    }

    #[tokio::test]
    async fn refills_over_time() {
        let limiter = TokenBucketLimiter::new(1, 50.0);
        assert!(limiter.try_acquire("client-a").await);
        assert!(limiter.available_tokens("client-a").await < 1.0);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(limiter.try_acquire("client-a").await);
    }

    #[tokio::test]
    async fn refilled_buckets_are_evicted() {
        let limiter = TokenBucketLimiter::new(1, 1000.0);
        for i in 0..500 {
            assert!(limiter.check(&format!("client-{}", i)).await);
        }
        assert_eq!(limiter.tracked_clients().await, 500);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(limiter.evict_idle().await, 500);
        assert_eq!(limiter.tracked_clients().await, 0);
    }

    #[tokio::test]
    async fn periodic_sweep_drops_idle_clients() {
        let limiter = TokenBucketLimiter::with_shards(1, 1000.0, 1);
        for i in 0..SWEEP_INTERVAL - 1 {
            limiter.check(&format!("client-{}", i)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        // This call lands on the sweep boundary
        assert!(limiter.check("late-client").await);
        assert_eq!(limiter.tracked_clients().await, 1);
    }

    #[tokio::test]
    async fn exhausted_buckets_survive_sweep() {
        let limiter = TokenBucketLimiter::new(1, 0.0);
        assert!(limiter.check("client-a").await);
        assert_eq!(limiter.evict_idle().await, 0);
        assert!(!limiter.check("client-a").await);
    }

    #[tokio::test]
    async fn unknown_client_has_full_burst() {
        let limiter = TokenBucketLimiter::with_shards(5, 1.0, 4);
        assert_eq!(limiter.available_tokens("nobody").await, 5.0);
    }
}
