/// Per-client rate limiting
///
/// Token bucket algorithm with in-process state keyed by client IP:
/// - each bucket holds up to `max_requests` tokens
/// - tokens refill continuously at `max_requests / window` per second
/// - each request consumes 1 token and is rejected with 429 when none are left
///
/// The client IP is the first `X-Forwarded-For` hop when present, otherwise
/// the socket peer address.
///
/// # Headers
///
/// - `RateLimit-Limit`: requests allowed per window
/// - `RateLimit-Remaining`: whole tokens left after this request
/// - `Retry-After`: seconds to wait (429 responses only)

use crate::app::AppState;
use crate::config::RateLimitConfig;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");

/// Bucket count above which idle buckets are evicted
const PRUNE_THRESHOLD: usize = 10_000;

/// Token bucket state for one client
#[derive(Debug, Clone)]
struct TokenBucket {
    /// Current number of tokens
    tokens: f64,

    /// Last refill time
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a new full bucket
    fn new(capacity: u32, now: Instant) -> Self {
        TokenBucket {
            tokens: capacity as f64,
            last_refill: now,
        }
    }

    /// Refills tokens based on elapsed time
    fn refill(&mut self, rate: f64, capacity: u32, now: Instant) {
        let elapsed_secs = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed_secs * rate).min(capacity as f64);
        self.last_refill = now;
    }

    /// Attempts to consume N tokens
    fn try_consume(&mut self, count: f64) -> bool {
        if self.tokens >= count {
            self.tokens -= count;
            true
        } else {
            false
        }
    }

    /// Calculates seconds until N tokens available
    fn seconds_until_available(&self, count: f64, rate: f64) -> u64 {
        let deficit = count - self.tokens;
        if deficit <= 0.0 {
            0
        } else {
            (deficit / rate).ceil() as u64
        }
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,

    /// Requests allowed per window
    pub limit: u32,

    /// Whole tokens left
    pub remaining: u32,

    /// Seconds until a token is available (0 when allowed)
    pub retry_after: u64,
}

/// In-memory rate limiter shared by all requests
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    refill_rate: f64,
    window: Duration,
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let window = Duration::from_secs(config.window_secs.max(1));
        Self {
            capacity: config.max_requests.max(1),
            refill_rate: config.max_requests.max(1) as f64 / window.as_secs_f64(),
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Consumes one token for `client`
    pub fn check(&self, client: IpAddr) -> RateLimitDecision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> RateLimitDecision {
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if buckets.len() > PRUNE_THRESHOLD {
            let window = self.window;
            buckets.retain(|_, b| now.saturating_duration_since(b.last_refill) < window);
        }

        let bucket = buckets
            .entry(client)
            .or_insert_with(|| TokenBucket::new(self.capacity, now));
        bucket.refill(self.refill_rate, self.capacity, now);

        let allowed = bucket.try_consume(1.0);
        RateLimitDecision {
            allowed,
            limit: self.capacity,
            remaining: bucket.tokens.floor().max(0.0) as u32,
            retry_after: if allowed {
                0
            } else {
                bucket.seconds_until_available(1.0, self.refill_rate).max(1)
            },
        }
    }
}

/// Resolves the client address used as the rate limit key
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .or_else(|| peer.map(|p| p.ip()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Rate limiting middleware layer
///
/// # Errors
///
/// - 429 Too Many Requests: the client's bucket is empty
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_ip(request.headers(), peer);

    let decision = state.rate_limiter.check(client);
    if !decision.allowed {
        tracing::warn!(client = %client, retry_after = decision.retry_after, "Rate limit exceeded");
        return Err(ApiError::RateLimitExceeded {
            retry_after: decision.retry_after,
            message: "Too many requests, please try again later".to_string(),
        });
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));

    Ok(response)
}
