//! Per-client fixed-window rate limiting.
//!
//! Every client IP gets `max_requests` per window. The window starts with the
//! first request and resets once it has fully elapsed. Clients are keyed by
//! socket peer unless the proxy headers are explicitly trusted.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{config::RateLimitConfig, error::ErrorBody, state::AppState};

pub const TOO_MANY_REQUESTS: &str = "Too many requests, please try again later.";

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<IpAddr, Window>,
    config: RateLimitConfig,
    window: Duration,
}

/// Budget left for a client after an admitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the window resets.
    pub reset_after: u64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            window: Duration::from_secs(config.window_seconds),
            config,
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn limit(&self) -> u32 {
        self.config.max_requests
    }

    pub fn trust_proxy(&self) -> bool {
        self.config.trust_proxy
    }

    /// Counts a request from `ip`. `Err` carries the seconds to wait.
    pub fn check(&self, ip: IpAddr) -> Result<RateLimitInfo, u64> {
        self.check_at(ip, Instant::now())
    }

    pub fn check_at(&self, ip: IpAddr, now: Instant) -> Result<RateLimitInfo, u64> {
        let mut entry = self.windows.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });

        let mut elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            entry.started = now;
            entry.count = 0;
            elapsed = Duration::ZERO;
        }

        // Round up so a client never retries a moment too early.
        let left = self.window - elapsed;
        let reset_after = left.as_secs() + u64::from(left.subsec_nanos() > 0);

        if entry.count >= self.config.max_requests {
            return Err(reset_after.max(1));
        }
        entry.count += 1;
        Ok(RateLimitInfo {
            limit: self.config.max_requests,
            remaining: self.config.max_requests - entry.count,
            reset_after,
        })
    }

    /// Drops windows that have fully elapsed.
    pub fn cleanup_expired(&self) {
        self.cleanup_expired_at(Instant::now());
    }

    pub fn cleanup_expired_at(&self, now: Instant) {
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
    }

    pub fn entry_count(&self) -> usize {
        self.windows.len()
    }
}

/// Periodically evicts stale windows so the map does not grow without bound.
pub fn spawn_cleanup_task(limiter: Arc<RateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            limiter.cleanup_expired();
            debug!(entries = limiter.entry_count(), "rate limiter cleanup complete");
        }
    })
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    let value = headers.get(name)?.to_str().ok()?;
    // First hop is the original client.
    value.split(',').next()?.trim().parse().ok()
}

/// The socket peer. With `trust_proxy`, X-Forwarded-For and then X-Real-IP
/// take precedence over it.
pub fn client_ip(request: &Request, trust_proxy: bool) -> IpAddr {
    let forwarded = || {
        header_ip(request.headers(), "x-forwarded-for")
            .or_else(|| header_ip(request.headers(), "x-real-ip"))
    };
    trust_proxy
        .then(forwarded)
        .flatten()
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let limiter = &state.rate_limiter;
    if !limiter.enabled() {
        return next.run(request).await;
    }

    let ip = client_ip(&request, limiter.trust_proxy());
    match limiter.check(ip) {
        Ok(info) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(info.limit));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(info.remaining));
            headers.insert("x-ratelimit-reset", HeaderValue::from(info.reset_after));
            response
        }
        Err(retry_after) => {
            warn!(%ip, retry_after, "rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                [
                    ("retry-after", HeaderValue::from(retry_after)),
                    ("x-ratelimit-limit", HeaderValue::from(limiter.limit())),
                    ("x-ratelimit-remaining", HeaderValue::from(0u32)),
                    ("x-ratelimit-reset", HeaderValue::from(retry_after)),
                ],
                Json(ErrorBody {
                    message: TOO_MANY_REQUESTS.to_string(),
                }),
            )
                .into_response()
        }
    }
}
