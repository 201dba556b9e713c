//! Fixed-window rate limiting for the JSON API.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Mutex,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{error::AppError, AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

/// Injected limiter so handlers never reach for a global map.
pub trait RateLimiter: Send + Sync {
    fn check(&self, identifier: &str) -> RateLimitDecision;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_time: Instant,
}

/// Counts requests per identifier in fixed windows.
///
/// A window starts with the first request after the previous one elapsed;
/// the counter is never decremented inside a window.
pub struct FixedWindowRateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    max_requests: u32,
    window: Duration,
}

impl FixedWindowRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    pub fn check_at(&self, identifier: &str, now: Instant) -> RateLimitDecision {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match windows.get_mut(identifier) {
            Some(entry) if now < entry.reset_time => {
                if entry.count >= self.max_requests {
                    RateLimitDecision::Limited {
                        retry_after: entry.reset_time - now,
                    }
                } else {
                    entry.count += 1;
                    RateLimitDecision::Allowed {
                        remaining: self.max_requests - entry.count,
                    }
                }
            }
            _ => {
                if self.max_requests == 0 {
                    return RateLimitDecision::Limited {
                        retry_after: self.window,
                    };
                }
                windows.insert(
                    identifier.to_string(),
                    Window {
                        count: 1,
                        reset_time: now + self.window,
                    },
                );
                RateLimitDecision::Allowed {
                    remaining: self.max_requests - 1,
                }
            }
        }
    }

    /// Drops windows that have elapsed; returns how many were removed.
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = windows.len();
        windows.retain(|_, entry| now < entry.reset_time);
        before - windows.len()
    }

    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn tracked(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl RateLimiter for FixedWindowRateLimiter {
    fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, Instant::now())
    }
}

/// Client identity: first `x-forwarded-for` hop, then the peer address.
pub fn client_identifier(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let identifier = client_identifier(request.headers(), peer);

    match state.rate_limiter.check(&identifier) {
        RateLimitDecision::Allowed { .. } => next.run(request).await,
        RateLimitDecision::Limited { retry_after } => {
            warn!(client = %identifier, "Rate limit exceeded");
            AppError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            }
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_request_over_limit_until_window_elapses() {
        let limiter = FixedWindowRateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("10.0.0.1", start).is_allowed());
        }
        assert!(matches!(
            limiter.check_at("10.0.0.1", start + Duration::from_secs(59)),
            RateLimitDecision::Limited { retry_after } if retry_after == Duration::from_secs(1)
        ));

        let later = start + Duration::from_secs(60);
        assert_eq!(
            limiter.check_at("10.0.0.1", later),
            RateLimitDecision::Allowed { remaining: 2 }
        );
    }

    #[test]
    fn identifiers_are_counted_independently() {
        let limiter = FixedWindowRateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at("a", now).is_allowed());
        assert!(!limiter.check_at("a", now).is_allowed());
        assert!(limiter.check_at("b", now).is_allowed());
    }

    #[test]
    fn purge_removes_only_elapsed_windows() {
        let limiter = FixedWindowRateLimiter::new(5, Duration::from_secs(10));
        let now = Instant::now();

        limiter.check_at("old", now);
        limiter.check_at("new", now + Duration::from_secs(8));

        assert_eq!(limiter.purge_expired_at(now + Duration::from_secs(12)), 1);
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn client_identifier_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "192.168.1.5:4000".parse().unwrap();

        assert_eq!(client_identifier(&headers, Some(peer)), "192.168.1.5");
        assert_eq!(client_identifier(&headers, None), "unknown");

        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        assert_eq!(client_identifier(&headers, Some(peer)), "203.0.113.9");
    }
}
