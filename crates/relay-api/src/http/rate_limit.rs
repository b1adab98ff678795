use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use relay_shared::config::RateLimitSettings;
use tracing::warn;

use super::AppState;
use super::client_addr::ClientAddress;
use super::errors::too_many_requests_response;

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Sliding-window request ceiling per caller, shared by every `/api/` route.
#[derive(Clone)]
pub struct RateLimiter {
    entries: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    policy: RateLimitPolicy,
}

#[derive(Debug, Clone, Copy)]
struct RateLimitPolicy {
    max_requests: usize,
    window: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RateLimitDecision {
    Allowed {
        remaining: usize,
        reset_seconds: u64,
    },
    Denied {
        retry_after_seconds: u64,
    },
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            policy: RateLimitPolicy {
                max_requests: settings.max_requests,
                window: Duration::from_millis(settings.window_ms),
            },
        }
    }

    pub fn spawn_pruner(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let entries = Arc::clone(&self.entries);
        let window = self.policy.window;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                prune_entries(&entries, window, Instant::now());
            }
        })
    }

    fn check(&self, subject: &str) -> RateLimitDecision {
        self.check_at(subject, Instant::now())
    }

    fn check_at(&self, subject: &str, now: Instant) -> RateLimitDecision {
        let window = self.policy.window;
        let cutoff = now.checked_sub(window).unwrap_or(now);

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let bucket = entries.entry(subject.to_string()).or_default();
        prune_bucket(bucket, cutoff);

        let reset_seconds = |bucket: &VecDeque<Instant>| {
            bucket
                .front()
                .map(|first_seen| {
                    let elapsed = now.saturating_duration_since(*first_seen);
                    window.saturating_sub(elapsed).as_secs().max(1)
                })
                .unwrap_or_else(|| window.as_secs().max(1))
        };

        if bucket.len() >= self.policy.max_requests {
            return RateLimitDecision::Denied {
                retry_after_seconds: reset_seconds(bucket),
            };
        }

        bucket.push_back(now);

        RateLimitDecision::Allowed {
            remaining: self.policy.max_requests - bucket.len(),
            reset_seconds: reset_seconds(bucket),
        }
    }
}

fn prune_entries(
    entries: &Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    window: Duration,
    now: Instant,
) {
    let cutoff = now.checked_sub(window).unwrap_or(now);
    let mut state = entries.lock().unwrap_or_else(PoisonError::into_inner);

    state.retain(|_, bucket| {
        prune_bucket(bucket, cutoff);
        !bucket.is_empty()
    });
}

fn prune_bucket(bucket: &mut VecDeque<Instant>, cutoff: Instant) {
    while let Some(front) = bucket.front() {
        if *front <= cutoff {
            bucket.pop_front();
        } else {
            break;
        }
    }
}

pub(super) async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let subject = req
        .extensions()
        .get::<ClientAddress>()
        .copied()
        .unwrap_or(ClientAddress(None))
        .rate_limit_subject();

    let limit = state.rate_limiter.policy.max_requests;
    match state.rate_limiter.check(&subject) {
        RateLimitDecision::Allowed {
            remaining,
            reset_seconds,
        } => {
            let mut response = next.run(req).await;
            insert_limit_headers(response.headers_mut(), limit, remaining, reset_seconds);
            response
        }
        RateLimitDecision::Denied {
            retry_after_seconds,
        } => {
            warn!(
                subject = %subject,
                retry_after_seconds, "request denied by api rate limit",
            );
            let mut response = too_many_requests_response(retry_after_seconds);
            insert_limit_headers(response.headers_mut(), limit, 0, retry_after_seconds);
            response
        }
    }
}

fn insert_limit_headers(headers: &mut HeaderMap, limit: usize, remaining: usize, reset: u64) {
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(reset));
}
