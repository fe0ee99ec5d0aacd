//! Per-client fixed-window rate limiting for the API surface. The layer is
//! mounted on the `/api` router only, so health probes are never counted.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::{broadcast, Mutex};

use crate::response::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u64,
}

/// Outcome of one admission check, also the source of the `ratelimit-*`
/// response headers.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: u64,
}

#[derive(Debug)]
pub struct RateLimitState {
    window: Duration,
    max_requests: u64,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimitState {
    pub fn new(window_secs: u64, max_requests: u64) -> Self {
        Self {
            window: Duration::from_secs(window_secs),
            max_requests,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }

    /// Counts one request against the client's current window, opening a
    /// fresh window when the old one has lapsed.
    pub async fn try_acquire(&self, client: IpAddr) -> Decision {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows.entry(client).or_insert(Window {
            started: now,
            hits: 0,
        });

        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.hits = 0;
        }

        let allowed = window.hits < self.max_requests;
        if allowed {
            window.hits += 1;
        }

        let reset_after = self
            .window
            .saturating_sub(now.duration_since(window.started));
        let unix_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Decision {
            allowed,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(window.hits),
            reset_at: unix_now + reset_after.as_secs(),
        }
    }

    /// Drops windows idle for longer than two full periods.
    pub async fn sweep(&self) {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        windows.retain(|_, w| now.duration_since(w.started) <= self.window * 2);
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = extract_client_ip(req.headers(), state.config().trust_proxy);
    let decision = state.rate_limit().try_acquire(client).await;

    if !decision.allowed {
        let mut response =
            AppError::too_many_requests("Too many requests, please try again later")
                .into_response();
        apply_decision_headers(&mut response, &decision);
        if let Ok(v) = state.rate_limit().window_secs().to_string().parse() {
            response.headers_mut().insert("retry-after", v);
        }
        return Ok(response);
    }

    let mut response = next.run(req).await;
    apply_decision_headers(&mut response, &decision);
    Ok(response)
}

fn apply_decision_headers(response: &mut Response, decision: &Decision) {
    let headers = [
        ("ratelimit-limit", decision.limit),
        ("ratelimit-remaining", decision.remaining),
        ("ratelimit-reset", decision.reset_at),
    ];
    for (name, value) in headers {
        if let Ok(v) = value.to_string().parse() {
            response.headers_mut().insert(name, v);
        }
    }
}

/// Client identity for limiting. `x-forwarded-for` is only honored when the
/// deployment declares a trusted proxy in front; otherwise a spoofed header
/// would let clients reset their own bucket.
pub fn extract_client_ip(headers: &HeaderMap, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

pub async fn rate_limit_cleanup_loop(
    state: Arc<RateLimitState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(300));
    loop {
        tokio::select! {
            _ = interval.tick() => state.sweep().await,
            _ = shutdown_rx.recv() => break,
        }
    }
}
