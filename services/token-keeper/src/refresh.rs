//! Proactive token refresh
//!
//! The token manager never refreshes on its own. This task is the caller
//! side of that contract: on every tick it asks the manager whether the
//! token expires within the threshold and, if so, runs `acquire()`.
//! A failed refresh keeps the previous token and is retried next tick.

use std::sync::Arc;
use std::time::Duration;

use client_credentials::TokenManager;
use tracing::{debug, info, warn};

/// What one refresh cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Token is outside the threshold; nothing to do.
    Fresh,
    Refreshed,
    Failed,
}

impl RefreshOutcome {
    fn as_label(self) -> &'static str {
        match self {
            RefreshOutcome::Fresh => "fresh",
            RefreshOutcome::Refreshed => "refreshed",
            RefreshOutcome::Failed => "failed",
        }
    }
}

/// Spawn a background task that refreshes the token before it expires.
///
/// Runs every `interval` and refreshes once the token is missing or
/// expires within `threshold`.
pub fn spawn_refresh_task(
    manager: Arc<TokenManager>,
    interval: Duration,
    threshold: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip the immediate first tick; the caller acquires at startup.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            refresh_cycle(&manager, threshold).await;
        }
    })
}

/// Run one refresh cycle.
pub async fn refresh_cycle(manager: &TokenManager, threshold: Duration) -> RefreshOutcome {
    let outcome = if !manager.expires_within(threshold) {
        debug!(
            expires_in_secs = manager.time_until_expiration().num_seconds(),
            "token outside refresh threshold"
        );
        RefreshOutcome::Fresh
    } else {
        debug!(threshold_secs = threshold.as_secs(), "token expiring within threshold, refreshing");
        match manager.acquire().await {
            Ok(()) => {
                info!(
                    expires_in_secs = manager.time_until_expiration().num_seconds(),
                    "token refresh succeeded"
                );
                RefreshOutcome::Refreshed
            }
            Err(e) => {
                warn!(
                    error_kind = e.kind(),
                    error = %e.log_summary(),
                    expired = manager.is_expired(),
                    "token refresh failed, will retry next cycle"
                );
                RefreshOutcome::Failed
            }
        }
    };

    crate::metrics::record_refresh_cycle(outcome.as_label());
    crate::metrics::set_expires_in(manager.time_until_expiration().num_seconds());
    outcome
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use tokio::net::TcpListener;

    pub(crate) const TOKEN_A: &str = "abcDEF1234567890abcDEF12345678";
    pub(crate) const TOKEN_B: &str = "ZYXwvu0987654321ZYXwvu09876543";

    pub(crate) fn token_body(token: &str, expires_in: i64) -> String {
        format!(r#"{{"access_token":"{token}","token_type":"bearer","expires_in":{expires_in}}}"#)
    }

    type Replies = Arc<Mutex<VecDeque<(u16, String)>>>;

    async fn token_handler(State(replies): State<Replies>) -> (StatusCode, String) {
        let mut replies = replies.lock().unwrap();
        let (status, body) = if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap()
        };
        (StatusCode::from_u16(status).unwrap(), body)
    }

    /// Mock identity provider serving `replies` in order, repeating the last one.
    pub(crate) async fn mock_manager(replies: Vec<(u16, String)>) -> TokenManager {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state: Replies = Arc::new(Mutex::new(replies.into()));
        let app = axum::Router::new()
            .route("/token", post(token_handler))
            .with_state(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TokenManager::builder("keeper", "keeper-secret")
            .token_url(format!("http://{addr}/token"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn refresh_cycle_acquires_when_unauthenticated() {
        let manager = mock_manager(vec![(200, token_body(TOKEN_A, 3600))]).await;

        let outcome = refresh_cycle(&manager, Duration::from_secs(300)).await;

        assert_eq!(outcome, RefreshOutcome::Refreshed);
        assert_eq!(manager.current_token(), TOKEN_A);
    }

    #[tokio::test]
    async fn refresh_cycle_skips_fresh_token() {
        let manager = mock_manager(vec![
            (200, token_body(TOKEN_A, 3600)),
            (200, token_body(TOKEN_B, 3600)),
        ])
        .await;
        manager.acquire().await.unwrap();

        let outcome = refresh_cycle(&manager, Duration::from_secs(300)).await;

        assert_eq!(outcome, RefreshOutcome::Fresh);
        assert_eq!(manager.current_token(), TOKEN_A);
    }

    #[tokio::test]
    async fn refresh_cycle_replaces_expiring_token() {
        let manager = mock_manager(vec![
            (200, token_body(TOKEN_A, 60)),
            (200, token_body(TOKEN_B, 3600)),
        ])
        .await;
        manager.acquire().await.unwrap();

        let outcome = refresh_cycle(&manager, Duration::from_secs(300)).await;

        assert_eq!(outcome, RefreshOutcome::Refreshed);
        assert_eq!(manager.current_token(), TOKEN_B);
        assert!(!manager.expires_within(Duration::from_secs(300)));
    }

    #[tokio::test]
    async fn refresh_cycle_failure_keeps_previous_token() {
        let manager = mock_manager(vec![
            (200, token_body(TOKEN_A, 60)),
            (503, "upstream unavailable".into()),
        ])
        .await;
        manager.acquire().await.unwrap();

        let outcome = refresh_cycle(&manager, Duration::from_secs(300)).await;

        assert_eq!(outcome, RefreshOutcome::Failed);
        assert_eq!(manager.current_token(), TOKEN_A);
        assert!(!manager.is_expired());
    }

    #[tokio::test]
    async fn spawned_task_refreshes_on_tick() {
        let manager = Arc::new(mock_manager(vec![(200, token_body(TOKEN_A, 3600))]).await);

        let handle = spawn_refresh_task(
            Arc::clone(&manager),
            Duration::from_millis(20),
            Duration::from_secs(300),
        );

        for _ in 0..100 {
            if !manager.current_token().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert_eq!(manager.current_token(), TOKEN_A);
    }
}
