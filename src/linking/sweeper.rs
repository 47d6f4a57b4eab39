//! Periodic expiry sweep

use super::manager::LinkSessionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Sweep expired tokens every `every` until cancelled.
///
/// Issuing a token also sweeps, so this only bounds how long abandoned
/// tokens linger when nobody is linking.
pub async fn run_sweeper(
    links: Arc<LinkSessionManager>,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let removed = links.sweep_expired_now();
                if removed > 0 {
                    tracing::debug!(removed, remaining = links.live_tokens(), "Swept expired link tokens");
                }
            }
        }
    }

    tracing::debug!("Link token sweeper stopped");
}
