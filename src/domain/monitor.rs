//! Convergence monitor: polls NodeClaim drift until a predicate says stop.
//!
//! The loop is Polling until the predicate returns `false`, the cancel
//! future resolves, or a fetch fails. There is no tick limit and a failed
//! fetch is never retried.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::error::MonitorError;
use super::ports::ClaimStatusSource;
use super::types::NodeClaimStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// The predicate asked to stop.
    Converged,
    Cancelled,
}

/// Poll `source` every `interval` (first poll immediately) and hand each
/// snapshot to `evaluate`, which returns whether to keep polling.
pub async fn watch<S, P, C>(
    source: &S,
    interval: Duration,
    mut evaluate: P,
    cancel: C,
) -> Result<MonitorOutcome, MonitorError>
where
    S: ClaimStatusSource + ?Sized,
    P: FnMut(&[NodeClaimStatus]) -> bool,
    C: Future<Output = ()>,
{
    tokio::pin!(cancel);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = &mut cancel => {
                info!(ticks, "nodeclaim monitor cancelled");
                return Ok(MonitorOutcome::Cancelled);
            }
            _ = ticker.tick() => {}
        }

        ticks += 1;
        let statuses = source
            .list_node_claim_statuses()
            .map_err(MonitorError::Fetch)?;
        debug!(
            ticks,
            claims = statuses.len(),
            drifted = statuses.iter().filter(|s| s.drifted).count(),
            "polled nodeclaims"
        );

        if !evaluate(&statuses) {
            info!(ticks, "nodeclaim monitor stopped");
            return Ok(MonitorOutcome::Converged);
        }
    }
}

/// Keep polling while any claim is drifted. An empty list keeps polling too,
/// since new claims may not have been created yet.
pub fn until_converged(statuses: &[NodeClaimStatus]) -> bool {
    statuses.is_empty() || statuses.iter().any(|s| s.drifted)
}
