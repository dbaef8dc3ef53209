//! ICE restart recovery for the publishing session
//!
//! When the publishing peer connection reports `Failed`, the supervisor asks
//! the negotiator for an ICE restart round. Attempts are bounded by
//! [`IceRestartPolicy`] and back off exponentially; the budget is refilled
//! once the connection reports `Connected` again.

use crate::error::ClientResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use streamrtc_session_core::{PeerConnectionState, PeerDirection, SessionEvent, SessionNegotiator};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Bounds on automatic ICE restarts
///
/// # Examples
///
/// ```rust
/// # use streamrtc_client_core::IceRestartPolicy;
/// # use std::time::Duration;
/// let policy = IceRestartPolicy::default();
/// assert_eq!(policy.max_attempts, 3);
/// assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(1000));
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(2000));
/// assert_eq!(policy.delay_for_attempt(10), Duration::from_millis(10_000));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IceRestartPolicy {
    /// Whether failed publishing connections are restarted at all
    pub enabled: bool,
    /// Restart attempts per failure before giving up
    pub max_attempts: u32,
    /// Delay before the first attempt
    pub initial_delay_ms: u64,
    /// Upper bound on the delay between attempts
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays
    pub use_jitter: bool,
}

impl Default for IceRestartPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

impl IceRestartPolicy {
    /// A policy that never restarts
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_delay_ms = initial.as_millis() as u64;
        self.max_delay_ms = max.as_millis() as u64;
        self
    }

    pub fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Un-jittered delay before the zero-based `attempt`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.max(1.0).powi(attempt.min(32) as i32);
        let millis = (self.initial_delay_ms as f64 * factor).min(self.max_delay_ms as f64);
        Duration::from_millis(millis as u64)
    }

    fn jittered_delay(&self, attempt: u32) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        if !self.use_jitter {
            return delay;
        }
        let jitter = (rand::random::<f64>() - 0.5) * 0.2; // ±10%
        Duration::from_millis((delay.as_millis() as f64 * (1.0 + jitter)) as u64)
    }

    /// Reject values the supervisor cannot work with
    pub fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        if self.max_attempts == 0 {
            return Err("ice_restart.max_attempts must be at least 1 when enabled".to_string());
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err("ice_restart.max_delay_ms must not be below initial_delay_ms".to_string());
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err("ice_restart.backoff_multiplier must be a finite value >= 1.0".to_string());
        }
        Ok(())
    }
}

/// Watch the negotiator's session events and restart ICE on publishing
/// failures. Returns `None` when the policy is disabled.
pub fn spawn_ice_supervisor(
    negotiator: Arc<SessionNegotiator>,
    policy: IceRestartPolicy,
) -> Option<JoinHandle<()>> {
    if !policy.enabled {
        debug!("ICE restart disabled");
        return None;
    }
    let events = negotiator.subscribe_events();
    Some(tokio::spawn(supervise(negotiator, events, policy)))
}

async fn supervise(
    negotiator: Arc<SessionNegotiator>,
    mut events: broadcast::Receiver<SessionEvent>,
    policy: IceRestartPolicy,
) {
    let mut attempt = 0;

    loop {
        let state = match events.recv().await {
            Ok(SessionEvent::ConnectionStateChanged {
                direction: PeerDirection::Publish,
                state,
            }) => state,
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "ICE supervisor lagged behind session events");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match state {
            PeerConnectionState::Connected => {
                if attempt > 0 {
                    info!(attempts = attempt, "Publishing connection recovered");
                }
                attempt = 0;
            }
            PeerConnectionState::Failed => {
                attempt = restart_with_backoff(&negotiator, &policy, attempt).await;
            }
            _ => {}
        }
    }
    debug!("ICE supervisor stopped");
}

/// Run restart rounds until one succeeds or the budget runs out; returns the
/// number of attempts used so far
async fn restart_with_backoff(
    negotiator: &SessionNegotiator,
    policy: &IceRestartPolicy,
    mut attempt: u32,
) -> u32 {
    while attempt < policy.max_attempts {
        let delay = policy.jittered_delay(attempt);
        attempt += 1;
        info!(
            attempt,
            max_attempts = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Publishing connection failed, restarting ICE"
        );
        sleep(delay).await;

        match restart_once(negotiator).await {
            Ok(()) => return attempt,
            Err(e) if e.is_recoverable() => {
                warn!(attempt, error = %e, category = e.category(), "ICE restart failed, will retry");
            }
            Err(e) => {
                error!(error = %e, category = e.category(), "ICE restart failed, not retrying");
                return policy.max_attempts;
            }
        }
    }

    warn!(
        attempts = attempt,
        "Giving up on ICE restart until the publishing connection recovers"
    );
    attempt
}

async fn restart_once(negotiator: &SessionNegotiator) -> ClientResult<()> {
    negotiator.restart_ice().await?;
    Ok(())
}
