// db/supervisor.rs
//
// Watches the ledger pool with a periodic round-trip probe. On a failed
// probe it walks Connected -> Reconnecting(attempt) -> Connected | Failed,
// with a bounded number of attempts and a fixed delay between them. It does
// not buffer or replay ledger operations that failed during an outage;
// callers see those failures immediately.
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::postgres::PgPool;
use tokio::sync::watch;
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum PoolState {
    Connected,
    Reconnecting { attempt: u32 },
    Failed,
}

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub probe_interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_secs(5),
            probe_interval: Duration::from_secs(30),
        }
    }
}

// Round-trip seam so the supervisor can be exercised without a live pool.
#[async_trait]
pub trait Ping: Send + Sync {
    async fn ping(&self) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl Ping for PgPool {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(self).await.map(|_| ())
    }
}

pub struct ConnectivitySupervisor<P> {
    ping: P,
    policy: ReconnectPolicy,
    state_tx: watch::Sender<PoolState>,
}

impl<P: Ping> ConnectivitySupervisor<P> {
    pub fn new(ping: P, policy: ReconnectPolicy) -> (Self, watch::Receiver<PoolState>) {
        let (state_tx, state_rx) = watch::channel(PoolState::Connected);
        (
            Self {
                ping,
                policy,
                state_tx,
            },
            state_rx,
        )
    }

    /// Probe loop. Runs until reconnection is exhausted, then parks in the
    /// terminal Failed state.
    pub async fn run(self) {
        loop {
            sleep(self.policy.probe_interval).await;

            if self.ping.ping().await.is_ok() {
                continue;
            }

            tracing::error!("Database connection lost, attempting to reconnect...");

            if !self.reconnect().await {
                return;
            }
        }
    }

    // One reconnection sequence: bounded attempts, fixed delay, each attempt
    // verified with a round-trip probe.
    async fn reconnect(&self) -> bool {
        for attempt in 1..=self.policy.max_attempts {
            let _ = self.state_tx.send(PoolState::Reconnecting { attempt });

            sleep(self.policy.retry_delay).await;

            match self.ping.ping().await {
                Ok(()) => {
                    let _ = self.state_tx.send(PoolState::Connected);
                    tracing::info!(
                        "Database connection recovered after {} attempt(s)",
                        attempt
                    );
                    return true;
                }
                Err(e) => {
                    tracing::warn!(
                        "Reconnect attempt {}/{} failed: {}",
                        attempt,
                        self.policy.max_attempts,
                        e
                    );
                }
            }
        }

        let _ = self.state_tx.send(PoolState::Failed);
        tracing::error!(
            "Could not reconnect to the database after {} attempts, giving up",
            self.policy.max_attempts
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Pinger that follows a script of probe outcomes, then succeeds forever.
    struct ScriptedPing {
        script: Vec<bool>,
        cursor: AtomicUsize,
    }

    impl ScriptedPing {
        fn new(script: Vec<bool>) -> Self {
            Self {
                script,
                cursor: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Ping for ScriptedPing {
        async fn ping(&self) -> Result<(), sqlx::Error> {
            let i = self.cursor.fetch_add(1, Ordering::SeqCst);
            match self.script.get(i) {
                Some(true) | None => Ok(()),
                Some(false) => Err(sqlx::Error::PoolClosed),
            }
        }
    }

    fn fast_policy() -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: 5,
            retry_delay: Duration::from_millis(10),
            probe_interval: Duration::from_millis(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_and_reports_attempts() {
        // Probe fails once, then two reconnect attempts fail before the
        // third succeeds.
        let ping = ScriptedPing::new(vec![false, false, false, true]);
        let (supervisor, mut state_rx) = ConnectivitySupervisor::new(ping, fast_policy());

        let handle = tokio::spawn(supervisor.run());

        let mut seen = Vec::new();
        while state_rx.changed().await.is_ok() {
            let state = state_rx.borrow().clone();
            seen.push(state.clone());
            if state == PoolState::Connected {
                break;
            }
        }

        assert_eq!(
            seen,
            vec![
                PoolState::Reconnecting { attempt: 1 },
                PoolState::Reconnecting { attempt: 2 },
                PoolState::Reconnecting { attempt: 3 },
                PoolState::Connected,
            ]
        );

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_bounded_attempts() {
        // Every probe fails: one detection probe plus five reconnect attempts.
        let ping = ScriptedPing::new(vec![false; 6]);
        let (supervisor, mut state_rx) = ConnectivitySupervisor::new(ping, fast_policy());

        let handle = tokio::spawn(supervisor.run());

        let mut last_attempt = 0;
        loop {
            if state_rx.changed().await.is_err() {
                break;
            }
            match state_rx.borrow().clone() {
                PoolState::Reconnecting { attempt } => last_attempt = attempt,
                PoolState::Failed => break,
                PoolState::Connected => panic!("should not recover"),
            }
        }

        assert_eq!(last_attempt, 5);
        assert_eq!(*state_rx.borrow(), PoolState::Failed);

        // The run loop terminates after the terminal state.
        handle.await.unwrap();
    }
}
