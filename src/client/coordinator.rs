//! Single-flight refresh coordination.
//!
//! The first caller to see an expired token becomes the leader and performs
//! the refresh. Callers arriving while it runs are queued and receive the
//! leader's result, in arrival order, when it settles.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::debug;

use super::error::RefreshError;

type RefreshResult = Result<String, RefreshError>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    waiters: Vec<oneshot::Sender<RefreshResult>>,
}

/// Shared between all requests of one client.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// Outcome of [`RefreshCoordinator::acquire_or_join`].
pub enum Acquired<'a> {
    /// No refresh was in flight; the caller must perform it and settle.
    Leader(RefreshLeader<'a>),
    /// A refresh is in flight; await its result.
    Follower(oneshot::Receiver<RefreshResult>),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn acquire_or_join(&self) -> Acquired<'_> {
        let mut state = self.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            debug!(queued = state.waiters.len(), "Joined in-flight refresh");
            Acquired::Follower(rx)
        } else {
            state.refreshing = true;
            Acquired::Leader(RefreshLeader {
                coordinator: self,
                settled: false,
            })
        }
    }

    /// Whether a refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Callers currently queued behind the leader.
    pub fn pending(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Run `refresh` if no refresh is in flight, otherwise wait for the one
    /// that is. Either way every caller gets the same result.
    pub async fn run<F, Fut>(&self, refresh: F) -> RefreshResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshResult>,
    {
        match self.acquire_or_join() {
            Acquired::Leader(leader) => {
                let result = refresh().await;
                leader.settle(result.clone());
                result
            }
            // A dropped sender means the leader was cancelled mid-settle.
            Acquired::Follower(rx) => rx.await.unwrap_or(Err(RefreshError::Abandoned)),
        }
    }

    fn finish(&self, result: &RefreshResult) {
        let waiters = {
            let mut state = self.lock();
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };

        debug!(
            waiters = waiters.len(),
            ok = result.is_ok(),
            "Refresh settled"
        );
        for tx in waiters {
            // A waiter that gave up has dropped its receiver.
            let _ = tx.send(result.clone());
        }
    }
}

/// Exclusive right to perform the in-flight refresh. Dropping it without
/// calling [`settle`](Self::settle) rejects every waiter with
/// [`RefreshError::Abandoned`].
pub struct RefreshLeader<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshLeader<'_> {
    /// Deliver `result` to every queued caller and clear the in-flight flag.
    pub fn settle(mut self, result: RefreshResult) {
        self.settled = true;
        self.coordinator.finish(&result);
    }
}

impl Drop for RefreshLeader<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.finish(&Err(RefreshError::Abandoned));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_followers_receive_leader_result_in_order() {
        let coordinator = RefreshCoordinator::new();

        let Acquired::Leader(leader) = coordinator.acquire_or_join() else {
            panic!("first caller must lead");
        };
        let mut receivers = Vec::new();
        for _ in 0..3 {
            match coordinator.acquire_or_join() {
                Acquired::Follower(rx) => receivers.push(rx),
                Acquired::Leader(_) => panic!("second leader while refreshing"),
            }
        }
        assert_eq!(coordinator.pending(), 3);

        leader.settle(Ok("fresh".into()));

        assert_eq!(coordinator.pending(), 0);
        assert!(!coordinator.is_refreshing());
        for rx in receivers {
            assert_eq!(rx.await.unwrap(), Ok("fresh".to_string()));
        }
    }

    #[tokio::test]
    async fn test_dropped_leader_abandons_waiters() {
        let coordinator = RefreshCoordinator::new();

        let leader = coordinator.acquire_or_join();
        let Acquired::Follower(rx) = coordinator.acquire_or_join() else {
            panic!("expected follower");
        };
        drop(leader);

        assert_eq!(rx.await.unwrap(), Err(RefreshError::Abandoned));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_next_refresh_after_settle_gets_new_leader() {
        let coordinator = RefreshCoordinator::new();

        let first = coordinator
            .run(|| async { Err(RefreshError::Rejected(500)) })
            .await;
        assert_eq!(first, Err(RefreshError::Rejected(500)));

        let second = coordinator.run(|| async { Ok("t2".to_string()) }).await;
        assert_eq!(second, Ok("t2".to_string()));
    }

    #[test]
    fn test_closed_receiver_does_not_block_settle() {
        let coordinator = RefreshCoordinator::new();
        let Acquired::Leader(leader) = coordinator.acquire_or_join() else {
            panic!("first caller must lead");
        };
        if let Acquired::Follower(rx) = coordinator.acquire_or_join() {
            drop(rx);
        }
        leader.settle(Ok("t".into()));
        assert_eq!(coordinator.pending(), 0);
    }
}
