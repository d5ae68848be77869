//! Single-Flight Module
//!
//! Lets concurrent misses for one key share the first caller's computation.
//! The registry mutex is only held for map updates, never across an await.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

/// Serialized result published by the leader; None until it completes.
type Payload = Option<Arc<str>>;

#[derive(Debug, Default)]
pub(crate) struct SingleFlight {
    inflight: Mutex<HashMap<String, watch::Receiver<Payload>>>,
}

pub(crate) enum Flight<'a> {
    /// First caller: computes and publishes
    Leader(FlightGuard<'a>),
    /// Later caller: waits for the leader
    Follower(watch::Receiver<Payload>),
}

impl SingleFlight {
    pub(crate) fn join(&self, key: &str) -> Flight<'_> {
        let mut inflight = self.lock();

        if let Some(rx) = inflight.get(key) {
            return Flight::Follower(rx.clone());
        }

        let (tx, rx) = watch::channel(None);
        inflight.insert(key.to_string(), rx);

        Flight::Leader(FlightGuard {
            owner: self,
            key: key.to_string(),
            tx,
        })
    }

    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, watch::Receiver<Payload>>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Waits for the leader's payload. None if the leader failed or was cancelled.
pub(crate) async fn wait_for_leader(mut rx: watch::Receiver<Payload>) -> Option<Arc<str>> {
    match rx.wait_for(Option::is_some).await {
        Ok(payload) => (*payload).clone(),
        Err(_) => None,
    }
}

/// Held by the leader. Dropping it (completed, failed or cancelled)
/// unregisters the key and releases waiting followers.
pub(crate) struct FlightGuard<'a> {
    owner: &'a SingleFlight,
    key: String,
    tx: watch::Sender<Payload>,
}

impl FlightGuard<'_> {
    pub(crate) fn complete(self, payload: Arc<str>) {
        self.tx.send_replace(Some(payload));
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_caller_leads() {
        let flights = SingleFlight::default();

        let leader = flights.join("k");
        assert!(matches!(leader, Flight::Leader(_)));
        assert!(matches!(flights.join("k"), Flight::Follower(_)));
        assert!(matches!(flights.join("other"), Flight::Leader(_)));
    }

    #[tokio::test]
    async fn test_follower_receives_payload() {
        let flights = SingleFlight::default();

        let Flight::Leader(guard) = flights.join("k") else {
            panic!("expected leader");
        };
        let Flight::Follower(rx) = flights.join("k") else {
            panic!("expected follower");
        };

        guard.complete(Arc::from("\"Guide A\""));

        assert_eq!(wait_for_leader(rx).await.as_deref(), Some("\"Guide A\""));
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_dropped_leader_releases_followers() {
        let flights = SingleFlight::default();

        let leader = flights.join("k");
        let Flight::Follower(rx) = flights.join("k") else {
            panic!("expected follower");
        };

        drop(leader);

        assert!(wait_for_leader(rx).await.is_none());
        assert!(matches!(flights.join("k"), Flight::Leader(_)));
    }
}
