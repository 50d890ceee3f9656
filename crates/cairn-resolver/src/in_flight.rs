//! Per-run registry of addresses currently being fetched.
//!
//! The first caller to claim a key becomes its leader and fetches and stores
//! the artifact. Anyone claiming the same key before the leader is done gets
//! a follower handle and waits for the leader to release the claim, then
//! re-checks the store instead of fetching again.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

pub(crate) struct InFlight {
  claims: Mutex<HashMap<String, watch::Receiver<()>>>,
}

pub(crate) enum Claim<'a> {
  Leader(FetchGuard<'a>),
  Follower(watch::Receiver<()>),
}

/// Held by the leader while it fetches and stores; dropping it releases the
/// claim and wakes every follower.
pub(crate) struct FetchGuard<'a> {
  in_flight: &'a InFlight,
  key: String,
  _done: watch::Sender<()>,
}

impl InFlight {
  pub(crate) fn new() -> Self {
    Self {
      claims: Mutex::new(HashMap::new()),
    }
  }

  pub(crate) fn claim(&self, key: &str) -> Claim<'_> {
    let mut claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(done) = claims.get(key) {
      return Claim::Follower(done.clone());
    }

    let (tx, rx) = watch::channel(());
    claims.insert(key.to_string(), rx);
    Claim::Leader(FetchGuard {
      in_flight: self,
      key: key.to_string(),
      _done: tx,
    })
  }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize {
    self
      .claims
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }
}

impl Drop for FetchGuard<'_> {
  fn drop(&mut self) {
    self
      .in_flight
      .claims
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(&self.key);
  }
}

/// Wait until the leader holding the claim has released it.
pub(crate) async fn released(mut done: watch::Receiver<()>) {
  // Nothing is ever sent, so this only returns once the sender is dropped.
  let _ = done.changed().await;
}
