//! In-memory remote catalog and JSON builders shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Value, json};

use cairn_artifact::{FsStore, Store};
use cairn_config::{Address, ArtifactKind, RootPair};
use cairn_remote::{Remote, RemoteError};

pub(crate) struct MockRemote {
  artifacts: HashMap<(ArtifactKind, Address), Value>,
  pairs: Vec<RootPair>,
  failing: HashSet<Address>,
  yields: usize,
  fetches: Mutex<Vec<(ArtifactKind, Address)>>,
}

impl MockRemote {
  pub(crate) fn new() -> Self {
    Self {
      artifacts: HashMap::new(),
      pairs: Vec::new(),
      failing: HashSet::new(),
      yields: 0,
      fetches: Mutex::new(Vec::new()),
    }
  }

  pub(crate) fn with_function(mut self, address: &Address, document: Value) -> Self {
    self
      .artifacts
      .insert((ArtifactKind::Function, address.clone()), document);
    self
  }

  pub(crate) fn with_profile(mut self, address: &Address, document: Value) -> Self {
    self
      .artifacts
      .insert((ArtifactKind::Profile, address.clone()), document);
    self
  }

  pub(crate) fn with_pair(mut self, function: &Address, profile: &Address) -> Self {
    self.pairs.push(RootPair {
      function: function.clone(),
      profile: profile.clone(),
    });
    self
  }

  /// Every fetch of `address` fails with a server error.
  pub(crate) fn failing(mut self, address: &Address) -> Self {
    self.failing.insert(address.clone());
    self
  }

  /// Yield to the scheduler this many times inside every fetch.
  pub(crate) fn yielding(mut self, yields: usize) -> Self {
    self.yields = yields;
    self
  }

  pub(crate) fn fetch_count(&self, kind: ArtifactKind, address: &Address) -> usize {
    self
      .fetches
      .lock()
      .unwrap()
      .iter()
      .filter(|(k, a)| *k == kind && a == address)
      .count()
  }

  pub(crate) fn total_fetches(&self) -> usize {
    self.fetches.lock().unwrap().len()
  }
}

#[async_trait]
impl Remote for MockRemote {
  async fn fetch(&self, kind: ArtifactKind, address: &Address) -> Result<Bytes, RemoteError> {
    self.fetches.lock().unwrap().push((kind, address.clone()));
    for _ in 0..self.yields {
      tokio::task::yield_now().await;
    }

    let url = format!("mock://{}/{}", kind.dir_name(), address);
    if self.failing.contains(address) {
      return Err(RemoteError::Status { url, status: 503 });
    }
    match self.artifacts.get(&(kind, address.clone())) {
      Some(document) => Ok(Bytes::from(serde_json::to_vec(document).unwrap())),
      None => Err(RemoteError::Status { url, status: 404 }),
    }
  }

  async fn list_pairs(&self) -> Result<Vec<RootPair>, RemoteError> {
    Ok(self.pairs.clone())
  }
}

pub(crate) fn addr(repository: &str) -> Address {
  Address::new("acme", repository, "c0ffee")
}

/// A function with one completion task followed by one scalar call per
/// reference.
pub(crate) fn function(references: &[&Address]) -> Value {
  let calls = references
    .iter()
    .map(|address| call("scalar.function", address))
    .collect();
  function_with(calls)
}

/// A function with one completion task followed by `calls`.
pub(crate) fn function_with(calls: Vec<Value>) -> Value {
  let mut tasks = vec![json!({
    "type": "vector.completion",
    "messages": [{ "role": "user", "content": "Rate this." }],
    "responses": ["good", "bad"]
  })];
  tasks.extend(calls);
  json!({
    "type": "vector.function",
    "description": "Test function.",
    "tasks": tasks
  })
}

/// A task calling the function at `address`.
pub(crate) fn call(task_type: &str, address: &Address) -> Value {
  json!({
    "type": task_type,
    "owner": address.owner,
    "repository": address.repository,
    "commit": address.commit,
    "input": { "$jmespath": "input" }
  })
}

pub(crate) fn profile(tasks: Vec<Value>) -> Value {
  json!({ "description": "Test profile.", "tasks": tasks })
}

pub(crate) fn remote_task(address: &Address) -> Value {
  json!({
    "owner": address.owner,
    "repository": address.repository,
    "commit": address.commit
  })
}

pub(crate) fn vector_task() -> Value {
  json!({
    "ensemble": { "llms": [{ "model": "openai/gpt-4o-mini" }] },
    "profile": [1.0]
  })
}

pub(crate) async fn stored(store: &FsStore, kind: ArtifactKind, address: &Address) -> bool {
  store.exists(&kind.store_key(address)).await.unwrap()
}
