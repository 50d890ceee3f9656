use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{Instrument, debug, info, info_span};

use cairn_artifact::{Store, byte_stream};
use cairn_config::{Address, ArtifactKind, Function, Profile, TaskProfile};
use cairn_remote::Remote;

use crate::error::ResolveError;
use crate::in_flight::{Claim, InFlight, released};

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ResolveError>> + Send + 'a>>;

/// Resolver makes the transitive closure of an artifact present in a store.
#[async_trait]
pub trait Resolver: Send + Sync {
  /// Store the function at `address` and every function it calls,
  /// directly or indirectly.
  async fn resolve_function(&self, address: &Address) -> Result<(), ResolveError>;

  /// Store the profile at `address` and every remote profile reachable from
  /// its task tree.
  async fn resolve_profile(&self, address: &Address) -> Result<(), ResolveError>;
}

/// Standard resolver that fetches from a remote catalog into a store.
///
/// Artifacts already in the store are never fetched again, and their
/// references are not revisited. This is what terminates reference cycles.
/// Concurrent resolutions of the same address through one resolver share a
/// single fetch, so use one resolver per acquisition run.
pub struct StandardResolver<S: Store, R: Remote> {
  store: S,
  remote: R,
  in_flight: InFlight,
  fetched: AtomicUsize,
}

impl<S: Store, R: Remote> StandardResolver<S, R> {
  pub fn new(store: S, remote: R) -> Self {
    Self {
      store,
      remote,
      in_flight: InFlight::new(),
      fetched: AtomicUsize::new(0),
    }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn remote(&self) -> &R {
    &self.remote
  }

  /// Number of artifacts this resolver has fetched and stored.
  pub fn fetched(&self) -> usize {
    self.fetched.load(Ordering::Relaxed)
  }

  /// Make sure the artifact of `kind` at `address` is stored.
  ///
  /// Returns the artifact bytes when this call fetched them, or `None` when
  /// the artifact was already present or stored by a concurrent call.
  async fn materialize(
    &self,
    kind: ArtifactKind,
    address: &Address,
  ) -> Result<Option<Bytes>, ResolveError> {
    address
      .validate()
      .map_err(|source| ResolveError::from_shape(kind, address, source))?;
    let key = kind.store_key(address);
    if self.store.exists(&key).await? {
      debug!(%key, "already stored");
      return Ok(None);
    }

    match self.in_flight.claim(&key) {
      Claim::Follower(done) => {
        debug!(%key, "waiting on concurrent fetch");
        released(done).await;
        if self.store.exists(&key).await? {
          Ok(None)
        } else {
          Err(ResolveError::Abandoned {
            kind,
            address: address.clone(),
          })
        }
      }
      Claim::Leader(_guard) => {
        // A previous leader may have finished between the check and the claim.
        if self.store.exists(&key).await? {
          return Ok(None);
        }

        info!(%kind, %address, "fetching");
        let bytes = self
          .remote
          .fetch(kind, address)
          .await
          .map_err(|source| ResolveError::Fetch {
            kind,
            address: address.clone(),
            source,
          })?;
        self.store.put(&key, byte_stream(bytes.clone())).await?;
        self.fetched.fetch_add(1, Ordering::Relaxed);
        debug!(%key, size = bytes.len(), "stored");
        Ok(Some(bytes))
      }
    }
  }

  fn walk_function<'a>(&'a self, address: &'a Address) -> ResolveFuture<'a> {
    let span = info_span!("resolve_function", %address);
    Box::pin(
      async move {
        let kind = ArtifactKind::Function;
        let Some(bytes) = self.materialize(kind, address).await? else {
          return Ok(());
        };
        let function = Function::from_slice(&bytes)
          .map_err(|source| ResolveError::from_shape(kind, address, source))?;

        for reference in function.references() {
          self.walk_function(reference).await?;
        }
        Ok(())
      }
      .instrument(span),
    )
  }

  fn walk_profile<'a>(&'a self, address: &'a Address) -> ResolveFuture<'a> {
    let span = info_span!("resolve_profile", %address);
    Box::pin(
      async move {
        let kind = ArtifactKind::Profile;
        let Some(bytes) = self.materialize(kind, address).await? else {
          return Ok(());
        };
        let profile = Profile::from_slice(&bytes)
          .map_err(|source| ResolveError::from_shape(kind, address, source))?;

        self.walk_task_profiles(&profile.tasks).await
      }
      .instrument(span),
    )
  }

  fn walk_task_profiles<'a>(&'a self, tasks: &'a [TaskProfile]) -> ResolveFuture<'a> {
    Box::pin(async move {
      for task in tasks {
        match task {
          TaskProfile::Inline { tasks } => self.walk_task_profiles(tasks).await?,
          TaskProfile::Remote(address) => self.walk_profile(address).await?,
          TaskProfile::Vector(_) => {}
        }
      }
      Ok(())
    })
  }
}

#[async_trait]
impl<S: Store, R: Remote> Resolver for StandardResolver<S, R> {
  async fn resolve_function(&self, address: &Address) -> Result<(), ResolveError> {
    self.walk_function(address).await
  }

  async fn resolve_profile(&self, address: &Address) -> Result<(), ResolveError> {
    self.walk_profile(address).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{
    MockRemote, addr, call, function, function_with, profile, remote_task, stored, vector_task,
  };
  use cairn_artifact::FsStore;
  use cairn_config::ShapeError;
  use serde_json::json;
  use tempfile::TempDir;

  fn resolver(dir: &TempDir, remote: MockRemote) -> StandardResolver<FsStore, MockRemote> {
    StandardResolver::new(FsStore::new(dir.path()), remote)
  }

  #[tokio::test]
  async fn test_resolve_function_tree() {
    let (root, a, b) = (addr("root"), addr("a"), addr("b"));
    let remote = MockRemote::new()
      .with_function(&root, function(&[&a, &b]))
      .with_function(&a, function(&[&b]))
      .with_function(&b, function(&[]));
    let dir = TempDir::new().unwrap();
    let resolver = resolver(&dir, remote);

    resolver.resolve_function(&root).await.unwrap();

    for address in [&root, &a, &b] {
      assert!(stored(resolver.store(), ArtifactKind::Function, address).await);
      assert_eq!(
        resolver.remote().fetch_count(ArtifactKind::Function, address),
        1
      );
    }
    assert_eq!(resolver.fetched(), 3);
  }

  #[tokio::test]
  async fn test_resolve_follows_both_function_call_types() {
    let (root, scalar) = (addr("root"), addr("scalar"));
    let (vector, leaf) = (addr("vector"), addr("leaf"));
    let remote = MockRemote::new()
      .with_function(
        &root,
        function_with(vec![
          call("scalar.function", &scalar),
          call("vector.function", &vector),
        ]),
      )
      .with_function(&scalar, function(&[]))
      .with_function(&vector, function_with(vec![call("vector.function", &leaf)]))
      .with_function(&leaf, function(&[]));
    let dir = TempDir::new().unwrap();
    let resolver = resolver(&dir, remote);

    resolver.resolve_function(&root).await.unwrap();

    for address in [&root, &scalar, &vector, &leaf] {
      assert!(stored(resolver.store(), ArtifactKind::Function, address).await);
    }
    assert_eq!(resolver.remote().total_fetches(), 4);
  }

  #[tokio::test]
  async fn test_stored_artifact_is_not_fetched_again() {
    let root = addr("root");
    let remote = MockRemote::new().with_function(&root, function(&[]));
    let dir = TempDir::new().unwrap();
    let resolver = resolver(&dir, remote);

    resolver.resolve_function(&root).await.unwrap();
    resolver.resolve_function(&root).await.unwrap();

    assert_eq!(resolver.remote().total_fetches(), 1);
  }

  #[tokio::test]
  async fn test_function_cycle_terminates() {
    let (a, b) = (addr("a"), addr("b"));
    let remote = MockRemote::new()
      .with_function(&a, function(&[&b]))
      .with_function(&b, function(&[&a]));
    let dir = TempDir::new().unwrap();
    let resolver = resolver(&dir, remote);

    resolver.resolve_function(&a).await.unwrap();

    assert_eq!(resolver.remote().fetch_count(ArtifactKind::Function, &a), 1);
    assert_eq!(resolver.remote().fetch_count(ArtifactKind::Function, &b), 1);
  }

  #[tokio::test]
  async fn test_profile_cycle_terminates() {
    let (a, b) = (addr("a"), addr("b"));
    let remote = MockRemote::new()
      .with_profile(&a, profile(vec![remote_task(&b)]))
      .with_profile(&b, profile(vec![json!({ "tasks": [remote_task(&a)] })]));
    let dir = TempDir::new().unwrap();
    let resolver = resolver(&dir, remote);

    resolver.resolve_profile(&a).await.unwrap();

    assert!(stored(resolver.store(), ArtifactKind::Profile, &b).await);
    assert_eq!(resolver.remote().total_fetches(), 2);
  }

  #[tokio::test]
  async fn test_profile_references_inside_inline_tasks() {
    let (root, nested, deeper) = (addr("root"), addr("nested"), addr("deeper"));
    let remote = MockRemote::new()
      .with_profile(
        &root,
        profile(vec![
          vector_task(),
          json!({ "tasks": [vector_task(), { "tasks": [remote_task(&nested)] }] }),
        ]),
      )
      .with_profile(&nested, profile(vec![remote_task(&deeper)]))
      .with_profile(&deeper, profile(vec![vector_task()]));
    let dir = TempDir::new().unwrap();
    let resolver = resolver(&dir, remote);

    resolver.resolve_profile(&root).await.unwrap();

    for address in [&root, &nested, &deeper] {
      assert!(stored(resolver.store(), ArtifactKind::Profile, address).await);
    }
  }

  #[tokio::test]
  async fn test_fetch_failure_keeps_earlier_artifacts() {
    let (root, good, bad) = (addr("root"), addr("good"), addr("bad"));
    let remote = MockRemote::new()
      .with_function(&root, function(&[&good, &bad]))
      .with_function(&good, function(&[]))
      .failing(&bad);
    let dir = TempDir::new().unwrap();
    let resolver = resolver(&dir, remote);

    let err = resolver.resolve_function(&root).await.unwrap_err();
    match err {
      ResolveError::Fetch { kind, address, .. } => {
        assert_eq!(kind, ArtifactKind::Function);
        assert_eq!(address, bad);
      }
      other => panic!("expected fetch error, got {:?}", other),
    }

    assert!(stored(resolver.store(), ArtifactKind::Function, &root).await);
    assert!(stored(resolver.store(), ArtifactKind::Function, &good).await);
    assert!(!stored(resolver.store(), ArtifactKind::Function, &bad).await);
  }

  #[tokio::test]
  async fn test_malformed_reference() {
    let root = addr("root");
    let remote = MockRemote::new().with_function(
      &root,
      json!({
        "type": "scalar.function",
        "tasks": [{ "type": "scalar.function", "owner": "acme", "repository": "a" }]
      }),
    );
    let dir = TempDir::new().unwrap();
    let resolver = resolver(&dir, remote);

    let err = resolver.resolve_function(&root).await.unwrap_err();
    match err {
      ResolveError::Reference { address, source, .. } => {
        assert_eq!(address, root);
        assert!(matches!(
          source,
          ShapeError::MissingAddressField {
            field: "commit",
            ..
          }
        ));
      }
      other => panic!("expected reference error, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_addresses_that_would_share_a_key_are_rejected() {
    let split_owner = Address::new("x/y", "z", "c");
    let split_repository = Address::new("x", "y/z", "c");
    let empty_owner = Address::new("", "x", "y/z/c");
    let remote = MockRemote::new()
      .with_function(&split_owner, function(&[]))
      .with_function(&split_repository, function(&[]))
      .with_function(&empty_owner, function(&[]));
    let dir = TempDir::new().unwrap();
    let resolver = resolver(&dir, remote);

    for address in [&split_owner, &split_repository, &empty_owner] {
      let err = resolver.resolve_function(address).await.unwrap_err();
      assert!(
        matches!(
          &err,
          ResolveError::Reference {
            source: ShapeError::InvalidAddressComponent { .. },
            ..
          }
        ),
        "{} should be rejected, got {:?}",
        address,
        err
      );
    }
    assert_eq!(resolver.remote().total_fetches(), 0);
  }

  #[tokio::test]
  async fn test_reference_with_separator_in_component() {
    let root = addr("root");
    let remote = MockRemote::new().with_function(
      &root,
      json!({
        "type": "scalar.function",
        "tasks": [{
          "type": "vector.function",
          "owner": "acme",
          "repository": "a/b",
          "commit": "c"
        }]
      }),
    );
    let dir = TempDir::new().unwrap();
    let resolver = resolver(&dir, remote);

    let err = resolver.resolve_function(&root).await.unwrap_err();
    match err {
      ResolveError::Reference { address, source, .. } => {
        assert_eq!(address, root);
        assert!(matches!(
          source,
          ShapeError::InvalidAddressComponent {
            field: "repository",
            ..
          }
        ));
      }
      other => panic!("expected reference error, got {:?}", other),
    }
    assert_eq!(resolver.remote().total_fetches(), 1);
  }

  #[tokio::test]
  async fn test_unrecognized_profile_shape() {
    let root = addr("root");
    let remote =
      MockRemote::new().with_profile(&root, profile(vec![json!({ "weights": [1.0] })]));
    let dir = TempDir::new().unwrap();
    let resolver = resolver(&dir, remote);

    let err = resolver.resolve_profile(&root).await.unwrap_err();
    assert!(matches!(err, ResolveError::Structural { .. }));
  }

  #[tokio::test]
  async fn test_concurrent_resolutions_share_fetch() {
    let (root, shared) = (addr("root"), addr("shared"));
    let remote = MockRemote::new()
      .with_function(&root, function(&[&shared]))
      .with_function(&shared, function(&[]))
      .yielding(5);
    let dir = TempDir::new().unwrap();
    let resolver = resolver(&dir, remote);

    let (first, second) = tokio::join!(
      resolver.resolve_function(&root),
      resolver.resolve_function(&root)
    );
    first.unwrap();
    second.unwrap();

    assert_eq!(resolver.remote().fetch_count(ArtifactKind::Function, &root), 1);
    assert_eq!(
      resolver.remote().fetch_count(ArtifactKind::Function, &shared),
      1
    );
    assert_eq!(resolver.in_flight.len(), 0);
  }

  #[tokio::test]
  async fn test_stored_bytes_match_remote() {
    let root = addr("root");
    let document = function(&[]);
    let remote = MockRemote::new().with_function(&root, document.clone());
    let dir = TempDir::new().unwrap();
    let resolver = resolver(&dir, remote);

    resolver.resolve_function(&root).await.unwrap();

    let path = dir
      .path()
      .join(ArtifactKind::Function.store_key(&root));
    let bytes = std::fs::read(path).unwrap();
    assert_eq!(bytes, serde_json::to_vec(&document).unwrap());
  }
}
