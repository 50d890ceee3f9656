use futures::{StreamExt, stream};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{Instrument, info, info_span};

use cairn_artifact::{Store, byte_stream};
use cairn_config::RootPair;
use cairn_remote::Remote;

use crate::error::ResolveError;
use crate::resolver::{Resolver, StandardResolver};
use crate::sample::sample;

/// Number of root pairs an acquisition run selects by default.
pub const DEFAULT_LIMIT: usize = 10;

/// Store key of the manifest listing the root pairs of the last run.
pub const MANIFEST_KEY: &str = "manifest.json";

/// Settings for one acquisition run.
#[derive(Debug, Clone)]
pub struct Acquisition {
  /// Maximum number of root pairs to select.
  pub limit: usize,
  /// Seed for the selection. A fresh random seed is used when unset.
  pub seed: Option<u64>,
  /// Number of root pairs resolved at the same time.
  pub concurrency: usize,
}

impl Default for Acquisition {
  fn default() -> Self {
    Self {
      limit: DEFAULT_LIMIT,
      seed: None,
      concurrency: 1,
    }
  }
}

/// Outcome of a successful acquisition run.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionReport {
  /// Size of the catalog listing.
  pub catalog: usize,
  /// Selected root pairs, as written to the manifest.
  pub selected: Vec<RootPair>,
  /// Artifacts fetched during this run.
  pub fetched: usize,
}

impl Acquisition {
  /// List the catalog, select up to `limit` root pairs, resolve each pair's
  /// function and profile into the resolver's store and write the manifest.
  ///
  /// The first failure aborts the run. Artifacts stored before it stay in
  /// the store.
  pub async fn run<S: Store, R: Remote>(
    &self,
    resolver: &StandardResolver<S, R>,
  ) -> Result<AcquisitionReport, ResolveError> {
    let catalog = resolver
      .remote()
      .list_pairs()
      .await
      .map_err(ResolveError::Catalog)?;
    let catalog_size = catalog.len();

    let mut rng = match self.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_os_rng(),
    };
    let selected = sample(catalog, self.limit, &mut rng);
    info!(
      catalog = catalog_size,
      selected = selected.len(),
      "selected root pairs"
    );

    let fetched_before = resolver.fetched();
    let mut results = stream::iter(&selected)
      .map(|pair| resolve_pair(resolver, pair))
      .buffer_unordered(self.concurrency.max(1));
    while let Some(result) = results.next().await {
      result?;
    }
    drop(results);

    let manifest = serde_json::to_vec_pretty(&selected)?;
    resolver
      .store()
      .put(MANIFEST_KEY, byte_stream(manifest.into()))
      .await?;

    let fetched = resolver.fetched() - fetched_before;
    info!(fetched, "acquisition complete");

    Ok(AcquisitionReport {
      catalog: catalog_size,
      selected,
      fetched,
    })
  }
}

async fn resolve_pair<Res: Resolver>(resolver: &Res, pair: &RootPair) -> Result<(), ResolveError> {
  let span = info_span!("root_pair", function = %pair.function, profile = %pair.profile);
  async {
    resolver.resolve_function(&pair.function).await?;
    resolver.resolve_profile(&pair.profile).await
  }
  .instrument(span)
  .await
}
