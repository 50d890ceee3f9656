use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cairn_align::{Aligner, DigestCanonicalizer};
use cairn_artifact::FsStore;
use cairn_config::Function;
use cairn_remote::HttpRemote;
use cairn_resolver::{Acquisition, DEFAULT_LIMIT, MANIFEST_KEY, StandardResolver};

/// Cairn - build and acquire composable function and profile artifacts
#[derive(Parser)]
#[command(name = "cairn")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.cairn)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Validate a function and align its profile, ready for publishing
  Build {
    /// Path to the function definition (JSON)
    #[arg(long)]
    function: PathBuf,

    /// Path to the profile definition (JSON)
    #[arg(long)]
    profile: PathBuf,

    /// Directory to write function.json and profile.json to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
  },

  /// Download a random sample of root pairs and everything they reference
  Acquire {
    /// Base URL of the remote catalog
    #[arg(long, env = "CAIRN_API_BASE", default_value = "http://localhost:5000")]
    api_base: String,

    /// API key sent as a bearer token
    #[arg(long, env = "CAIRN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Maximum number of root pairs to select
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,

    /// Seed for the selection, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Number of root pairs resolved at the same time
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Store directory (default: <data-dir>/store)
    #[arg(long)]
    store_dir: Option<PathBuf>,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Build {
      function,
      profile,
      out_dir,
    }) => {
      build(function, profile, out_dir)?;
    }
    Some(Commands::Acquire {
      api_base,
      api_key,
      limit,
      seed,
      concurrency,
      store_dir,
    }) => {
      let mut remote = HttpRemote::new(api_base);
      if let Some(api_key) = api_key {
        remote = remote.with_api_key(api_key);
      }
      let acquisition = Acquisition {
        limit,
        seed,
        concurrency,
      };
      let store_dir = resolve_store_dir(cli.data_dir, store_dir)?;
      acquire(remote, acquisition, store_dir)?;
    }
    None => {
      println!("cairn - use --help to see available commands");
    }
  }

  Ok(())
}

/// Pick the store directory: `--store-dir`, else `{data-dir}/store`, where the
/// data directory defaults to `~/.cairn`.
fn resolve_store_dir(data_dir: Option<PathBuf>, store_dir: Option<PathBuf>) -> Result<PathBuf> {
  if let Some(store_dir) = store_dir {
    return Ok(store_dir);
  }
  let data_dir = match data_dir {
    Some(data_dir) => data_dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".cairn"),
  };
  Ok(data_dir.join("store"))
}

fn build(function_file: PathBuf, profile_file: PathBuf, out_dir: PathBuf) -> Result<()> {
  let function = std::fs::read(&function_file)
    .with_context(|| format!("failed to read function file: {}", function_file.display()))?;
  let profile = std::fs::read(&profile_file)
    .with_context(|| format!("failed to read profile file: {}", profile_file.display()))?;

  let (function, profile) = build_artifacts(&function, &profile)?;

  std::fs::create_dir_all(&out_dir)
    .with_context(|| format!("failed to create output directory: {}", out_dir.display()))?;
  for (name, bytes) in [("function.json", function), ("profile.json", profile)] {
    let path = out_dir.join(name);
    std::fs::write(&path, bytes)
      .with_context(|| format!("failed to write {}", path.display()))?;
    eprintln!("Wrote {}", path.display());
  }

  Ok(())
}

/// Validate a function and align its profile, returning both pretty-printed.
fn build_artifacts(function: &[u8], profile: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
  let function = Function::from_slice(function).context("invalid function definition")?;
  let profile = Aligner::new(DigestCanonicalizer::new())
    .align_slice(profile)
    .context("failed to align profile")?;

  Ok((
    serde_json::to_vec_pretty(&function)?,
    serde_json::to_vec_pretty(&profile)?,
  ))
}

fn acquire(remote: HttpRemote, acquisition: Acquisition, store_dir: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { acquire_async(remote, acquisition, store_dir).await })
}

async fn acquire_async(
  remote: HttpRemote,
  acquisition: Acquisition,
  store_dir: PathBuf,
) -> Result<()> {
  let resolver = StandardResolver::new(FsStore::new(&store_dir), remote);

  let report = acquisition
    .run(&resolver)
    .await
    .context("acquisition failed")?;

  eprintln!(
    "Selected {} of {} root pairs",
    report.selected.len(),
    report.catalog
  );
  eprintln!("Fetched {} artifacts", report.fetched);
  eprintln!("Manifest: {}", store_dir.join(MANIFEST_KEY).display());

  Ok(())
}
