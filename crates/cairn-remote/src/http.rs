use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use cairn_config::{Address, ArtifactKind, RootPair};

use crate::error::RemoteError;
use crate::remote::Remote;

/// Catalog listing body.
#[derive(Debug, Deserialize)]
struct PairList {
  data: Vec<RootPair>,
}

/// HTTP catalog client.
///
/// Artifacts are served at:
/// ```text
/// GET {base}/functions/{owner}/{repository}/{commit}
/// GET {base}/functions/profiles/{owner}/{repository}/{commit}
/// GET {base}/functions/profiles/pairs
/// ```
pub struct HttpRemote {
  client: Client,
  base_url: String,
  api_key: Option<String>,
}

impl HttpRemote {
  /// Create a client for the catalog at `base_url`.
  pub fn new(base_url: impl Into<String>) -> Self {
    Self::with_client(Client::new(), base_url)
  }

  /// Create a client reusing an existing `reqwest` client.
  pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
    let base_url = base_url.into().trim_end_matches('/').to_string();
    Self {
      client,
      base_url,
      api_key: None,
    }
  }

  /// Send `api_key` as a bearer token with every request.
  pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
    self.api_key = Some(api_key.into());
    self
  }

  /// Append `segments` to the base URL, percent-encoding each one.
  fn endpoint<'s>(
    &self,
    segments: impl IntoIterator<Item = &'s str>,
  ) -> Result<Url, RemoteError> {
    let mut url = Url::parse(&self.base_url)?;
    url
      .path_segments_mut()
      .map_err(|()| RemoteError::InvalidBaseUrl {
        url: self.base_url.clone(),
      })?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  fn artifact_url(&self, kind: ArtifactKind, address: &Address) -> Result<Url, RemoteError> {
    let prefix: &[&str] = match kind {
      ArtifactKind::Function => &["functions"],
      ArtifactKind::Profile => &["functions", "profiles"],
    };
    let components = [
      address.owner.as_str(),
      address.repository.as_str(),
      address.commit.as_str(),
    ];
    self.endpoint(prefix.iter().copied().chain(components))
  }

  async fn get(&self, url: Url) -> Result<Response, RemoteError> {
    let url_string = url.to_string();
    let mut request = self.client.get(url);
    if let Some(api_key) = &self.api_key {
      request = request.bearer_auth(api_key);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
      return Err(RemoteError::Status {
        url: url_string,
        status: status.as_u16(),
      });
    }

    Ok(response)
  }
}

#[async_trait]
impl Remote for HttpRemote {
  async fn fetch(&self, kind: ArtifactKind, address: &Address) -> Result<Bytes, RemoteError> {
    let url = self.artifact_url(kind, address)?;
    debug!(%url, "fetching artifact");
    let response = self.get(url).await?;
    Ok(response.bytes().await?)
  }

  async fn list_pairs(&self) -> Result<Vec<RootPair>, RemoteError> {
    let url = self.endpoint(["functions", "profiles", "pairs"])?;
    let body = self.get(url).await?.bytes().await?;
    let list: PairList = serde_json::from_slice(&body)?;
    Ok(list.data)
  }
}
