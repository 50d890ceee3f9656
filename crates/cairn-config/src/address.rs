use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ShapeError;

/// Content address of a published artifact.
///
/// The same triple always denotes the same immutable artifact. Each component
/// is a single path segment (see [`Address::validate`]), so distinct
/// addresses never share a store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "AddressParts")]
pub struct Address {
  pub owner: String,
  pub repository: String,
  pub commit: String,
}

pub(crate) const ADDRESS_FIELDS: [&str; 3] = ["owner", "repository", "commit"];

#[derive(Deserialize)]
struct AddressParts {
  owner: String,
  repository: String,
  commit: String,
}

impl TryFrom<AddressParts> for Address {
  type Error = ShapeError;

  fn try_from(parts: AddressParts) -> Result<Self, Self::Error> {
    let address = Address::new(parts.owner, parts.repository, parts.commit);
    address.validate()?;
    Ok(address)
  }
}

impl Address {
  pub fn new(
    owner: impl Into<String>,
    repository: impl Into<String>,
    commit: impl Into<String>,
  ) -> Self {
    Self {
      owner: owner.into(),
      repository: repository.into(),
      commit: commit.into(),
    }
  }

  /// Extract the address components from a JSON object.
  ///
  /// Fails with [`ShapeError::MissingAddressField`] naming the first absent
  /// component, [`ShapeError::Unrecognized`] if a component is not a string,
  /// or [`ShapeError::InvalidAddressComponent`] if it is not a usable segment.
  pub(crate) fn from_object(object: &Map<String, Value>) -> Result<Self, ShapeError> {
    let field = |name: &'static str| match object.get(name) {
      Some(Value::String(s)) => Ok(s.clone()),
      Some(_) => Err(ShapeError::unrecognized(object)),
      None => Err(ShapeError::MissingAddressField {
        field: name,
        payload: Value::Object(object.clone()).to_string(),
      }),
    };

    let address = Self {
      owner: field("owner")?,
      repository: field("repository")?,
      commit: field("commit")?,
    };
    address.validate()?;
    Ok(address)
  }

  /// Check that every component is a usable path segment: non-empty, not
  /// `.` or `..`, and free of `/` and `\`.
  pub fn validate(&self) -> Result<(), ShapeError> {
    let components = [
      ("owner", &self.owner),
      ("repository", &self.repository),
      ("commit", &self.commit),
    ];
    for (field, value) in components {
      let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\']);
      if invalid {
        return Err(ShapeError::InvalidAddressComponent {
          field,
          value: value.clone(),
          payload: serde_json::to_string(self).unwrap_or_default(),
        });
      }
    }
    Ok(())
  }
}

impl fmt::Display for Address {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}/{}", self.owner, self.repository, self.commit)
  }
}

/// The two kinds of stored artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
  Function,
  Profile,
}

impl ArtifactKind {
  /// Directory holding every artifact of this kind.
  pub fn dir_name(self) -> &'static str {
    match self {
      ArtifactKind::Function => "functions",
      ArtifactKind::Profile => "profiles",
    }
  }

  /// File name of the serialized artifact inside its address directory.
  pub fn file_name(self) -> &'static str {
    match self {
      ArtifactKind::Function => "function.json",
      ArtifactKind::Profile => "profile.json",
    }
  }

  /// Storage key for the artifact of this kind at `address`.
  ///
  /// Example: `Function` at `acme/repo/abc123`
  /// becomes `functions/acme/repo/abc123/function.json`
  pub fn store_key(self, address: &Address) -> String {
    format!(
      "{}/{}/{}/{}/{}",
      self.dir_name(),
      address.owner,
      address.repository,
      address.commit,
      self.file_name()
    )
  }
}

impl fmt::Display for ArtifactKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ArtifactKind::Function => f.write_str("function"),
      ArtifactKind::Profile => f.write_str("profile"),
    }
  }
}

/// A Function paired with a Profile built for it.
///
/// Catalog listings return these, and an acquisition run records the
/// selected ones as its manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RootPair {
  pub function: Address,
  pub profile: Address,
}
