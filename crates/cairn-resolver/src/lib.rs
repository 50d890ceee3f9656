//! Cairn Resolver
//!
//! Materializes functions and profiles from a remote catalog into a local
//! [`cairn_artifact::Store`], following every reference until the store holds
//! the full transitive closure of each requested artifact.
//!
//! An [`Acquisition`] run samples root pairs from the catalog listing,
//! resolves each of them and records the selection as a manifest.

mod acquire;
mod error;
mod in_flight;
mod resolver;
mod sample;

#[cfg(test)]
mod testing;

pub use acquire::{Acquisition, AcquisitionReport, DEFAULT_LIMIT, MANIFEST_KEY};
pub use error::ResolveError;
pub use resolver::{Resolver, StandardResolver};
pub use sample::sample;
