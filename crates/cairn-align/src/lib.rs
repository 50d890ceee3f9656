//! Cairn Align
//!
//! Profile weights are authored in whatever order the author listed the
//! backends of each ensemble. Canonicalization may reorder those backends,
//! so before a profile is published every weight has to follow its backend
//! to the new position.
//!
//! Backends are tracked through reordering by their identity key (see
//! [`identity_key`]). The [`Aligner`] walks a profile's task tree, builds a
//! key → weight map for every inline ensemble, canonicalizes the ensemble
//! through a [`Canonicalizer`] and re-emits the weights in canonical order.
//!
//! Alignment is pure: no I/O and no shared state, so any number of profiles
//! can be aligned in parallel.

mod aligner;
mod canonical;
mod error;
mod key;

pub use aligner::Aligner;
pub use canonical::{Canonicalizer, DigestCanonicalizer};
pub use error::{AlignError, CanonicalizeError};
pub use key::identity_key;
