//! Cairn Config
//!
//! This crate contains the serializable artifact types for Cairn: functions,
//! the profiles that weight them, and the content addresses both are
//! published under.
//!
//! Artifacts are plain JSON. Parsing classifies every node into a typed
//! variant once, so downstream crates (alignment, resolution) dispatch on
//! enums instead of inspecting keys. Fields that only matter to an execution
//! engine are kept as opaque JSON and written back unchanged.

mod address;
mod ensemble;
mod error;
mod function;
mod profile;

pub use address::{Address, ArtifactKind, RootPair};
pub use ensemble::{Backend, BackendConfig, Ensemble, EnsembleSpec, Fallback};
pub use error::ShapeError;
pub use function::{CompletionTask, Function, FunctionTask, Task};
pub use profile::{Profile, TaskProfile, VectorProfile};
