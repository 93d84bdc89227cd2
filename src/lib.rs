//! Armada - a build-configuration-matrix generator and driver
//!
//! This crate provides the core library functionality for Armada: the
//! variant algebra that expands orthogonal build options into concrete
//! configurations, the manifest that declares options and pruning rules,
//! compiler capability probing, and the driver that runs an external
//! generator/build tool pair once per surviving configuration.

pub mod driver;
pub mod manifest;
pub mod matrix;
pub mod probe;
pub mod util;

pub use driver::{Driver, RunOptions, RunReport};
pub use manifest::{find_manifest, Manifest, MANIFEST_NAME};
pub use matrix::{Arg, ArgMatrix, MatrixError, MissingAssignment, Value, Variant, VariantSet};
pub use probe::{probe_compilers, CompilerCapability, CompilerKind};
