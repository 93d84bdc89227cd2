//! The variant algebra: named multi-valued build options, their
//! cross-product expansion into concrete build configurations, and the
//! filters that prune illegal combinations before anything is generated.
//!
//! Everything in this module is pure, synchronous, in-memory bookkeeping;
//! no I/O happens until the [`driver`](crate::driver) consumes a
//! [`VariantSet`].

pub mod arg;
pub mod error;
pub mod registry;
pub mod set;
pub mod value;
pub mod variant;

pub use arg::Arg;
pub use error::{MatrixError, MissingAssignment};
pub use registry::{ArgMatrix, FilterResult};
pub use set::VariantSet;
pub use value::Value;
pub use variant::Variant;
