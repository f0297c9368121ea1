//! Schema data model, loader, and type registry for facegen.
//!
//! ## Architecture
//!
//! - [`feature`]: the raw and canonical feature records
//! - [`loader`]: reads `.iface` text into an ordered list of raw features
//! - [`registry`]: the immutable per-type marshaling template registry
//!
//! The loader's output feeds the schema fixer (`face-fixup`), whose canonical
//! feature table is the single source of truth for every emitter.

pub mod feature;
pub mod loader;
pub mod registry;

pub use feature::{Feature, FeatureKind, ManualOverride, Param, RawFeature, RawKind};
pub use loader::{load, LoadResult, ParseError, ParseErrorKind};
pub use registry::{Direction, Slots, TypeDescriptor, TypeRegistry};
