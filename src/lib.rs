//! Canonical-form engine for tree-shaped data.
//!
//! [`Canonicalizer::admit`] maps any two deeply-equal trees (recursively
//! equal children, key order ignored, type tags compared by identity) to one
//! shared `Rc<Value>` representative, so downstream consumers can replace
//! deep-equality checks with O(1) pointer identity checks. Representatives
//! are built once, shared by reference among all callers, and must be
//! treated as read-only.
//!
//! The engine is single-threaded and `Rc`-based. Inputs must be tree-shaped:
//! cyclic graphs recurse without bound. Under the default weak retention a
//! representative with no remaining external references becomes collectible;
//! [`Retention::Strong`] pins everything admitted for the engine's lifetime.
#![deny(missing_docs)]

/// The admission engine: `admit`, `pass`, retention policy and stats.
pub mod canonicalizer;
/// Bridge between canonical values and `serde_json` trees.
pub mod convert;
/// Content digests for canonical values.
pub mod digest;
/// Type tags: identity tokens standing in for prototype distinctions.
pub mod tag;
/// Validation errors for canonical primitives.
pub mod validation;
/// Shared value model for canonical trees.
pub mod value;

mod pool;
mod registry;
mod signature;

pub use canonicalizer::{
    pass, weak_collections_available, Canonicalizer, CanonicalizerStats, Input, Retention,
};
pub use convert::{from_json, to_json, ConvertError};
pub use digest::{digest_value, Digest, DigestAlg, DigestError};
pub use tag::{TagName, TypeTag};
pub use validation::ValidationError;
pub use value::{deep_equal, ObjectValue, Opaque, Value};
