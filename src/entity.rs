//! Entity capabilities the engine relies on.
//!
//! Datasets, samples and components come from the calling pipeline. The engine
//! only uses them as map keys and asks a dataset what type it is.

use std::fmt;
use std::hash::Hash;

/// Anything flags can be keyed by.
pub trait Entity: Clone + Eq + Hash + fmt::Debug {
    /// Display name, used when exporting flags.
    fn name(&self) -> &str;
}

/// A dataset that declares its type, so a protocol can refuse datasets it was
/// not written for.
pub trait DatasetEntity: Entity {
    fn dataset_type(&self) -> &str;
}
