//! Text canonicalization for entity names.

pub mod normalize;

pub use normalize::*;
