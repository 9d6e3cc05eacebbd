//! Entity resolution: raw names/codes from any dataset -> `CanonicalEntity`.
//!
//! - `table`: the immutable lookup data (entities, aliases, codes, overrides)
//! - `resolver`: the ordered matching rules and the miss log

pub mod resolver;
pub mod table;

pub use resolver::*;
pub use table::*;
