//! ft-core: stable foundation for ferrotherm.
//!
//! Contains:
//! - units (uom SI types + constructors, cycle energy accounting)
//! - numeric (Real + float helpers)
//! - ids (compact thermal-point identifiers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{FtError, FtResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
