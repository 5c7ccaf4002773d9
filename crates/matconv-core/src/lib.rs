//! Core types and utilities for matconv.
//!
//! This crate provides the foundational types used across all other matconv crates:
//! - Parameter values, colors and texture references
//! - Texture placement parameters and the decomposed 2D transform
//! - Material definition type tags and domains
//! - The `PropertyReadable` capability trait
//! - Diagnostics and error types

pub mod diagnostics;
pub mod errors;
pub mod math;
pub mod placement;
pub mod property;
pub mod types;
pub mod value;

pub use diagnostics::*;
pub use errors::*;
pub use math::*;
pub use placement::*;
pub use property::*;
pub use types::*;
pub use value::*;
