//! Recipe-driven parameter mapping.
//!
//! Evaluates a conversion recipe against any material implementing
//! [`PropertyReadable`](matconv_core::PropertyReadable) and produces the
//! ordered target parameter values.

mod resolver;

pub use resolver::{resolve, ResolvedMapping, MAX_CASE_DEPTH};
