//! Utility and helper functions needed for:
//! - Fixed-point and basis-point arithmetic
//! - Error handling
//! - Type casting between the engine's and the persisted representations

pub(crate) mod common;
pub(crate) mod error;
