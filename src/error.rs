//! Error types.
//!
//! Misuse that indicates a bug in the caller (count underflow, parking an
//! entry twice) panics. The only recoverable condition the crate itself
//! reports is touching a null handle through [`Handle::try_get`]; loader
//! failures are returned to the caller of `get` unchanged.
//!
//! [`Handle::try_get`]: crate::Handle::try_get

use thiserror::Error;

/// Returned when a null [`Handle`](crate::Handle) is accessed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[error("dereferenced a null handle")]
pub struct NullHandle;
