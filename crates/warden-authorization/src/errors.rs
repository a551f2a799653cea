//! Authorization error handling
//!
//! Uses the unified [`WardenError`] from warden-core so callers see one error
//! type regardless of which layer failed.

pub use warden_core::{DenialReason, WardenError, WardenResult};
