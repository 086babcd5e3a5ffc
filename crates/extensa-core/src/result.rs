//! Convenience result type alias for Extensa.

use crate::error::AppError;

/// A specialized `Result` type for Extensa operations.
pub type AppResult<T> = Result<T, AppError>;
