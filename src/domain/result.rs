//! Result type alias for Pipehat
//!
//! This module provides a convenient Result type alias that uses PipehatError
//! as the error type.

use super::errors::PipehatError;

/// Result type alias for Pipehat operations
///
/// # Examples
///
/// ```
/// use pipehat::domain::result::Result;
/// use pipehat::domain::errors::PipehatError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(PipehatError::Configuration("missing registry".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, PipehatError>;
