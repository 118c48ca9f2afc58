//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output on stderr
//! - Configurable log levels, overridable with `RUST_LOG`
//! - Local JSON file logging with daily or hourly rotation
//!
//! # Example
//!
//! ```no_run
//! use pipehat::logging::init_logging;
//! use pipehat::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(structure = "ADT_A01", "Message parsed");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log an HL7 failure with its code and location
///
/// # Example
///
/// ```no_run
/// use pipehat::log_hl7_error;
/// use pipehat::domain::{ErrorCode, Hl7Error};
///
/// let error = Hl7Error::new("Required segment PID is missing", ErrorCode::RequiredFieldMissing)
///     .with_segment("PID");
/// log_hl7_error!(&error, "messages/adt.hl7");
/// ```
#[macro_export]
macro_rules! log_hl7_error {
    ($error:expr, $source:expr) => {
        tracing::error!(
            code = $error.code().code(),
            segment = $error.segment().unwrap_or_default(),
            field = $error.field().unwrap_or_default(),
            source = %$source,
            "{}",
            $error.message()
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use pipehat::log_error_with_context;
/// use pipehat::domain::PipehatError;
///
/// let error = PipehatError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::{ErrorCode, Hl7Error, PipehatError};

    #[test]
    fn test_macros_expand() {
        let error = Hl7Error::new("bad", ErrorCode::DataTypeError).with_segment("PID");
        log_hl7_error!(&error, "test");
        let error = PipehatError::Configuration("bad".to_string());
        log_error_with_context!(&error, "test");
    }
}
