//! Error types for my-ora.

use thiserror::Error;

use crate::driver::{Capability, DriverError};

/// The main error type for my-ora operations.
#[derive(Debug, Error)]
pub enum ShimError {
    /// The wrapped driver lacks an optional execution mode. Callers fall
    /// back to prepare + execute.
    #[error("Unsupported by the underlying driver: {0}")]
    Unsupported(Capability),

    /// No driver registered under this name.
    #[error("Unknown driver: '{0}'")]
    UnknownDriver(String),

    /// A driver is already registered under this name.
    #[error("Driver already registered: '{0}'")]
    DuplicateDriver(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error raised by the underlying driver, passed through as is.
    #[error(transparent)]
    Driver(DriverError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShimError {
    /// The underlying driver's error, if this is one.
    pub fn driver_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Driver(err) => Some(&**err),
            _ => None,
        }
    }
}

/// Result type alias for my-ora operations.
pub type ShimResult<T> = Result<T, ShimError>;

/// Is this driver-level error the "capability not supported" signal?
pub fn is_unsupported(err: &DriverError) -> bool {
    matches!(
        err.downcast_ref::<ShimError>(),
        Some(ShimError::Unsupported(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("ORA-00942: table or view does not exist")]
    struct OraError;

    #[test]
    fn test_error_display() {
        let err = ShimError::UnknownDriver("oracle".into());
        assert_eq!(err.to_string(), "Unknown driver: 'oracle'");
        let err = ShimError::Unsupported(Capability::Exec);
        assert_eq!(err.to_string(), "Unsupported by the underlying driver: direct exec");
    }

    #[test]
    fn test_driver_error_is_transparent() {
        let err = ShimError::Driver(Box::new(OraError));
        assert_eq!(err.to_string(), "ORA-00942: table or view does not exist");
        assert!(err.driver_error().unwrap().downcast_ref::<OraError>().is_some());
    }

    #[test]
    fn test_is_unsupported() {
        let skip: DriverError = Box::new(ShimError::Unsupported(Capability::Query));
        assert!(is_unsupported(&skip));
        let other: DriverError = Box::new(OraError);
        assert!(!is_unsupported(&other));
    }
}
