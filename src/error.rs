//! Error types for the pod scaler

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Result type alias for scaler operations
pub type Result<T> = std::result::Result<T, ScalerError>;

/// Errors that can occur while classifying or scaling a workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalerError {
    /// The workload or its autoscaler does not exist
    NotFound(String),
    /// Authentication or authorization failure against the API server
    AccessDenied(String),
    /// A cluster call did not finish within its deadline
    Timeout { operation: String, after: Duration },
    /// Any other API or transport failure
    Other(String),
    /// A target reached the scaling step without a usable mechanism
    InvalidMechanism(String),
    /// Bound annotations disappeared between classification and write
    ClassificationMismatch(String),
    /// Requested bounds are negative or inverted
    InvalidBounds(String),
    /// The batch was cancelled by its caller
    Cancelled,
}

impl ScalerError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ScalerError::NotFound(_) => "NotFound",
            ScalerError::AccessDenied(_) => "AccessDenied",
            ScalerError::Timeout { .. } => "Timeout",
            ScalerError::Other(_) => "Other",
            ScalerError::InvalidMechanism(_) => "InvalidMechanism",
            ScalerError::ClassificationMismatch(_) => "ClassificationMismatch",
            ScalerError::InvalidBounds(_) => "InvalidBounds",
            ScalerError::Cancelled => "Cancelled",
        }
    }

    /// Whether this error should abort the whole batch rather than one item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScalerError::AccessDenied(_) | ScalerError::InvalidMechanism(_) | ScalerError::Cancelled
        )
    }
}

impl fmt::Display for ScalerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalerError::NotFound(msg) => write!(f, "Resource not found: {}", msg),
            ScalerError::AccessDenied(msg) => write!(f, "Access denied: {}", msg),
            ScalerError::Timeout { operation, after } => {
                write!(f, "Timed out after {:?}: {}", after, operation)
            }
            ScalerError::Other(msg) => write!(f, "Kubernetes API error: {}", msg),
            ScalerError::InvalidMechanism(msg) => write!(f, "Invalid scaling mechanism: {}", msg),
            ScalerError::ClassificationMismatch(msg) => {
                write!(f, "Classification mismatch: {}", msg)
            }
            ScalerError::InvalidBounds(msg) => write!(f, "Invalid bounds: {}", msg),
            ScalerError::Cancelled => write!(f, "Batch cancelled"),
        }
    }
}

impl std::error::Error for ScalerError {}

impl From<kube::Error> for ScalerError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => ScalerError::NotFound(ae.message),
            kube::Error::Api(ae) if ae.code == 401 || ae.code == 403 => {
                ScalerError::AccessDenied(ae.message)
            }
            other => ScalerError::Other(other.to_string()),
        }
    }
}

impl Serialize for ScalerError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ScalerError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
