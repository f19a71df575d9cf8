//! Scaling strategies
//!
//! Each strategy writes `{min, max}` through one mechanism. The selector maps
//! a classified [`Mechanism`] to the strategy that owns it.

mod annotation;
mod native;

pub use annotation::AnnotationOperatorScaler;
pub use native::NativeAutoscalerScaler;

use crate::accessor::ResourceAccessor;
use crate::error::{Result, ScalerError};
use crate::target::{Mechanism, ScaleBounds, ScaleTarget};
use std::sync::Arc;
use std::time::Duration;

/// Common trait for all scaling strategies
#[async_trait::async_trait]
pub trait Scaler: Send + Sync {
    /// Apply the target's bounds. Applying the same bounds twice is a no-op
    /// the second time.
    async fn scale(&self, target: &ScaleTarget) -> Result<()>;

    /// Read the bounds currently in effect for `name`.
    async fn current_bounds(&self, name: &str) -> Result<ScaleBounds>;

    /// The mechanism this strategy writes through
    fn mechanism(&self) -> Mechanism;
}

/// Maps mechanisms to strategy instances
#[derive(Clone)]
pub struct ScalerSelector {
    native: Arc<dyn Scaler>,
    annotation: Arc<dyn Scaler>,
}

impl ScalerSelector {
    /// Build both strategies over one accessor.
    pub fn new(accessor: Arc<dyn ResourceAccessor>, timeout: Duration) -> Self {
        Self {
            native: Arc::new(NativeAutoscalerScaler::new(accessor.clone(), timeout)),
            annotation: Arc::new(AnnotationOperatorScaler::new(accessor, timeout)),
        }
    }

    /// Strategy for `mechanism`. An unclassified target reaching this point is
    /// a bug in the caller.
    pub fn select(&self, mechanism: Mechanism) -> Result<Arc<dyn Scaler>> {
        match mechanism {
            Mechanism::NativeAutoscaler => Ok(self.native.clone()),
            Mechanism::AnnotationOperator => Ok(self.annotation.clone()),
            Mechanism::Unclassified => Err(ScalerError::InvalidMechanism(
                "target was not classified before scaling".to_string(),
            )),
        }
    }
}
