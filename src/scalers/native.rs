//! Bounds written to a HorizontalPodAutoscaler spec

use super::Scaler;
use crate::accessor::ResourceAccessor;
use crate::error::{Result, ScalerError};
use crate::target::{Mechanism, ScaleBounds, ScaleTarget};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Kubernetes default for an unset `spec.minReplicas`
const DEFAULT_MIN_REPLICAS: i32 = 1;

/// Rewrites `minReplicas`/`maxReplicas` on the HPA named after the workload
pub struct NativeAutoscalerScaler {
    accessor: Arc<dyn ResourceAccessor>,
    timeout: Duration,
}

impl NativeAutoscalerScaler {
    pub fn new(accessor: Arc<dyn ResourceAccessor>, timeout: Duration) -> Self {
        Self { accessor, timeout }
    }
}

#[async_trait::async_trait]
impl Scaler for NativeAutoscalerScaler {
    async fn scale(&self, target: &ScaleTarget) -> Result<()> {
        let mut hpa = self
            .accessor
            .get_autoscaler(&target.name, self.timeout)
            .await?;

        let spec = hpa.spec.as_mut().ok_or_else(|| {
            ScalerError::Other(format!(
                "horizontalpodautoscaler {} has no spec",
                target.name
            ))
        })?;
        spec.min_replicas = Some(target.min);
        spec.max_replicas = target.max;

        self.accessor
            .update_autoscaler(&target.name, &hpa, self.timeout)
            .await?;

        info!(
            workload = %target.name,
            min = target.min,
            max = target.max,
            "Updated HorizontalPodAutoscaler bounds",
        );
        Ok(())
    }

    async fn current_bounds(&self, name: &str) -> Result<ScaleBounds> {
        let hpa = self.accessor.get_autoscaler(name, self.timeout).await?;
        let spec = hpa.spec.ok_or_else(|| {
            ScalerError::Other(format!("horizontalpodautoscaler {} has no spec", name))
        })?;

        Ok(ScaleBounds::new(
            spec.min_replicas.unwrap_or(DEFAULT_MIN_REPLICAS),
            spec.max_replicas,
        ))
    }

    fn mechanism(&self) -> Mechanism {
        Mechanism::NativeAutoscaler
    }
}
