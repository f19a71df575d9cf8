//! Bounds written as Deployment annotations for the HPA operator

use super::Scaler;
use crate::accessor::ResourceAccessor;
use crate::annotations::{MAX_REPLICAS_ANNOTATION, MIN_REPLICAS_ANNOTATION};
use crate::error::{Result, ScalerError};
use crate::target::{Mechanism, ScaleBounds, ScaleTarget};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Rewrites the two bound annotations on the workload's Deployment
pub struct AnnotationOperatorScaler {
    accessor: Arc<dyn ResourceAccessor>,
    timeout: Duration,
}

impl AnnotationOperatorScaler {
    pub fn new(accessor: Arc<dyn ResourceAccessor>, timeout: Duration) -> Self {
        Self { accessor, timeout }
    }
}

/// Existing bound annotations only; a Deployment missing either one was
/// reclassified under our feet.
fn bound_annotations<'a>(
    name: &str,
    annotations: Option<&'a mut BTreeMap<String, String>>,
) -> Result<&'a mut BTreeMap<String, String>> {
    match annotations {
        Some(a)
            if a.contains_key(MIN_REPLICAS_ANNOTATION) && a.contains_key(MAX_REPLICAS_ANNOTATION) =>
        {
            Ok(a)
        }
        _ => Err(ScalerError::ClassificationMismatch(format!(
            "deployment {} no longer carries both {} and {}",
            name, MIN_REPLICAS_ANNOTATION, MAX_REPLICAS_ANNOTATION
        ))),
    }
}

fn parse_annotation(name: &str, annotations: &BTreeMap<String, String>, key: &str) -> Result<i32> {
    let raw = annotations.get(key).map(String::as_str).unwrap_or_default();
    raw.trim().parse().map_err(|_| {
        ScalerError::Other(format!(
            "deployment {} has non-numeric {}: {:?}",
            name, key, raw
        ))
    })
}

#[async_trait::async_trait]
impl Scaler for AnnotationOperatorScaler {
    async fn scale(&self, target: &ScaleTarget) -> Result<()> {
        let mut deployment = self.accessor.get_workload(&target.name, self.timeout).await?;

        let annotations =
            bound_annotations(&target.name, deployment.metadata.annotations.as_mut())?;
        annotations.insert(MAX_REPLICAS_ANNOTATION.to_string(), target.max.to_string());
        annotations.insert(MIN_REPLICAS_ANNOTATION.to_string(), target.min.to_string());

        self.accessor
            .update_workload(&target.name, &deployment, self.timeout)
            .await?;

        info!(
            workload = %target.name,
            min = target.min,
            max = target.max,
            "Updated Deployment bound annotations",
        );
        Ok(())
    }

    async fn current_bounds(&self, name: &str) -> Result<ScaleBounds> {
        let mut deployment = self.accessor.get_workload(name, self.timeout).await?;
        let annotations = bound_annotations(name, deployment.metadata.annotations.as_mut())?;

        Ok(ScaleBounds::new(
            parse_annotation(name, annotations, MIN_REPLICAS_ANNOTATION)?,
            parse_annotation(name, annotations, MAX_REPLICAS_ANNOTATION)?,
        ))
    }

    fn mechanism(&self) -> Mechanism {
        Mechanism::AnnotationOperator
    }
}
