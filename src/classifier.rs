//! Decides which mechanism controls a workload's replica bounds

use crate::accessor::ResourceAccessor;
use crate::annotations::has_bound_annotations;
use crate::error::Result;
use crate::target::{Mechanism, ScaleTarget};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Inspects live Deployments to classify scale targets
#[derive(Clone)]
pub struct Classifier {
    accessor: Arc<dyn ResourceAccessor>,
    timeout: Duration,
}

impl Classifier {
    pub fn new(accessor: Arc<dyn ResourceAccessor>, timeout: Duration) -> Self {
        Self { accessor, timeout }
    }

    /// Set `target.mechanism` from the Deployment's annotations.
    ///
    /// Both bound annotations present means the HPA operator owns the bounds;
    /// anything else falls back to a native autoscaler. On a fetch error the
    /// target stays [`Mechanism::Unclassified`] and the error is returned as is.
    pub async fn classify(&self, target: &mut ScaleTarget) -> Result<()> {
        let workload = self.accessor.get_workload(&target.name, self.timeout).await?;

        target.mechanism = if has_bound_annotations(workload.metadata.annotations.as_ref()) {
            Mechanism::AnnotationOperator
        } else {
            Mechanism::NativeAutoscaler
        };

        debug!(workload = %target.name, mechanism = %target.mechanism, "Classified target");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::fake::{deployment, FakeAccessor};
    use crate::annotations::{MAX_REPLICAS_ANNOTATION, MIN_REPLICAS_ANNOTATION};
    use crate::error::ScalerError;
    use crate::target::ScaleBounds;
    use std::collections::BTreeMap;

    fn classifier(fake: FakeAccessor) -> Classifier {
        Classifier::new(Arc::new(fake), Duration::from_millis(500))
    }

    fn target(name: &str) -> ScaleTarget {
        ScaleTarget::new(name, ScaleBounds::new(3, 5))
    }

    #[tokio::test]
    async fn test_both_annotations_select_operator() {
        let classifier = classifier(FakeAccessor::new().with_annotated("svc-a", "1", "3"));
        let mut t = target("svc-a");

        classifier.classify(&mut t).await.unwrap();
        assert_eq!(t.mechanism, Mechanism::AnnotationOperator);
    }

    #[tokio::test]
    async fn test_no_annotations_select_native() {
        let classifier = classifier(FakeAccessor::new().with_native("svc-b", 1, 3));
        let mut t = target("svc-b");

        classifier.classify(&mut t).await.unwrap();
        assert_eq!(t.mechanism, Mechanism::NativeAutoscaler);
    }

    #[tokio::test]
    async fn test_single_annotation_selects_native() {
        for key in [MAX_REPLICAS_ANNOTATION, MIN_REPLICAS_ANNOTATION] {
            let mut annotations = BTreeMap::new();
            annotations.insert(key.to_string(), "4".to_string());
            annotations.insert("unrelated".to_string(), "x".to_string());
            let classifier = classifier(
                FakeAccessor::new().with_workload(deployment("svc-c", Some(annotations))),
            );
            let mut t = target("svc-c");

            classifier.classify(&mut t).await.unwrap();
            assert_eq!(t.mechanism, Mechanism::NativeAutoscaler, "only {} set", key);
        }
    }

    #[tokio::test]
    async fn test_missing_workload_stays_unclassified() {
        let classifier = classifier(FakeAccessor::new());
        let mut t = target("svc-missing");

        let err = classifier.classify(&mut t).await.unwrap_err();
        assert!(matches!(err, ScalerError::NotFound(_)));
        assert_eq!(t.mechanism, Mechanism::Unclassified);
    }

    #[tokio::test]
    async fn test_access_error_propagates_unchanged() {
        let denied = ScalerError::AccessDenied("forbidden".into());
        let classifier = classifier(
            FakeAccessor::new()
                .with_annotated("svc-a", "1", "3")
                .with_get_error("svc-a", denied.clone()),
        );
        let mut t = target("svc-a");

        assert_eq!(classifier.classify(&mut t).await, Err(denied));
        assert_eq!(t.mechanism, Mechanism::Unclassified);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_times_out() {
        let classifier = classifier(
            FakeAccessor::new()
                .with_native("svc-slow", 1, 3)
                .with_latency("svc-slow", Duration::from_secs(2)),
        );
        let mut t = target("svc-slow");

        let err = classifier.classify(&mut t).await.unwrap_err();
        assert!(matches!(err, ScalerError::Timeout { .. }));
        assert_eq!(t.mechanism, Mechanism::Unclassified);
    }
}
