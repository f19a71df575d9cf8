//! Annotation keys read by the Banzai Cloud HPA operator
//!
//! A Deployment carrying both keys has its autoscaler managed by the operator,
//! which derives the HPA bounds from these annotations. Renaming them breaks
//! the contract with the operator.

use std::collections::BTreeMap;

pub const ANNOTATION_PREFIX: &str = "hpa.autoscaling.banzaicloud.io";

pub const MAX_REPLICAS_ANNOTATION: &str = "hpa.autoscaling.banzaicloud.io/maxReplicas";
pub const MIN_REPLICAS_ANNOTATION: &str = "hpa.autoscaling.banzaicloud.io/minReplicas";

/// True when both bound annotations are present, regardless of their values.
pub fn has_bound_annotations(annotations: Option<&BTreeMap<String, String>>) -> bool {
    annotations.is_some_and(|a| {
        a.contains_key(MAX_REPLICAS_ANNOTATION) && a.contains_key(MIN_REPLICAS_ANNOTATION)
    })
}
