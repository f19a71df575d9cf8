//! Scale targets and batch reports
//!
//! A batch is a map of workload name to the replica bounds the caller wants.
//! Each entry becomes a [`ScaleTarget`] for the duration of one pass and ends
//! up as an [`ItemOutcome`] in the [`BatchReport`].

use crate::error::ScalerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Desired or observed replica bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleBounds {
    pub min: i32,
    pub max: i32,
}

impl ScaleBounds {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Checks `0 <= min <= max`.
    pub fn validate(&self) -> Result<(), ScalerError> {
        if self.min < 0 {
            return Err(ScalerError::InvalidBounds(format!(
                "min {} is negative",
                self.min
            )));
        }
        if self.max < self.min {
            return Err(ScalerError::InvalidBounds(format!(
                "max {} is below min {}",
                self.max, self.min
            )));
        }
        Ok(())
    }
}

/// One caller request: workload name to desired bounds
pub type ScaleBatch = BTreeMap<String, ScaleBounds>;

/// Which mechanism controls a workload's replica bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mechanism {
    /// Not inspected yet
    #[default]
    Unclassified,
    /// A HorizontalPodAutoscaler object named after the workload
    NativeAutoscaler,
    /// The HPA operator, driven by annotations on the Deployment
    AnnotationOperator,
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mechanism::Unclassified => write!(f, "unclassified"),
            Mechanism::NativeAutoscaler => write!(f, "native-autoscaler"),
            Mechanism::AnnotationOperator => write!(f, "annotation-operator"),
        }
    }
}

/// A workload to scale within a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleTarget {
    pub name: String,
    pub min: i32,
    pub max: i32,
    pub mechanism: Mechanism,
}

impl ScaleTarget {
    pub fn new(name: impl Into<String>, bounds: ScaleBounds) -> Self {
        Self {
            name: name.into(),
            min: bounds.min,
            max: bounds.max,
            mechanism: Mechanism::Unclassified,
        }
    }
}

/// What happened to a single target
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ItemOutcome {
    /// Bounds were written through the given mechanism
    Scaled {
        mechanism: Mechanism,
        min: i32,
        max: i32,
    },
    /// The target never reached the write step
    Skipped { reason: ScalerError },
    /// The write step ran and failed
    Failed {
        mechanism: Mechanism,
        error: ScalerError,
    },
}

impl ItemOutcome {
    pub fn is_scaled(&self) -> bool {
        matches!(self, ItemOutcome::Scaled { .. })
    }
}

/// Aggregated result of one batch pass
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Per-target outcomes, keyed by workload name
    pub outcomes: BTreeMap<String, ItemOutcome>,

    /// Set only when the batch stopped early
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<ScalerError>,

    /// Whether the caller cancelled the batch
    pub cancelled: bool,

    /// RFC 3339 start timestamp
    pub started_at: String,

    /// RFC 3339 finish timestamp
    pub finished_at: String,
}

impl BatchReport {
    pub(crate) fn start() -> Self {
        Self {
            outcomes: BTreeMap::new(),
            fatal: None,
            cancelled: false,
            started_at: chrono::Utc::now().to_rfc3339(),
            finished_at: String::new(),
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = chrono::Utc::now().to_rfc3339();
        self
    }

    pub fn scaled(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_scaled())
            .map(|(name, _)| name.as_str())
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, &ScalerError)> {
        self.outcomes.iter().filter_map(|(name, o)| match o {
            ItemOutcome::Skipped { reason } => Some((name.as_str(), reason)),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &ScalerError)> {
        self.outcomes.iter().filter_map(|(name, o)| match o {
            ItemOutcome::Failed { error, .. } => Some((name.as_str(), error)),
            _ => None,
        })
    }
}
