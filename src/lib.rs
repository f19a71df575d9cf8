//! Pod Scaler
//!
//! Batch updater for the replica bounds of Kubernetes workloads.
//!
//! A caller submits workload name → `{min, max}`. Each workload is classified
//! by its Deployment annotations: workloads managed by the Banzai Cloud HPA
//! operator get their bound annotations rewritten, everything else gets its
//! HorizontalPodAutoscaler spec rewritten.
//!
//! ## Example
//!
//! ```json
//! POST /scaleConfigs
//! sleep: 500ms
//!
//! {
//!   "checkout": {"min": 3, "max": 10},
//!   "payments": {"min": 2, "max": 4}
//! }
//! ```

pub mod accessor;
pub mod annotations;
pub mod classifier;
pub mod config;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod scalers;
pub mod target;

pub use accessor::{KubeAccessor, ResourceAccessor};
pub use classifier::Classifier;
pub use config::{DelayMode, ScalerConfig};
pub use error::{Result, ScalerError};
pub use orchestrator::BatchOrchestrator;
pub use scalers::{AnnotationOperatorScaler, NativeAutoscalerScaler, Scaler, ScalerSelector};
pub use target::{BatchReport, ItemOutcome, Mechanism, ScaleBatch, ScaleBounds, ScaleTarget};
