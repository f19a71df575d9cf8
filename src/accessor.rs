//! Timeout-bounded access to Deployments and HorizontalPodAutoscalers
//!
//! Every call is individually bounded and every failure is classified into
//! [`ScalerError`] here, so callers only decide policy.

use crate::error::{Result, ScalerError};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use kube::api::{Api, PostParams};
use kube::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Read and write operations against the two resource kinds the scaler touches
#[async_trait::async_trait]
pub trait ResourceAccessor: Send + Sync {
    async fn get_workload(&self, name: &str, timeout: Duration) -> Result<Deployment>;

    async fn get_autoscaler(&self, name: &str, timeout: Duration)
        -> Result<HorizontalPodAutoscaler>;

    async fn update_workload(
        &self,
        name: &str,
        workload: &Deployment,
        timeout: Duration,
    ) -> Result<()>;

    async fn update_autoscaler(
        &self,
        name: &str,
        autoscaler: &HorizontalPodAutoscaler,
        timeout: Duration,
    ) -> Result<()>;
}

/// Runs `fut` under `timeout`, mapping elapsed deadlines and API failures.
pub async fn with_timeout<T, F>(operation: String, timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, kube::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(ScalerError::from),
        Err(_) => Err(ScalerError::Timeout {
            operation,
            after: timeout,
        }),
    }
}

/// Namespace holding `name`: the fixed one if configured, else `name` itself.
fn resolve_namespace<'a>(fixed: Option<&'a str>, name: &'a str) -> &'a str {
    fixed.unwrap_or(name)
}

/// [`ResourceAccessor`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeAccessor {
    client: Client,
    namespace: Option<String>,
}

impl KubeAccessor {
    /// Create an accessor. Without a fixed namespace each workload is looked
    /// up in the namespace named after it.
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self { client, namespace }
    }

    fn namespace_for<'a>(&'a self, name: &'a str) -> &'a str {
        resolve_namespace(self.namespace.as_deref(), name)
    }

    fn api<K>(&self, name: &str) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), self.namespace_for(name))
    }

    async fn get<K>(&self, kind: &str, name: &str, timeout: Duration) -> Result<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Debug,
        <K as kube::Resource>::DynamicType: Default,
    {
        let api: Api<K> = self.api(name);
        debug!(kind, workload = %name, namespace = %self.namespace_for(name), "Fetching");
        with_timeout(format!("get {} {}", kind, name), timeout, api.get(name)).await
    }

    async fn replace<K>(&self, kind: &str, name: &str, obj: &K, timeout: Duration) -> Result<()>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Serialize
            + Debug,
        <K as kube::Resource>::DynamicType: Default,
    {
        let api: Api<K> = self.api(name);
        debug!(kind, workload = %name, namespace = %self.namespace_for(name), "Replacing");
        with_timeout(
            format!("update {} {}", kind, name),
            timeout,
            api.replace(name, &PostParams::default(), obj),
        )
        .await
        .map(|_| ())
    }
}

#[async_trait::async_trait]
impl ResourceAccessor for KubeAccessor {
    async fn get_workload(&self, name: &str, timeout: Duration) -> Result<Deployment> {
        self.get("deployment", name, timeout).await
    }

    async fn get_autoscaler(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<HorizontalPodAutoscaler> {
        self.get("horizontalpodautoscaler", name, timeout).await
    }

    async fn update_workload(
        &self,
        name: &str,
        workload: &Deployment,
        timeout: Duration,
    ) -> Result<()> {
        self.replace("deployment", name, workload, timeout).await
    }

    async fn update_autoscaler(
        &self,
        name: &str,
        autoscaler: &HorizontalPodAutoscaler,
        timeout: Duration,
    ) -> Result<()> {
        self.replace("horizontalpodautoscaler", name, autoscaler, timeout)
            .await
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory accessor for unit tests.

    use super::*;
    use crate::annotations::{MAX_REPLICAS_ANNOTATION, MIN_REPLICAS_ANNOTATION};
    use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscalerSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    #[derive(Default)]
    struct State {
        workloads: HashMap<String, Deployment>,
        autoscalers: HashMap<String, HorizontalPodAutoscaler>,
        get_errors: HashMap<String, ScalerError>,
        update_errors: HashMap<String, ScalerError>,
        latencies: HashMap<String, Duration>,
        writes: Vec<String>,
        workload_gets: usize,
    }

    /// Accessor over in-memory maps with injectable errors and latencies.
    #[derive(Default)]
    pub struct FakeAccessor {
        state: Mutex<State>,
    }

    impl FakeAccessor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Workload without bound annotations, plus a matching HPA.
        pub fn with_native(self, name: &str, min: i32, max: i32) -> Self {
            {
                let mut state = self.state.lock().unwrap();
                state.workloads.insert(name.to_string(), deployment(name, None));
                state
                    .autoscalers
                    .insert(name.to_string(), autoscaler(name, Some(min), max));
            }
            self
        }

        /// Workload carrying both bound annotations.
        pub fn with_annotated(self, name: &str, min: &str, max: &str) -> Self {
            let mut annotations = BTreeMap::new();
            annotations.insert(MIN_REPLICAS_ANNOTATION.to_string(), min.to_string());
            annotations.insert(MAX_REPLICAS_ANNOTATION.to_string(), max.to_string());
            self.with_workload(deployment(name, Some(annotations)))
        }

        pub fn with_workload(self, workload: Deployment) -> Self {
            let name = workload.metadata.name.clone().unwrap_or_default();
            self.state.lock().unwrap().workloads.insert(name, workload);
            self
        }

        pub fn with_autoscaler(self, autoscaler: HorizontalPodAutoscaler) -> Self {
            let name = autoscaler.metadata.name.clone().unwrap_or_default();
            self.state
                .lock()
                .unwrap()
                .autoscalers
                .insert(name, autoscaler);
            self
        }

        /// Every get for `name` fails with `err`.
        pub fn with_get_error(self, name: &str, err: ScalerError) -> Self {
            self.state
                .lock()
                .unwrap()
                .get_errors
                .insert(name.to_string(), err);
            self
        }

        /// Every update for `name` fails with `err`.
        pub fn with_update_error(self, name: &str, err: ScalerError) -> Self {
            self.state
                .lock()
                .unwrap()
                .update_errors
                .insert(name.to_string(), err);
            self
        }

        /// Every get for `name` sleeps for `latency` first.
        pub fn with_latency(self, name: &str, latency: Duration) -> Self {
            self.state
                .lock()
                .unwrap()
                .latencies
                .insert(name.to_string(), latency);
            self
        }

        pub fn workload(&self, name: &str) -> Option<Deployment> {
            self.state.lock().unwrap().workloads.get(name).cloned()
        }

        pub fn autoscaler(&self, name: &str) -> Option<HorizontalPodAutoscaler> {
            self.state.lock().unwrap().autoscalers.get(name).cloned()
        }

        pub fn annotation(&self, name: &str, key: &str) -> Option<String> {
            self.workload(name)
                .and_then(|d| d.metadata.annotations)
                .and_then(|a| a.get(key).cloned())
        }

        pub fn remove_annotation(&self, name: &str, key: &str) {
            let mut state = self.state.lock().unwrap();
            if let Some(annotations) = state
                .workloads
                .get_mut(name)
                .and_then(|d| d.metadata.annotations.as_mut())
            {
                annotations.remove(key);
            }
        }

        /// Names written so far, in write order.
        pub fn writes(&self) -> Vec<String> {
            self.state.lock().unwrap().writes.clone()
        }

        pub fn workload_gets(&self) -> usize {
            self.state.lock().unwrap().workload_gets
        }

        async fn before_get(&self, name: &str, timeout: Duration) -> Result<()> {
            let (err, latency) = {
                let state = self.state.lock().unwrap();
                (
                    state.get_errors.get(name).cloned(),
                    state.latencies.get(name).copied(),
                )
            };
            if let Some(latency) = latency {
                if latency > timeout {
                    tokio::time::sleep(timeout).await;
                    return Err(ScalerError::Timeout {
                        operation: format!("get {}", name),
                        after: timeout,
                    });
                }
                tokio::time::sleep(latency).await;
            }
            match err {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        fn before_update(&self, name: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            if let Some(err) = state.update_errors.get(name) {
                return Err(err.clone());
            }
            state.writes.push(name.to_string());
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl ResourceAccessor for FakeAccessor {
        async fn get_workload(&self, name: &str, timeout: Duration) -> Result<Deployment> {
            self.state.lock().unwrap().workload_gets += 1;
            self.before_get(name, timeout).await?;
            self.workload(name)
                .ok_or_else(|| ScalerError::NotFound(format!("deployment {}", name)))
        }

        async fn get_autoscaler(
            &self,
            name: &str,
            timeout: Duration,
        ) -> Result<HorizontalPodAutoscaler> {
            self.before_get(name, timeout).await?;
            self.autoscaler(name)
                .ok_or_else(|| ScalerError::NotFound(format!("horizontalpodautoscaler {}", name)))
        }

        async fn update_workload(
            &self,
            name: &str,
            workload: &Deployment,
            _timeout: Duration,
        ) -> Result<()> {
            if self.workload(name).is_none() {
                return Err(ScalerError::NotFound(format!("deployment {}", name)));
            }
            self.before_update(name)?;
            self.state
                .lock()
                .unwrap()
                .workloads
                .insert(name.to_string(), workload.clone());
            Ok(())
        }

        async fn update_autoscaler(
            &self,
            name: &str,
            autoscaler: &HorizontalPodAutoscaler,
            _timeout: Duration,
        ) -> Result<()> {
            if self.autoscaler(name).is_none() {
                return Err(ScalerError::NotFound(format!(
                    "horizontalpodautoscaler {}",
                    name
                )));
            }
            self.before_update(name)?;
            self.state
                .lock()
                .unwrap()
                .autoscalers
                .insert(name.to_string(), autoscaler.clone());
            Ok(())
        }
    }

    pub fn deployment(name: &str, annotations: Option<BTreeMap<String, String>>) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(name.to_string()),
                annotations,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn autoscaler(name: &str, min: Option<i32>, max: i32) -> HorizontalPodAutoscaler {
        HorizontalPodAutoscaler {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(name.to_string()),
                ..Default::default()
            },
            spec: Some(HorizontalPodAutoscalerSpec {
                min_replicas: min,
                max_replicas: max,
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
