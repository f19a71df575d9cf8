//! Batch orchestrator
//!
//! Classifies every target of a batch concurrently, then writes the bounds of
//! each classified target one at a time, in classification completion order,
//! pausing between writes to bound the write rate against the API server.
//!
//! # Failure policy
//!
//! - `NotFound`, `Timeout` and other per-item errors skip the item.
//! - `AccessDenied` during classification aborts the batch: a bad credential
//!   fails every remaining item the same way.
//! - A failed write is recorded and the batch moves on.
//! - Cancellation stops the batch before its next item.

use crate::accessor::ResourceAccessor;
use crate::classifier::Classifier;
use crate::config::{DelayMode, ScalerConfig};
use crate::error::{Result, ScalerError};
use crate::scalers::ScalerSelector;
use crate::target::{BatchReport, ItemOutcome, ScaleBatch, ScaleBounds, ScaleTarget};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type Classified = (ScaleTarget, Result<()>);

/// Drives classify-and-apply passes over scale batches
pub struct BatchOrchestrator {
    classifier: Classifier,
    selector: ScalerSelector,
    config: ScalerConfig,
}

impl BatchOrchestrator {
    /// Create an orchestrator whose components all share `accessor`.
    pub fn new(accessor: Arc<dyn ResourceAccessor>, config: ScalerConfig) -> Self {
        let timeout = config.request_timeout();
        Self {
            classifier: Classifier::new(accessor.clone(), timeout),
            selector: ScalerSelector::new(accessor, timeout),
            config,
        }
    }

    /// Run one pass over `batch`, sleeping `delay` around writes.
    pub async fn run(&self, batch: ScaleBatch, delay: Duration) -> BatchReport {
        self.run_with_cancel(batch, delay, CancellationToken::new())
            .await
    }

    /// Same as [`run`](Self::run), stopping early once `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        batch: ScaleBatch,
        delay: Duration,
        cancel: CancellationToken,
    ) -> BatchReport {
        let mut report = BatchReport::start();
        info!(
            targets = batch.len(),
            delay = ?delay,
            delay_mode = ?self.config.delay_mode,
            "Starting scale batch",
        );

        let (tx, mut rx) = mpsc::unbounded_channel::<Classified>();
        let mut pending = BTreeSet::new();
        let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(batch.len());

        for (name, bounds) in batch {
            if self.config.strict_bounds {
                if let Err(err) = bounds.validate() {
                    warn!(workload = %name, error = %err, "Skipping target with invalid bounds");
                    report
                        .outcomes
                        .insert(name, ItemOutcome::Skipped { reason: err });
                    continue;
                }
            }

            pending.insert(name.clone());
            let mut target = ScaleTarget::new(name, bounds);
            let classifier = self.classifier.clone();
            let tx = tx.clone();
            workers.push(tokio::spawn(async move {
                let result = classifier.classify(&mut target).await;
                // The receiver is gone once the batch has aborted.
                let _ = tx.send((target, result));
            }));
        }
        drop(tx);

        let mut writes = 0usize;
        while !pending.is_empty() {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    Self::mark_cancelled(&mut report);
                    break;
                }
                received = rx.recv() => received,
            };
            let Some((target, result)) = received else {
                break;
            };
            pending.remove(&target.name);

            match result {
                Ok(()) => {}
                Err(err) if err.is_fatal() => {
                    error!(workload = %target.name, error = %err, "Aborting scale batch");
                    report.fatal = Some(err);
                    break;
                }
                Err(err) => {
                    warn!(workload = %target.name, error = %err, "Skipping target");
                    report
                        .outcomes
                        .insert(target.name, ItemOutcome::Skipped { reason: err });
                    continue;
                }
            }

            if writes > 0
                && self.config.delay_mode == DelayMode::Between
                && !Self::pause(delay, &cancel).await
            {
                Self::mark_cancelled(&mut report);
                break;
            }

            let scaler = match self.selector.select(target.mechanism) {
                Ok(scaler) => scaler,
                Err(err) => {
                    error!(workload = %target.name, error = %err, "Aborting scale batch");
                    report.fatal = Some(err);
                    break;
                }
            };

            let outcome = match scaler.scale(&target).await {
                Ok(()) => ItemOutcome::Scaled {
                    mechanism: target.mechanism,
                    min: target.min,
                    max: target.max,
                },
                Err(err) => {
                    warn!(
                        workload = %target.name,
                        mechanism = %target.mechanism,
                        error = %err,
                        "Failed to apply bounds",
                    );
                    ItemOutcome::Failed {
                        mechanism: target.mechanism,
                        error: err,
                    }
                }
            };
            report.outcomes.insert(target.name, outcome);
            writes += 1;

            if self.config.delay_mode == DelayMode::AfterEach && !Self::pause(delay, &cancel).await
            {
                // With nothing pending the cancel only cuts the final wait short.
                if !pending.is_empty() {
                    Self::mark_cancelled(&mut report);
                }
                break;
            }
        }

        for worker in &workers {
            worker.abort();
        }

        // A worker that died without reporting leaves its target pending.
        if report.fatal.is_none() {
            for name in pending {
                report.outcomes.insert(
                    name,
                    ItemOutcome::Skipped {
                        reason: ScalerError::Other(
                            "classification ended without a result".to_string(),
                        ),
                    },
                );
            }
        }

        let report = report.finish();
        info!(
            scaled = report.scaled().count(),
            skipped = report.skipped().count(),
            failed = report.failed().count(),
            fatal = report.fatal.is_some(),
            "Finished scale batch",
        );
        report
    }

    /// Current bounds of every named workload that exists.
    ///
    /// Workloads that cannot be read are left out; an access error fails the
    /// whole lookup.
    pub async fn inspect<I>(&self, names: I) -> Result<BTreeMap<String, ScaleBounds>>
    where
        I: IntoIterator<Item = String>,
    {
        let lookups = names.into_iter().map(|name| self.lookup(name));
        let results = futures::future::join_all(lookups).await;

        let mut current = BTreeMap::new();
        for (name, result) in results {
            match result {
                Ok(bounds) => {
                    current.insert(name, bounds);
                }
                Err(err) if err.is_fatal() => {
                    error!(workload = %name, error = %err, "Aborting bounds lookup");
                    return Err(err);
                }
                Err(err) => {
                    warn!(workload = %name, error = %err, "Skipping bounds lookup");
                }
            }
        }
        Ok(current)
    }

    async fn lookup(&self, name: String) -> (String, Result<ScaleBounds>) {
        let mut target = ScaleTarget::new(name, ScaleBounds::new(0, 0));
        let result = async {
            self.classifier.classify(&mut target).await?;
            let scaler = self.selector.select(target.mechanism)?;
            scaler.current_bounds(&target.name).await
        }
        .await;
        (target.name, result)
    }

    /// Sleep for `delay`. Returns false if cancelled first.
    async fn pause(delay: Duration, cancel: &CancellationToken) -> bool {
        if delay.is_zero() {
            return !cancel.is_cancelled();
        }
        debug!(delay = ?delay, "Throttling before next write");
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    fn mark_cancelled(report: &mut BatchReport) {
        warn!("Scale batch cancelled");
        report.cancelled = true;
        report.fatal = Some(ScalerError::Cancelled);
    }
}
