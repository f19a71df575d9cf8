//! Pod Scaler service
//!
//! ## Usage
//!
//! ```bash
//! # Serve on the default address (requires in-cluster config or kubeconfig)
//! pod-scaler
//!
//! # All workloads in one namespace, delay only between writes
//! RUST_LOG=debug pod-scaler --namespace workloads --delay-mode between
//! ```

use clap::Parser;
use kube::Client;
use pod_scaler::http::build_router;
use pod_scaler::{BatchOrchestrator, DelayMode, KubeAccessor, ScalerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Pod Scaler
#[derive(Parser, Debug)]
#[command(name = "pod-scaler")]
#[command(version, about = "Batch updater for HPA replica bounds")]
struct Args {
    /// HTTP bind address
    #[arg(long, default_value = "0.0.0.0:8090")]
    bind_address: String,

    /// Namespace holding every workload (empty: namespace named after each workload)
    #[arg(long, default_value = "")]
    namespace: String,

    /// Deadline for each Kubernetes API call, in milliseconds
    #[arg(long, default_value_t = 500)]
    request_timeout_ms: u64,

    /// Where the inter-update delay applies
    #[arg(long, value_enum, default_value_t = DelayMode::AfterEach)]
    delay_mode: DelayMode,

    /// Reject negative or inverted bounds instead of passing them through
    #[arg(long, default_value = "false")]
    strict_bounds: bool,
}

impl Args {
    fn scaler_config(&self) -> ScalerConfig {
        ScalerConfig {
            request_timeout_ms: self.request_timeout_ms,
            delay_mode: self.delay_mode,
            strict_bounds: self.strict_bounds,
            namespace: (!self.namespace.is_empty()).then(|| self.namespace.clone()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let args = Args::parse();
    let config = args.scaler_config();

    info!("Starting Pod Scaler");
    info!(
        "Workload namespace: {}",
        config.namespace.as_deref().unwrap_or("per workload")
    );
    info!(
        "Request timeout: {:?}, delay mode: {:?}, strict bounds: {}",
        config.request_timeout(),
        config.delay_mode,
        config.strict_bounds
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");

    let accessor = Arc::new(KubeAccessor::new(client, config.namespace.clone()));
    let orchestrator = Arc::new(BatchOrchestrator::new(accessor, config));

    let listener = tokio::net::TcpListener::bind(&args.bind_address).await?;
    info!("Listening on {}", args.bind_address);

    axum::serve(listener, build_router(orchestrator))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Pod Scaler shutting down");
    Ok(())
}
