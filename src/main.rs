//! setting-admission - validating admission webhook for Setting resources.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Loads configuration and creates the Kubernetes client
//! - Starts the health server and the TLS webhook server

use std::sync::Arc;
use std::time::Duration;

use kube::Client;
use tokio::signal;
use tracing::{error, info};

use setting_admission::client::SubjectAccessReviewer;
use setting_admission::health::{HealthState, run_health_server};
use setting_admission::{Config, SettingAdmission, run_webhook_server};

/// Grace period for in-flight admission requests to complete during shutdown
const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("setting_admission=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .json()
        .init();

    info!("Starting setting-admission");

    // kube and axum-server both pull in rustls; pin one provider for the process
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        info!("rustls crypto provider already installed");
    }

    let config = Config::from_env()?;
    info!(
        webhook_port = config.webhook_port,
        health_port = config.health_port,
        access_review_timeout_secs = config.access_review_timeout.as_secs(),
        slow_threshold_ms = u64::try_from(config.slow_threshold.as_millis()).unwrap_or(u64::MAX),
        read_only = ?config.read_only.iter().collect::<Vec<_>>(),
        "Loaded configuration"
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let health_state = Arc::new(HealthState::new());

    // Probes should answer before the webhook is serving
    let health_handle = {
        let health_state = health_state.clone();
        let port = config.health_port;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, port).await {
                error!("Health server error: {}", e);
            }
        })
    };

    let reviewer = SubjectAccessReviewer::new(client).with_timeout(config.access_review_timeout);
    let admission = SettingAdmission::new(Arc::new(reviewer))
        .with_read_only(config.read_only.clone())
        .with_slow_threshold(config.slow_threshold);

    let webhook_handle = {
        let config = config.clone();
        tokio::spawn(async move {
            run_webhook_server(
                admission,
                config.webhook_port,
                &config.cert_path,
                &config.key_path,
            )
            .await
        })
    };
    health_state.set_ready(true).await;

    tokio::select! {
        result = webhook_handle => {
            match result {
                Ok(Ok(())) => info!("Webhook server exited"),
                Ok(Err(e)) => error!("Webhook server error: {}", e),
                Err(e) => error!("Webhook server task panicked: {}", e),
            }
        }
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");

            // Stop receiving new admission requests
            health_state.set_ready(false).await;
            info!("Marked webhook as not ready");

            info!(
                "Waiting {}s for in-flight admission requests to complete...",
                SHUTDOWN_GRACE_PERIOD_SECS
            );
            tokio::time::sleep(Duration::from_secs(SHUTDOWN_GRACE_PERIOD_SECS)).await;

            info!("Grace period complete, shutting down");
        }
    }

    info!("setting-admission stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal - the webhook cannot shut down
/// gracefully without them. Using expect() here is intentional.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
