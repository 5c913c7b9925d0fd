use crate::config::Config;
use crate::detector::Detector;
use crate::server::HttpServer;
use crate::telemetry::Metrics;

use detection_client::BackendClient;
use std::sync::Arc;
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> anyhow::Result<()> {
    let backend = match BackendClient::new(&config.inference.backend_settings()) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to initialize inference client: {:?}", e);
            return Err(e.into());
        }
    };

    tracing::info!(
        inference_url = backend.inference_url(),
        model_path = backend.model_path(),
        "Inference backend configured"
    );

    let detector = Detector::new(Arc::new(backend));

    // Serving starts regardless of the outcome.
    if let Err(e) = detector.check_health().await {
        tracing::warn!("Warning: ML service not available: {}", e);
    }

    let metrics = Arc::new(Metrics::new()?);
    let server = HttpServer::new(detector, metrics, &config.server).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_shutdown_rx = shutdown_tx.subscribe();

    let server_handle = server.run(server_shutdown_rx).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    server_handle.await??;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
