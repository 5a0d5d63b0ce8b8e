//! HTTP APIサーバー

pub mod error;
pub mod handlers;
pub mod routes;

pub use error::{error_reply, handle_rejection, json_error, status_for};
pub use routes::routes;

use anyhow::{Context, Result};
use std::net::{IpAddr, SocketAddr};

use crate::config::ServerConfig;
use crate::service::AnalysisService;

/// 設定からバインドアドレスを決定
pub fn bind_address(config: &ServerConfig) -> Result<SocketAddr> {
    let host = if config.host == "localhost" {
        "127.0.0.1"
    } else {
        config.host.as_str()
    };
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Invalid server host: {}", config.host))?;
    Ok(SocketAddr::new(ip, config.port))
}

/// サーバーを起動し、Ctrl+Cを受けるまで待機
pub async fn serve(service: AnalysisService, config: &ServerConfig) -> Result<()> {
    let addr = bind_address(config)?;
    let classifier = service.classifier_name();

    let (bound, server) = warp::serve(routes(service))
        .try_bind_with_graceful_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("🛑 Shutdown signal received, stopping server...");
        })
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        classifier = classifier,
        "🌐 VoiceUp API listening on http://{}",
        bound
    );
    server.await;
    tracing::info!("🛑 VoiceUp API stopped");

    Ok(())
}
