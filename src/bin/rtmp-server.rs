use log::info;
use rtmp::{Result, RtmpServer, ServerConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let host = std::env::var("RTMP_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("RTMP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(1935);

    let config = ServerConfig::builder().host(host).port(port).build()?;
    info!("starting RTMP server on {}:{}", config.host, config.port);

    let server = Arc::new(RtmpServer::new(config));

    let shutdown = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down");
            shutdown.shutdown();
        }
    });

    server.listen().await
}
