//! media-dl server binary
//!
//! Serves the REST API on `0.0.0.0:$PORT` (default 5000), writing downloads
//! to `./downloads`. Log verbosity follows `RUST_LOG`.

use media_dl::{Config, MediaDownloader};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,media_dl=debug"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Config::from_env()?;
    let downloader = Arc::new(MediaDownloader::new(config).await?);

    let capabilities = downloader.capabilities();
    tracing::info!(
        engine = %capabilities.engine,
        engine_available = capabilities.engine_available,
        download_dir = %capabilities.download_dir,
        retention_secs = capabilities.retention_secs,
        "media-dl starting"
    );

    let sweeper = downloader.start_sweeper();
    let mut server = downloader.spawn_api_server();

    tokio::select! {
        result = media_dl::run_with_shutdown((*downloader).clone()) => {
            result?;
            (&mut server).await??;
        }
        joined = &mut server => {
            // the server only returns on its own when it failed
            downloader.shutdown().await?;
            joined??;
        }
    }

    sweeper.await.ok();
    tracing::info!("media-dl stopped");
    Ok(())
}
