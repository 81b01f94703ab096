use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use canvas_stream::config::Config;
use canvas_stream::services::shutdown_channel;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "canvas_stream=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    info!("Starting the program, stop it with Ctrl+C");

    let (stop, shutdown) = shutdown_channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, finishing current work");
                let _ = stop.send(true);
            }
            Err(e) => warn!("failed to listen for Ctrl+C: {}", e),
        }
    });

    canvas_stream::run(config, shutdown).await?;

    Ok(())
}
