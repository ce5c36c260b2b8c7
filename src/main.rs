use std::sync::Arc;

use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;

use sensor_dashboard::app::{self, AppContext, AppHandle};
use sensor_dashboard::config::AppConfig;
use sensor_dashboard::registry::SensorRegistry;
use sensor_dashboard::server;

// Clicks queue up here while the context is busy
const COMMAND_QUEUE_DEPTH: usize = 64;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match AppConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let (surface_tx, surface_rx) = app::surface();
    let mut context = AppContext::new(SensorRegistry::new(), StdRng::from_entropy(), surface_tx);

    // A failed load is logged and the dashboard starts with what it has
    if !context.load(&config.source).await {
        warn!("Serving dashboard without a complete sensor list");
    }

    let server = server::bind(config.address).map_err(|e| e as Box<dyn std::error::Error>)?;
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let handle = AppHandle::new(commands_tx, surface_rx);

    let mut server_task = {
        let server = Arc::clone(&server);
        tokio::task::spawn_blocking(move || server::serve(&server, handle))
    };
    let context_task = tokio::spawn(context.run(commands_rx));

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        let _ = tx.send(());
    });

    // Run the server or wait for shutdown signal
    let server_running = tokio::select! {
        result = &mut server_task => {
            if let Err(e) = result {
                error!("Server thread failed: {}", e);
            }
            false
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
            true
        }
    };

    if server_running {
        server.unblock();
        if let Err(e) = server_task.await {
            error!("Server thread failed: {}", e);
        }
    }

    // Dropping the last handle ends the context
    match context_task.await {
        Ok(registry) => info!("Shut down with {} sensors", registry.len()),
        Err(e) => error!("Application context failed: {}", e),
    }

    Ok(())
}
