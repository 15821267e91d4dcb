use anyhow::Result;
use tracing::{info, warn};
use tokio::signal::ctrl_c;
use garagedoor_bridge::init;

/// The main entry point of the garage door bridge
///
/// This function initializes the application, sets up logging, wires the broker session
/// into the state manager, and runs until a shutdown signal is received
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}


/// The core logic of the garage door bridge
///
/// This asynchronous function performs the following steps:
/// 1. Loads application settings from configuration files and initializes logging
/// 2. Builds the broker session and the door state manager
/// 3. Spawns the command processing loop, the bus listener and the host-boundary event consumer
/// 4. Publishes an initial device status poll
/// 5. Waits for a shutdown signal
///
/// # Returns
///
/// * `Ok(())` if the application runs successfully and shuts down gracefully
/// * `Err(anyhow::Error)` if any errors occur during initialization
async fn run() -> Result<()> {
    let context = init::initialize()?;
    let _log_guard = context.log_guard;
    info!("Broker session: {}", context.settings.broker);

    let state_manager = context.state_manager;
    let manager = state_manager.clone();
    tokio::spawn(async move {
        manager.run().await;
    });

    tokio::spawn(context.listener.run());

    let mut events = context.events;
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!("door event: {:?}", event);
        }
    });

    match context.controller.get_current_state().await {
        Ok(state) => info!("Garage door is {}", state),
        Err(e) => warn!("initial status poll failed: {}", e),
    }

    ctrl_c().await?;
    info!("Received shutdown signal. Shutting down gracefully...");
    Ok(())
}
