use std::sync::Arc;
use anyhow::Result;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;
use crate::config::Settings;
use crate::controllers::garage_door::GarageDoorController;
use crate::models::DoorEvent;
use crate::services::mqtt::{BusListener, MessageBus, MqttBus};
use crate::state_management::GarageDoorStateManager;
use crate::utils::logging;


pub struct AppContext {
    pub settings: Arc<Settings>,
    pub bus: Arc<MqttBus>,
    pub state_manager: Arc<GarageDoorStateManager>,
    pub controller: Arc<GarageDoorController>,
    pub listener: BusListener,
    pub events: mpsc::Receiver<DoorEvent>,
    pub log_guard: Option<WorkerGuard>,
}

pub fn initialize() -> Result<AppContext> {
    let settings = Arc::new(Settings::new()?);
    let log_guard = logging::init_logger(settings.logging.path.clone(), &settings.logging.level)?;

    let (bus, eventloop) = MqttBus::connect(&settings.broker)?;

    let (state_manager, events) =
        GarageDoorStateManager::new(&settings, Arc::clone(&bus) as Arc<dyn MessageBus>);
    let state_manager = Arc::new(state_manager);

    let controller = Arc::new(GarageDoorController::new(Arc::clone(&state_manager)));

    let listener = BusListener::new(
        &settings,
        Arc::clone(&bus),
        eventloop,
        state_manager.command_sender(),
    );

    Ok(AppContext {
        settings,
        bus,
        state_manager,
        controller,
        listener,
        events,
        log_guard,
    })
}
