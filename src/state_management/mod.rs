pub mod command_dispatcher;
pub mod command_processor;
pub mod event_dispatcher;
pub mod obstruction;
pub mod state_machine;
pub mod state_manager;
pub mod travel_timer;

pub use command_dispatcher::CommandDispatcher;
pub use command_processor::{CommandProcessor, DoorCommand};
pub use event_dispatcher::EventDispatcher;
pub use state_machine::DoorStateMachine;
pub use state_manager::GarageDoorStateManager;
pub use travel_timer::TravelTimer;
