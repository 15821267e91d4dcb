use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use garagedoor_bridge::config::{
    BrokerSettings, DeviceSettings, DoorSettings, LoggingSettings, Settings,
};
use garagedoor_bridge::errors::{GarageDoorError, GarageDoorResult};
use garagedoor_bridge::models::{
    DoorEvent, DoorState, ObservedPosition, SensorReport, TransitionCause,
};
use garagedoor_bridge::services::mqtt::MessageBus;
use garagedoor_bridge::state_management::{
    DoorCommand, DoorStateMachine, EventDispatcher, GarageDoorStateManager, TravelTimer,
};

/// A bus double that records every publish instead of sending it.
struct RecordingBus {
    published: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl RecordingBus {
    fn new() -> Arc<Self> {
        Arc::new(RecordingBus {
            published: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageBus for RecordingBus {
    async fn publish(&self, topic: &str, payload: String) -> GarageDoorResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GarageDoorError::PublishFailure("transport unavailable".to_string()));
        }
        self.published.lock().unwrap().push((topic.to_string(), payload));
        Ok(())
    }
}

fn create_test_settings(dual_sensor: bool) -> Settings {
    Settings {
        broker: BrokerSettings {
            url: "mqtt://localhost:1883".to_string(),
            username: None,
            password: None,
            client_id: "garagedoor-bridge-test".to_string(),
            keep_alive_secs: 10,
            command_topic: "domoticz/in".to_string(),
            status_topic: "domoticz/out".to_string(),
            liveness_topic: None,
            offline_payload: "Offline".to_string(),
        },
        device: DeviceSettings {
            switch_idx: 7,
            sensor_idx: 9,
            open_value: "On".to_string(),
            closed_value: "Off".to_string(),
            open_command: "Open".to_string(),
            close_command: "Close".to_string(),
        },
        door: DoorSettings {
            travel_secs: 20,
            dual_sensor,
        },
        logging: LoggingSettings {
            level: "info".to_string(),
            file: None,
            path: None,
        },
    }
}

struct TestHarness {
    machine: DoorStateMachine,
    bus: Arc<RecordingBus>,
    events: mpsc::Receiver<DoorEvent>,
    // Keeps the mailbox open so armed timers can deliver their timeout.
    _commands: mpsc::Receiver<DoorCommand>,
}

fn create_machine(settings: &Settings) -> TestHarness {
    let bus = RecordingBus::new();
    let (command_sender, command_receiver) = mpsc::channel(16);
    let (event_sender, event_receiver) = mpsc::channel(64);
    let machine = DoorStateMachine::new(
        settings,
        Arc::clone(&bus) as Arc<dyn MessageBus>,
        EventDispatcher::new(event_sender),
        command_sender,
    );
    TestHarness {
        machine,
        bus,
        events: event_receiver,
        _commands: command_receiver,
    }
}

fn open_report() -> SensorReport {
    SensorReport {
        device_idx: 9,
        observed: ObservedPosition::Open,
    }
}

fn closed_report() -> SensorReport {
    SensorReport {
        device_idx: 9,
        observed: ObservedPosition::Closed,
    }
}

fn drain_events(events: &mut mpsc::Receiver<DoorEvent>) -> Vec<DoorEvent> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

#[tokio::test]
async fn test_set_target_open_from_closed() {
    let settings = create_test_settings(false);
    let mut harness = create_machine(&settings);

    harness.machine.set_target(DoorState::Open, true).await.unwrap();

    assert_eq!(harness.machine.current_state(), DoorState::Opening);
    assert_eq!(harness.machine.target_state(), DoorState::Open);
    assert!(harness.machine.is_running());
    assert!(harness.machine.timer_is_armed());

    let published = harness.bus.published();
    assert_eq!(published.len(), 1, "exactly one open command must be dispatched");
    let (topic, payload) = &published[0];
    assert_eq!(topic, "domoticz/in");
    let body: serde_json::Value = serde_json::from_str(payload).unwrap();
    assert_eq!(body["command"], "switchlight");
    assert_eq!(body["idx"], 7);
    assert_eq!(body["switchcmd"], "Open");
}

#[tokio::test]
async fn test_set_target_equal_to_current_is_noop() {
    let settings = create_test_settings(false);
    let mut harness = create_machine(&settings);

    harness.machine.set_target(DoorState::Closed, true).await.unwrap();

    assert_eq!(harness.machine.current_state(), DoorState::Closed);
    assert!(!harness.machine.is_running());
    assert!(!harness.machine.timer_is_armed());
    assert!(harness.bus.published().is_empty(), "no command may be dispatched");
}

#[tokio::test]
async fn test_round_trip_open_confirmed_by_sensor() {
    let settings = create_test_settings(false);
    let mut harness = create_machine(&settings);

    harness.machine.set_target(DoorState::Open, true).await.unwrap();
    harness.machine.on_sensor_update(&open_report()).await.unwrap();

    assert_eq!(harness.machine.current_state(), DoorState::Open);
    assert_eq!(harness.machine.target_state(), DoorState::Open);
    assert!(!harness.machine.is_running());
    assert!(!harness.machine.obstruction_detected());
    assert_eq!(harness.bus.published().len(), 1);
}

#[tokio::test]
async fn test_external_move_resynchronizes_target_without_command() {
    let settings = create_test_settings(false);
    let mut harness = create_machine(&settings);

    // Someone opened the door from outside: the sensor announces the change.
    harness.machine.on_sensor_update(&open_report()).await.unwrap();

    assert_eq!(harness.machine.current_state(), DoorState::Opening);
    assert_eq!(harness.machine.target_state(), DoorState::Open);
    assert!(harness.machine.is_running());
    assert!(harness.bus.published().is_empty(), "reconciliation must not re-issue a command");

    // The device keeps reporting open: the travel concludes.
    harness.machine.on_sensor_update(&open_report()).await.unwrap();

    assert_eq!(harness.machine.current_state(), DoorState::Open);
    assert!(!harness.machine.is_running());
    assert!(!harness.machine.obstruction_detected());
    assert!(harness.bus.published().is_empty());
}

#[tokio::test]
async fn test_contradicting_heartbeat_raises_obstruction_first() {
    let settings = create_test_settings(false);
    let mut harness = create_machine(&settings);

    harness.machine.set_target(DoorState::Open, true).await.unwrap();
    drain_events(&mut harness.events);

    // While opening, the sensor keeps insisting the door is closed.
    harness.machine.on_sensor_update(&closed_report()).await.unwrap();

    assert!(harness.machine.obstruction_detected());
    assert_eq!(harness.machine.current_state(), DoorState::Closed);
    assert!(!harness.machine.is_running());
    assert!(!harness.machine.timer_is_armed());

    let events = drain_events(&mut harness.events);
    let obstruction_at = events.iter().position(|e| {
        matches!(e, DoorEvent::ObstructionChanged(o) if o.detected)
    });
    let settled_at = events.iter().position(|e| {
        matches!(e, DoorEvent::CurrentStateChanged(c) if c.new_state == DoorState::Closed)
    });
    let stopped_at = events.iter().position(|e| {
        matches!(e, DoorEvent::CurrentStateChanged(c) if c.new_state == DoorState::Stopped)
    });
    assert!(obstruction_at.is_some(), "obstruction must be reported");
    assert!(stopped_at.is_some(), "the door must pass through STOPPED when obstructed");
    assert!(
        obstruction_at.unwrap() < settled_at.unwrap(),
        "obstruction must be raised before the current state settles"
    );
}

#[tokio::test]
async fn test_only_closed_reports_eventually_settle_closed() {
    let settings = create_test_settings(false);
    let mut harness = create_machine(&settings);

    harness.machine.set_target(DoorState::Open, true).await.unwrap();
    for _ in 0..3 {
        harness.machine.on_sensor_update(&closed_report()).await.unwrap();
    }

    assert_eq!(harness.machine.current_state(), DoorState::Closed);
    assert!(!harness.machine.is_running());
}

#[tokio::test]
async fn test_timeout_confirms_closing_when_latches_agree() {
    let settings = create_test_settings(true);
    let mut harness = create_machine(&settings);

    // Change of mind mid-travel: open, then close again before any sensor
    // report arrived. Latches still read closed=true / open=false.
    harness.machine.set_target(DoorState::Open, true).await.unwrap();
    harness.machine.set_target(DoorState::Closed, true).await.unwrap();
    assert_eq!(harness.machine.current_state(), DoorState::Closing);

    harness.machine.on_timeout().await;

    assert_eq!(harness.machine.current_state(), DoorState::Closed);
    assert!(!harness.machine.obstruction_detected());
    assert!(!harness.machine.is_running());
}

#[tokio::test]
async fn test_timeout_single_sensor_latches_target_optimistically() {
    let settings = create_test_settings(false);
    let mut harness = create_machine(&settings);

    harness.machine.set_target(DoorState::Open, true).await.unwrap();
    harness.machine.on_timeout().await;

    assert_eq!(harness.machine.current_state(), DoorState::Open);
    assert!(!harness.machine.obstruction_detected());
    assert!(!harness.machine.is_running());
}

#[tokio::test]
async fn test_timeout_without_confirmation_raises_obstruction_and_flips_target() {
    // Dual wiring: no optimistic latch, no complement inference. The door
    // never left the closed seat, so the OPEN target cannot be confirmed.
    let settings = create_test_settings(true);
    let mut harness = create_machine(&settings);

    harness.machine.set_target(DoorState::Open, true).await.unwrap();
    harness.machine.on_timeout().await;

    assert_eq!(harness.machine.current_state(), DoorState::Stopped);
    assert!(harness.machine.obstruction_detected());
    assert_eq!(
        harness.machine.target_state(),
        DoorState::Closed,
        "target must flip to the side the latches do not contradict"
    );
    assert!(!harness.machine.is_running());
}

#[tokio::test]
async fn test_set_target_clears_obstruction() {
    let settings = create_test_settings(true);
    let mut harness = create_machine(&settings);

    harness.machine.set_target(DoorState::Open, true).await.unwrap();
    harness.machine.on_timeout().await;
    assert!(harness.machine.obstruction_detected());

    harness.machine.set_target(DoorState::Open, true).await.unwrap();

    assert!(!harness.machine.obstruction_detected());
    assert_eq!(harness.machine.current_state(), DoorState::Opening);
    assert!(harness.machine.is_running());
}

#[tokio::test]
async fn test_publish_failure_still_transitions_optimistically() {
    let settings = create_test_settings(false);
    let mut harness = create_machine(&settings);
    harness.bus.fail.store(true, Ordering::SeqCst);

    let result = harness.machine.set_target(DoorState::Open, true).await;

    assert!(matches!(result, Err(GarageDoorError::PublishFailure(_))));
    assert_eq!(harness.machine.current_state(), DoorState::Opening);
    assert!(harness.machine.is_running());
}

#[tokio::test]
async fn test_rearm_discards_superseded_timer() {
    let (command_sender, mut command_receiver) = mpsc::channel(16);

    let mut timer = TravelTimer::new();
    let first = timer.arm(Duration::from_millis(50), command_sender.clone());
    let second = timer.arm(Duration::from_millis(50), command_sender.clone());
    assert_ne!(first, second);
    assert!(!timer.is_current(first));
    assert!(timer.is_current(second));

    let fired = tokio::time::timeout(Duration::from_millis(500), command_receiver.recv())
        .await
        .expect("timer must fire")
        .expect("mailbox open");
    match fired {
        DoorCommand::TravelTimeout { generation } => assert_eq!(generation, second),
        other => panic!("unexpected command: {:?}", other),
    }

    // The superseded timer was aborted, so nothing else may arrive.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(command_receiver.try_recv().is_err());
}

#[tokio::test]
async fn test_unreachable_gate_on_host_operations() {
    let mut settings = create_test_settings(false);
    settings.broker.liveness_topic = Some("tele/garage/LWT".to_string());
    let bus = RecordingBus::new();

    let (manager, _events) =
        GarageDoorStateManager::new(&settings, Arc::clone(&bus) as Arc<dyn MessageBus>);
    let manager = Arc::new(manager);
    let runner = Arc::clone(&manager);
    tokio::spawn(async move { runner.run().await });

    assert!(matches!(
        manager.current_state().await,
        Err(GarageDoorError::Unreachable)
    ));
    assert!(matches!(
        manager.set_target_state(DoorState::Open).await,
        Err(GarageDoorError::Unreachable)
    ));
    assert!(matches!(
        manager.obstruction_detected().await,
        Err(GarageDoorError::Unreachable)
    ));
    // The target getter is not gated; the first read is forced to CLOSED.
    assert_eq!(manager.target_state().await.unwrap(), DoorState::Closed);

    // A liveness recovery reopens the gates.
    manager
        .command_sender()
        .send(DoorCommand::SetReachable(true))
        .await
        .unwrap();
    assert_eq!(manager.current_state().await.unwrap(), DoorState::Closed);
    assert_eq!(manager.obstruction_detected().await.unwrap(), false);
}

#[tokio::test]
async fn test_first_target_read_assumes_closed_on_startup() {
    let settings = create_test_settings(false);
    let bus = RecordingBus::new();

    let (manager, _events) =
        GarageDoorStateManager::new(&settings, Arc::clone(&bus) as Arc<dyn MessageBus>);
    let manager = Arc::new(manager);
    let runner = Arc::clone(&manager);
    tokio::spawn(async move { runner.run().await });

    manager.set_target_state(DoorState::Open).await.unwrap();

    assert_eq!(
        manager.target_state().await.unwrap(),
        DoorState::Closed,
        "very first target read must report CLOSED regardless of the stored target"
    );
    assert_eq!(manager.target_state().await.unwrap(), DoorState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_travel_timeout_completes_through_the_mailbox() {
    let settings = create_test_settings(false);
    let bus = RecordingBus::new();

    let (manager, mut events) =
        GarageDoorStateManager::new(&settings, Arc::clone(&bus) as Arc<dyn MessageBus>);
    let manager = Arc::new(manager);
    let runner = Arc::clone(&manager);
    tokio::spawn(async move { runner.run().await });

    manager.set_target_state(DoorState::Open).await.unwrap();

    // The configured 20s travel timer fires (virtual time) and the single-
    // sensor deployment settles on the target.
    let settled = tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            match events.recv().await {
                Some(DoorEvent::CurrentStateChanged(c))
                    if c.new_state == DoorState::Open && c.cause == TransitionCause::Timeout =>
                {
                    break true;
                }
                Some(_) => continue,
                None => break false,
            }
        }
    })
    .await
    .expect("travel timeout must fire");
    assert!(settled);
    assert_eq!(manager.obstruction_detected().await.unwrap(), false);
}
