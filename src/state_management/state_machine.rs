//! # Door State Machine

//! This module defines the `DoorStateMachine`, the orchestrator of the reconciliation core.
//! It owns the door's current and target states together with the running, obstruction and
//! reachability flags, consumes sensor reports and travel timeouts, drives the
//! `CommandDispatcher`, and emits state-change events toward the host boundary.
//!
//! All methods mutate the machine and must therefore run on the single command-processor
//! task; nothing here is safe to call concurrently.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use crate::config::Settings;
use crate::errors::GarageDoorResult;
use crate::models::{
    local_now, CurrentStateChangedEvent, DoorEvent, DoorState, ObstructionChangedEvent,
    ReachabilityChangedEvent, SensorFact, SensorReport, SensorTracker, TargetStateChangedEvent,
    TransitionCause,
};
use crate::services::mqtt::MessageBus;
use crate::state_management::command_dispatcher::CommandDispatcher;
use crate::state_management::command_processor::DoorCommand;
use crate::state_management::event_dispatcher::EventDispatcher;
use crate::state_management::obstruction;
use crate::state_management::travel_timer::TravelTimer;

/// The reconciliation state machine for a single physical garage door.
pub struct DoorStateMachine {
    current: DoorState,
    target: DoorState,
    running: bool,
    obstructed: bool,
    reachable: bool,
    startup_pending: bool,
    travel: Duration,
    tracker: SensorTracker,
    timer: TravelTimer,
    dispatcher: CommandDispatcher,
    events: EventDispatcher,
    commands: mpsc::Sender<DoorCommand>,
}

impl DoorStateMachine {
    /// Creates the machine in its cold-start state: current and target `Closed`,
    /// not running, no obstruction, first host read of the target still pending.
    ///
    /// Reachability starts pessimistic when a liveness topic is configured and optimistic
    /// otherwise.
    pub fn new(
        settings: &Settings,
        bus: Arc<dyn MessageBus>,
        events: EventDispatcher,
        commands: mpsc::Sender<DoorCommand>,
    ) -> Self {
        DoorStateMachine {
            current: DoorState::Closed,
            target: DoorState::Closed,
            running: false,
            obstructed: false,
            reachable: settings.broker.liveness_topic.is_none(),
            startup_pending: true,
            travel: settings.door.travel_duration(),
            tracker: SensorTracker::new(settings.door.dual_sensor),
            timer: TravelTimer::new(),
            dispatcher: CommandDispatcher::new(settings, bus),
            events,
            commands,
        }
    }

    /// Requests a transition toward `target`.
    ///
    /// A target equal to the current state only records the target and returns: no timer
    /// re-arm, no duplicate command. Otherwise the obstruction flag is cleared, the travel
    /// timer is re-armed, and the door enters the matching transitional state.
    ///
    /// `user_initiated` distinguishes an explicit host command from a reconciliation
    /// triggered by the sensor itself; only the former dispatches an actuator command. A
    /// failed dispatch still transitions optimistically (the physical command may have
    /// partially succeeded) and the failure is returned to the caller.
    pub async fn set_target(
        &mut self,
        target: DoorState,
        user_initiated: bool,
    ) -> GarageDoorResult<()> {
        self.log_state("set_target entry");
        if self.target != target {
            let old = self.target;
            self.target = target;
            self.emit(DoorEvent::TargetStateChanged(TargetStateChangedEvent {
                old_state: old,
                new_state: target,
                timestamp: local_now(),
            }))
            .await;
        }
        if target == self.current {
            debug!("target {} already matches current state, nothing to do", target);
            return Ok(());
        }

        self.set_obstructed(false, TransitionCause::UserCommand).await;
        self.timer.arm(self.travel, self.commands.clone());
        self.running = true;

        let dispatched = if user_initiated {
            if target == DoorState::Open {
                self.dispatcher.dispatch_open().await
            } else {
                self.dispatcher.dispatch_close().await
            }
        } else {
            Ok(())
        };

        let old = self.current;
        self.current = DoorState::transitional_toward(target);
        if self.current != old {
            self.emit(DoorEvent::CurrentStateChanged(CurrentStateChangedEvent {
                old_state: old,
                new_state: self.current,
                cause: if user_initiated {
                    TransitionCause::UserCommand
                } else {
                    TransitionCause::SensorUpdate
                },
                timestamp: local_now(),
            }))
            .await;
        }
        self.log_state("set_target exit");
        dispatched
    }

    /// Feeds one decoded sensor report into the machine.
    ///
    /// Two exclusive paths:
    ///
    /// * Reconciliation: the report flipped a latch while the door was idle and the
    ///   observed endpoint disagrees with the target. The door was moved from outside, so
    ///   the target resynchronizes to the observed side without re-issuing a command.
    /// * Heartbeat: every other report. When the observed endpoint differs from the
    ///   current state the travel is concluded: obstruction is raised if the transition
    ///   contradicts the expected direction (or the door was already stopped), the current
    ///   state becomes the observed one, and the travel timer is cancelled.
    pub async fn on_sensor_update(&mut self, report: &SensorReport) -> GarageDoorResult<()> {
        let observed = report.observed.as_door_state();
        let fact = match observed {
            DoorState::Closed => SensorFact::Closed(true),
            _ => SensorFact::Open(true),
        };
        let evaluation = self.tracker.update(fact);
        debug!(
            "sensor report {} (changed: {}, closed latch: {}, open latch: {})",
            observed, evaluation.changed, evaluation.closed, evaluation.open
        );

        if evaluation.changed && !self.running && observed != self.target {
            info!("door moved externally, resynchronizing target to {}", observed);
            return self.set_target(observed, false).await;
        }

        if observed != self.current {
            info!("heartbeat differs: door reports {} while state is {}", observed, self.current);
            let contradicted = matches!(
                (self.current, observed),
                (DoorState::Opening, DoorState::Closed) | (DoorState::Closing, DoorState::Open)
            ) || self.current == DoorState::Stopped;
            self.set_obstructed(contradicted, TransitionCause::SensorUpdate).await;

            let old = self.current;
            self.current = observed;
            self.emit(DoorEvent::CurrentStateChanged(CurrentStateChangedEvent {
                old_state: old,
                new_state: observed,
                cause: TransitionCause::SensorUpdate,
                timestamp: local_now(),
            }))
            .await;
            self.running = false;
            self.timer.cancel();
        }
        self.log_state("on_sensor_update exit");
        Ok(())
    }

    /// Concludes a travel window whose timer expired without a sensor confirmation.
    ///
    /// Single-sensor deployments latch the fact matching the target optimistically before
    /// deciding. When the latches agree unambiguously with the target the transition
    /// completes; in every other case the door is declared obstructed.
    pub async fn on_timeout(&mut self) {
        self.log_state("on_timeout entry");
        self.running = false;
        self.timer.cancel();

        if !self.tracker.is_dual_sensor() {
            let fact = if self.target == DoorState::Open {
                SensorFact::Open(true)
            } else {
                SensorFact::Closed(true)
            };
            self.tracker.update(fact);
        }

        let obstructed =
            obstruction::evaluate(self.tracker.is_open(), self.tracker.is_closed(), false);
        let agrees = match self.target {
            DoorState::Open => self.tracker.is_open() && !self.tracker.is_closed(),
            DoorState::Closed => self.tracker.is_closed() && !self.tracker.is_open(),
            _ => false,
        };

        if !obstructed && agrees {
            let old = self.current;
            self.current = self.target;
            if self.current != old {
                self.emit(DoorEvent::CurrentStateChanged(CurrentStateChangedEvent {
                    old_state: old,
                    new_state: self.current,
                    cause: TransitionCause::Timeout,
                    timestamp: local_now(),
                }))
                .await;
            }
        } else {
            self.set_obstructed(true, TransitionCause::Timeout).await;
        }
        self.log_state("on_timeout exit");
    }

    /// Raises or clears the obstruction condition.
    ///
    /// Raising forces the current state to `Stopped` and flips the target to the side the
    /// sensor facts do not contradict: a door not known to be closed targets `Open`, a
    /// closed one targets the complement of its previous target. The externally observable
    /// obstruction flag is updated on every call.
    pub async fn set_obstructed(&mut self, state: bool, cause: TransitionCause) {
        if state {
            self.obstructed = true;
            let old = self.current;
            self.current = DoorState::Stopped;
            if old != DoorState::Stopped {
                info!("obstruction detected, door stopped (was {})", old);
                self.emit(DoorEvent::CurrentStateChanged(CurrentStateChangedEvent {
                    old_state: old,
                    new_state: DoorState::Stopped,
                    cause,
                    timestamp: local_now(),
                }))
                .await;
            }
            let new_target = if !self.tracker.is_closed() {
                DoorState::Open
            } else {
                self.target.opposite()
            };
            if new_target != self.target {
                let old_target = self.target;
                self.target = new_target;
                self.emit(DoorEvent::TargetStateChanged(TargetStateChangedEvent {
                    old_state: old_target,
                    new_state: new_target,
                    timestamp: local_now(),
                }))
                .await;
            }
        } else {
            self.obstructed = false;
        }
        self.emit(DoorEvent::ObstructionChanged(ObstructionChangedEvent {
            detected: state,
            timestamp: local_now(),
        }))
        .await;
    }

    /// Updates device reachability, emitting an event on change.
    pub async fn set_reachable(&mut self, reachable: bool) {
        if self.reachable != reachable {
            if reachable {
                info!("device is back online");
            } else {
                info!("device gone offline");
            }
            self.reachable = reachable;
            self.emit(DoorEvent::ReachabilityChanged(ReachabilityChangedEvent {
                reachable,
                timestamp: local_now(),
            }))
            .await;
        }
    }

    /// The current state, additionally triggering a device status poll on the bus.
    ///
    /// The poll mirrors a host read of the current-state characteristic; a failed poll
    /// publish does not fail the read.
    pub async fn current_state_with_poll(&self) -> DoorState {
        if let Err(e) = self.dispatcher.poll_device_status().await {
            error!("device status poll failed: {}", e);
        }
        info!("Garage door is {}", self.current);
        self.current
    }

    /// The target state as the host sees it: `Closed` unconditionally on the very first
    /// read after startup, the real target thereafter.
    pub fn host_target_state(&mut self) -> DoorState {
        if self.startup_pending {
            info!("startup, assuming closed");
            self.startup_pending = false;
            DoorState::Closed
        } else {
            self.target
        }
    }

    pub fn current_state(&self) -> DoorState {
        self.current
    }

    pub fn target_state(&self) -> DoorState {
        self.target
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn obstruction_detected(&self) -> bool {
        self.obstructed
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    /// Whether `generation` identifies the live travel timer.
    pub fn timer_is_current(&self, generation: u64) -> bool {
        self.timer.is_current(generation)
    }

    /// Whether a travel timer is armed and pending.
    pub fn timer_is_armed(&self) -> bool {
        self.timer.is_armed()
    }

    async fn emit(&self, event: DoorEvent) {
        if let Err(e) = self.events.dispatch_event(event).await {
            error!("failed to dispatch door event: {}", e);
        }
    }

    fn log_state(&self, context: &str) {
        debug!(
            "{}: current={} target={} running={} obstructed={} reachable={} closed_latch={} open_latch={}",
            context,
            self.current,
            self.target,
            self.running,
            self.obstructed,
            self.reachable,
            self.tracker.is_closed(),
            self.tracker.is_open()
        );
    }
}
