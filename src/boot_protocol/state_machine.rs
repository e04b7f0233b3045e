//! `bootpush` push protocol state machine.
//!
//! A push session is one straight run through the protocol: wait for the
//! device to announce itself, open a write session for the fixed manifest,
//! open a second write session for the image content, then fire the
//! boot-jump datagram and terminate. Any validation failure along the way
//! goes straight to `Done` with an error; there is no recovery path.
//!
//! The following state diagram summarizes the different states and
//! transitions the push protocol goes through:
//!
//! ```text
//!         START
//!           |
//!           v
//!       .-------.
//!       | Init  |------------------.
//!       '-------'                  |
//!           | port bound           |
//!           v                      |
//!      .-----------.               |
//!      | Discovery |-----------.   |
//!      '-----------'           |   |
//!           | BOOTME           |   |
//!           v                  |   |
//!      .-----------.       any |   | bind
//!      | Manifest  |---. error |   | error
//!      '-----------'   |       |   |
//!           | ACKed    |       |   |
//!           v          v       v   v
//!      .-----------.  .-----------------.
//!      |   Image   |->|      Done       |
//!      '-----------'  '-----------------'
//!           | ACKed        ^        |
//!           v              |        v
//!      .-----------.       |       END
//!      | BootJump  |-------'
//!      '-----------'
//! ```

use super::events::*;
use super::states::*;
use crate::settings::Settings;

// =============================================================================
// Public Interface
// =============================================================================

/// Represents the `bootpush` push protocol state machine. Use the
/// `factory()` function to get an instance then run it by calling its
/// `run()` method.
pub struct PushProtocol {
    sm: ProtocolStates,
}
impl PushProtocol {
    /// The push protocol state machine event loop runs until the `Done`
    /// state is reached and its `should_exit` flag is set. At such point,
    /// the event loop terminates and returns an exit code indicating no
    /// errors when equal to **`0`**; otherwise a termination with error.
    pub fn run(&mut self) -> i8 {
        loop {
            self.sm = self.sm.step();
            match &self.sm {
                ProtocolStates::Done(sm) => {
                    if sm.state.should_exit {
                        return if sm.state.with_error { 1 } else { 0 };
                    }
                }
                _ => {}
            }
        }
    }
}

/// Factory function for the `bootpush` push protocol state machine. Use it
/// to get an instance of the state machine, which you can run by invoking
/// its `run()` method.
pub fn factory(settings: Settings) -> PushProtocol {
    PushProtocol {
        // The state machine naturally starts in the `Init` state.
        sm: ProtocolStates::Init(ProtocolSM::new(settings)),
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// The raw state machine implementing `bootpush`'s push protocol, wrapped
/// by the simpler public `PushProtocol` interface.
///
/// The generic holder keeps the data shared by all states (the session
/// settings) next to the current state, and makes the machine show the
/// state it is holding when debugged.
#[derive(Debug)]
struct ProtocolSM<S: Runnable> {
    settings: Settings,
    state: S,
}
impl<S: Runnable> ProtocolSM<S> {
    fn run(&mut self) -> Event {
        self.state.run(&self.settings)
    }
}

/// The state machine starts in the `InitState`.
impl ProtocolSM<InitState> {
    fn new(settings: Settings) -> Self {
        ProtocolSM {
            settings,
            state: InitState {},
        }
    }
}

/// An enum wrapper around the states of the push protocol state machine. It
/// provides a simpler and more intuitive model for manipulating states and
/// their transitions.
enum ProtocolStates {
    Init(ProtocolSM<InitState>),
    Discovery(ProtocolSM<DiscoveryState>),
    Manifest(ProtocolSM<ManifestState>),
    Image(ProtocolSM<ImageState>),
    BootJump(ProtocolSM<BootJumpState>),
    Done(ProtocolSM<DoneState>),
}
impl ProtocolStates {
    /// The unit of work in the state machine event loop: run the current
    /// state and turn the event it returns into the next state through the
    /// `From`/`Into` transition implementations below. An event a state is
    /// not supposed to produce is a bug in the state itself.
    fn step(&mut self) -> Self {
        match self {
            ProtocolStates::Init(sm) => {
                let event = sm.run();
                match event {
                    Event::AwaitDiscovery(ev) => ProtocolStates::Discovery(ev.into()),
                    Event::Done(ev) => ProtocolStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            ProtocolStates::Discovery(sm) => {
                let event = sm.run();
                match event {
                    Event::PushManifest(ev) => ProtocolStates::Manifest(ev.into()),
                    Event::Done(ev) => ProtocolStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            ProtocolStates::Manifest(sm) => {
                let event = sm.run();
                match event {
                    Event::PushImage(ev) => ProtocolStates::Image(ev.into()),
                    Event::Done(ev) => ProtocolStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            ProtocolStates::Image(sm) => {
                let event = sm.run();
                match event {
                    Event::BootJump(ev) => ProtocolStates::BootJump(ev.into()),
                    Event::Done(ev) => ProtocolStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            ProtocolStates::BootJump(sm) => {
                let event = sm.run();
                match event {
                    Event::Done(ev) => ProtocolStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            ProtocolStates::Done(sm) => {
                let event = sm.run();
                match event {
                    Event::Exit(ev) => ProtocolStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// State from Event transitions
// -----------------------------------------------------------------------------

impl From<AwaitDiscoveryEvent> for ProtocolSM<DiscoveryState> {
    fn from(event: AwaitDiscoveryEvent) -> ProtocolSM<DiscoveryState> {
        ProtocolSM {
            settings: event.settings,
            state: DiscoveryState {
                transport: Some(event.transport),
            },
        }
    }
}

impl From<PushManifestEvent> for ProtocolSM<ManifestState> {
    fn from(event: PushManifestEvent) -> ProtocolSM<ManifestState> {
        ProtocolSM {
            settings: event.settings,
            state: ManifestState {
                transport: Some(event.transport),
            },
        }
    }
}

impl From<PushImageEvent> for ProtocolSM<ImageState> {
    fn from(event: PushImageEvent) -> ProtocolSM<ImageState> {
        ProtocolSM {
            settings: event.settings,
            state: ImageState {
                transport: Some(event.transport),
            },
        }
    }
}

impl From<BootJumpEvent> for ProtocolSM<BootJumpState> {
    fn from(event: BootJumpEvent) -> ProtocolSM<BootJumpState> {
        ProtocolSM {
            settings: event.settings,
            state: BootJumpState {
                transport: Some(event.transport),
            },
        }
    }
}

impl From<DoneEvent> for ProtocolSM<DoneState> {
    fn from(event: DoneEvent) -> ProtocolSM<DoneState> {
        ProtocolSM {
            settings: event.settings,
            state: DoneState {
                with_error: event.with_errors,
                should_exit: false,
            },
        }
    }
}
impl From<ExitEvent> for ProtocolSM<DoneState> {
    fn from(event: ExitEvent) -> ProtocolSM<DoneState> {
        ProtocolSM {
            settings: event.settings,
            state: DoneState {
                with_error: event.with_error,
                should_exit: true,
            },
        }
    }
}
