//! Bootpush is a one-shot network bootstrapper for embedded devices whose
//! boot ROM requests its image over ethernet. When the device is reset, the
//! boot ROM broadcasts a `BOOTME` announcement on a well-known UDP port;
//! `bootpush` answers it by pushing a fixed manifest and then the image
//! itself, using the write-request/DATA/ACK opcodes of TFTP (RFC 1350) in
//! strict lockstep, and finally tells the device to jump into the freshly
//! received image.
//!
//! One run serves exactly one device: the sender of the first datagram is
//! the session peer for everything that follows, and the run either
//! completes or aborts on the first protocol violation. The boot ROM
//! expects a single synchronous exchange, so there is no timeout and no
//! retry anywhere in the protocol.
//!
//! The protocol engine is implemented as a state machine built from
//! **states** and typed **events** that trigger the transitions between
//! them:
//!
//! * The machine is in exactly one state at any time, and each state owns
//!   the data it needs (most importantly the session transport, which moves
//!   from state to state).
//! * Transitioning consumes the origin state; whatever the target state
//!   needs travels attached to the event.
//! * A transition exists only where a `From<Event>` implementation for the
//!   target state exists, so an illegal transition is a compile-time error
//!   rather than a runtime surprise.

mod boot_protocol;
mod error;
mod settings;
mod transport;
mod utils;
mod wire;

pub use boot_protocol::{factory, PushProtocol};
pub use error::{Error, Result};
pub use settings::{Settings, SettingsBuilder};
