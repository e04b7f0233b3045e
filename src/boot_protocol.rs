//! `bootpush` push protocol engine.
//!
//! **Example** - Importing the public interfaces through boot_protocol:
//! ```ignore
//! use crate::{
//!     boot_protocol::{self as ppsm},
//!     settings::Settings,
//! };
//! ```
//!
//! **Example** - Executing the state machine event loop:
//! ```ignore
//! let settings = SettingsBuilder::new()
//!     .image("my-kernel.nb0")
//!     .finalize();
//! let mut ppsm = ppsm::factory(settings);
//! ppsm.run();
//! ```

mod events;
mod state_machine;
mod states;

pub use state_machine::{factory, PushProtocol};
