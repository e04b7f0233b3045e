//! Events for the `bootpush` push protocol state machine.
//!
//! This module is private and restricted to the
//! [`boot_protocol`](crate::boot_protocol) scope.
//!
//! ```ignore
//! use super::events::*;
//! ```
//!
//! Refer to the [`state_machine`](super::state_machine) module for an
//! overview of states, events and transitions.

use crate::settings::Settings;
use crate::transport::Transport;

// =============================================================================
// Crate-Public Interface
// =============================================================================

// AwaitDiscoveryEvent =========================================================

/// Event fired to trigger a transition to [`DiscoveryState`].
///
/// This event can happen under one of the following circumstances:
///
///  1. While at the [`InitState`] and after the discovery port has been
///     successfully bound.
///
/// [`DiscoveryState`]: super::states::DiscoveryState
/// [`InitState`]: super::states::InitState
#[derive(Debug)]
pub(crate) struct AwaitDiscoveryEvent {
    pub settings: Settings,
    /// The bound transport. Consumed and moved to the next state.
    pub transport: Box<dyn Transport>,
}

// PushManifestEvent ===========================================================

/// Event fired to trigger a transition to [`ManifestState`].
///
/// This event can happen under one of the following circumstances:
///
///  1. While at the [`DiscoveryState`] upon reception of a valid BOOTME
///     announcement; its sender is the session peer from here on.
///
/// [`ManifestState`]: super::states::ManifestState
/// [`DiscoveryState`]: super::states::DiscoveryState
#[derive(Debug)]
pub(crate) struct PushManifestEvent {
    pub settings: Settings,
    /// The session transport. Consumed and moved to the next state.
    pub transport: Box<dyn Transport>,
}

// PushImageEvent ==============================================================

/// Event fired to trigger a transition to [`ImageState`].
///
/// This event can happen under one of the following circumstances:
///
///  1. While at the [`ManifestState`] after the manifest packet has been
///     acknowledged by the device.
///
/// [`ImageState`]: super::states::ImageState
/// [`ManifestState`]: super::states::ManifestState
#[derive(Debug)]
pub(crate) struct PushImageEvent {
    pub settings: Settings,
    /// The session transport. Consumed and moved to the next state.
    pub transport: Box<dyn Transport>,
}

// BootJumpEvent ===============================================================

/// Event fired to trigger a transition to [`BootJumpState`].
///
/// This event can happen under one of the following circumstances:
///
///  1. While at the [`ImageState`] after the last image chunk has been
///     acknowledged by the device.
///
/// [`BootJumpState`]: super::states::BootJumpState
/// [`ImageState`]: super::states::ImageState
#[derive(Debug)]
pub(crate) struct BootJumpEvent {
    pub settings: Settings,
    /// The session transport. Consumed and moved to the next state.
    pub transport: Box<dyn Transport>,
}

// DoneEvent ===================================================================

/// Event fired when the push session completes and is about to terminate. It
/// triggers a transition to the `Done` state.
///
/// This event can happen at any state due to normal termination or abnormal
/// termination caused by an unrecoverable transport, protocol or image
/// error.
#[derive(Debug)]
pub(crate) struct DoneEvent {
    pub settings: Settings,
    /// When `true`, indicates an abnormal completion caused by an error.
    pub with_errors: bool,
}

// ExitEvent ===================================================================

/// The last event that can be triggered in the push protocol state machine,
/// resulting in the event loop terminating with an `exit status` and handing
/// control back to the caller that started it.
///
/// The returned `status code` can be interpreted as whether the completion
/// was normal or abnormal.
#[derive(Debug)]
pub(crate) struct ExitEvent {
    pub settings: Settings,
    pub with_error: bool,
}

// Events enum =================================================================

/// Events that can be triggered within the push protocol state machine of
/// `bootpush`.
///
/// Each possible value holds an `event`, which in turn may hold additional
/// data for the state transition. Such data is passed by the origin state
/// for potential use by the target state.
#[derive(Debug)]
pub(crate) enum Event {
    AwaitDiscovery(AwaitDiscoveryEvent),
    PushManifest(PushManifestEvent),
    PushImage(PushImageEvent),
    BootJump(BootJumpEvent),
    Done(DoneEvent),
    Exit(ExitEvent),
}
