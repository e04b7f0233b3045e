//! States for the `bootpush` push protocol state machine.
//!
//! This module is private and restricted to the
//! [`boot_protocol`](crate::boot_protocol) scope. The public interface of
//! the push protocol state machine is provided by
//! [`boot_protocol`](crate::boot_protocol).
//!
//! ```ignore
//! use super::states::*;
//! ```
//!
//! Refer to the [`state_machine`](super::state_machine) module for an
//! overview of states, events and transitions.

use std::fs::File;
use std::path::Path;

use console::style;
use log::{info, warn};

use super::events::*;

use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::transport::{Transport, UdpTransport};
use crate::utils::{await_discovery, push_image, push_manifest};
use crate::wire;

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Trait adding the ability for a state to be `run` after a transition into
/// it.
pub(crate) trait Runnable {
    /// Does the work of the state, then requests the next transition by
    /// returning the appropriate `event`. The state and the event are
    /// consumed to create the new state through the corresponding [`From`]
    /// implementation (provided such implementation exists).
    fn run(&mut self, settings: &Settings) -> Event;
}

// Init State ==================================================================

/// The initial state of the push protocol state machine.
///
/// From the `InitState`, the state machine can evolve via the following
/// transitions:
///
///  * **[`AwaitDiscoveryEvent`] => [`DiscoveryState`]** which happens after
///    the discovery port is bound,
///  * **[`DoneEvent`] => [`DoneState`]** when the port cannot be bound. This
///    is fatal for the session; there is no alternate port to fall back to.
#[derive(Debug)]
pub(crate) struct InitState {}
impl Runnable for InitState {
    fn run(&mut self, settings: &Settings) -> Event {
        info!("=> Init");

        match UdpTransport::bind(settings.port) {
            Ok(transport) => Event::AwaitDiscovery(AwaitDiscoveryEvent {
                settings: settings.clone(),
                transport: Box::new(transport),
            }),
            Err(ref e) => fail(settings, e),
        }
    }
}

// Discovery State =============================================================

/// A `state` of the push protocol state machine where `bootpush` waits for
/// the device to announce itself with a BOOTME broadcast.
///
/// A single announcement is considered. Its sender becomes the session peer
/// for everything that follows; no alternate peers are considered and there
/// is no retry.
///
/// This state can transition to another state as following:
///
///  * **[`PushManifestEvent`] => [`ManifestState`]** upon reception of a
///    datagram opening with the BOOTME magic tag,
///  * **[`DoneEvent`] => [`DoneState`]** when the announcement is invalid or
///    the transport fails.
#[derive(Debug)]
pub(crate) struct DiscoveryState {
    /// The session transport.
    ///
    /// Consumed and moved upon the transition to [`ManifestState`].
    pub transport: Option<Box<dyn Transport>>,
}
impl Runnable for DiscoveryState {
    fn run(&mut self, settings: &Settings) -> Event {
        info!("=> Discovery");
        println!("[BP] 🔌 User action needed: reset the device and start the download from its boot menu.");
        println!("[BP] ⏳ Waiting for BOOTME on port {}...", settings.port);

        if let Some(mut transport) = self.transport.take() {
            return match await_discovery(transport.as_mut()) {
                Ok(()) => {
                    println!("{}", style("[BP] 👍 BOOTME received").green());
                    Event::PushManifest(PushManifestEvent {
                        settings: settings.clone(),
                        transport,
                    })
                }
                Err(ref e) => fail(settings, e),
            };
        }

        // We should never reach here!
        unreachable!()
    }
}

// Manifest State ==============================================================

/// A `state` of the push protocol state machine where `bootpush` opens the
/// first write session and pushes the manifest describing the image to
/// follow.
///
/// This state can transition to another state as following:
///
///  * **[`PushImageEvent`] => [`ImageState`]** once the device has
///    acknowledged both the write request and the manifest packet,
///  * **[`DoneEvent`] => [`DoneState`]** when an acknowledgment is missing
///    or the transport fails.
#[derive(Debug)]
pub(crate) struct ManifestState {
    /// The session transport.
    ///
    /// Consumed and moved upon the transition to [`ImageState`].
    pub transport: Option<Box<dyn Transport>>,
}
impl Runnable for ManifestState {
    fn run(&mut self, settings: &Settings) -> Event {
        info!("=> Manifest");
        println!("[BP] 📦 Sending manifest...");

        if let Some(mut transport) = self.transport.take() {
            return match push_manifest(transport.as_mut()) {
                Ok(()) => Event::PushImage(PushImageEvent {
                    settings: settings.clone(),
                    transport,
                }),
                Err(ref e) => fail(settings, e),
            };
        }

        // We should never reach here!
        unreachable!()
    }
}

// Image State =================================================================

/// A `state` of the push protocol state machine where `bootpush` opens the
/// second write session and pushes the image content, one acknowledged chunk
/// at a time.
///
/// This state can transition to another state as following:
///
///  * **[`BootJumpEvent`] => [`BootJumpState`]** once every chunk of the
///    image has been acknowledged,
///  * **[`DoneEvent`] => [`DoneState`]** when the image cannot be read, an
///    acknowledgment is missing or the transport fails.
#[derive(Debug)]
pub(crate) struct ImageState {
    /// The session transport.
    ///
    /// Consumed and moved upon the transition to [`BootJumpState`].
    pub transport: Option<Box<dyn Transport>>,
}
impl Runnable for ImageState {
    fn run(&mut self, settings: &Settings) -> Event {
        info!("=> Image push");

        if let Some(mut transport) = self.transport.take() {
            let path = settings
                .image
                .clone()
                .unwrap_or_else(|| wire::DEFAULT_IMAGE.into());
            let (file, size) = match open_image(&path) {
                Ok(opened) => opened,
                Err(ref e) => return fail(settings, e),
            };

            println!("[BP] ⏩ Pushing `{}` ({} bytes)...", path, size);
            return match push_image(transport.as_mut(), file, size, image_name(&path)) {
                Ok(_) => Event::BootJump(BootJumpEvent {
                    settings: settings.clone(),
                    transport,
                }),
                Err(ref e) => fail(settings, e),
            };
        }

        // We should never reach here!
        unreachable!()
    }
}

// BootJump State ==============================================================

/// The final working `state` of the push protocol state machine, where
/// `bootpush` tells the device that the transfer is over and it should jump
/// into the freshly received image.
///
/// The boot-jump datagram is never answered by the device and its delivery
/// is best-effort: a transport failure here is logged but does not fail the
/// run.
///
///  * **[`DoneEvent`] => [`DoneState`]** always, with no errors.
#[derive(Debug)]
pub(crate) struct BootJumpState {
    /// The session transport, used for one last send.
    pub transport: Option<Box<dyn Transport>>,
}
impl Runnable for BootJumpState {
    fn run(&mut self, settings: &Settings) -> Event {
        info!("=> Boot jump");

        if let Some(mut transport) = self.transport.take() {
            if let Err(ref e) = transport.send(&wire::boot_jump()) {
                warn!("boot jump datagram not sent: {}", e);
            }
            println!(
                "{}",
                style("[BP] 🚀 End of transmission, the device is booting").green()
            );
            return Event::Done(DoneEvent {
                settings: settings.clone(),
                with_errors: false,
            });
        }

        // We should never reach here!
        unreachable!()
    }
}

// Done State ==================================================================

/// Reached when the push session completes, normally or abnormally.
///
/// Execution is 2-phase: the state first runs like any other to report the
/// outcome, then triggers the [`ExitEvent`] that makes the event loop
/// terminate. The `with_error` field tells the two terminations apart and
/// becomes the exit status of the event loop.
#[derive(Debug, Copy, Clone)]
pub(crate) struct DoneState {
    /// When `true`, indicates an abnormal completion caused by an error.
    pub with_error: bool,
    /// When `true` instructs the push protocol state machine to exit its
    /// event loop.
    pub should_exit: bool,
}
impl Runnable for DoneState {
    fn run(&mut self, settings: &Settings) -> Event {
        info!(
            "=> Done with{}errors",
            if self.with_error { " " } else { " no " }
        );
        // Report errors
        if self.with_error {
            println!("{}", style("[BP] 💥 The push session was aborted!").red());
            println!("[BP] 🔌 Reset the device so it broadcasts a fresh BOOTME, then try again.");
        }

        Event::Exit(ExitEvent {
            settings: settings.clone(),
            with_error: self.with_error,
        })
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// Print the diagnostic for a fatal error and request the transition to
/// [`DoneState`]. Every error ends the session; none is retried.
fn fail(settings: &Settings, err: &Error) -> Event {
    println!("{}", style(format!("[BP] 💥 {}", err)).red());
    Event::Done(DoneEvent {
        settings: settings.clone(),
        with_errors: true,
    })
}

/// Open the image and report its size.
fn open_image(path: &str) -> Result<(File, u64)> {
    let file = File::open(path).map_err(|e| Error::image(path, e))?;
    let size = file.metadata().map_err(|e| Error::image(path, e))?.len();
    Ok((file, size))
}

/// The name announced on the wire: the file-name component of the path.
fn image_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(wire::DEFAULT_IMAGE)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn image_name_is_the_file_name_component() {
    assert_eq!(image_name("nk.nb0"), "nk.nb0");
    assert_eq!(image_name("/srv/images/nk.nb0"), "nk.nb0");
    assert_eq!(image_name("../build/out/custom.nb0"), "custom.nb0");
}
