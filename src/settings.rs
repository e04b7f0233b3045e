//! Settings for the `bootpush` discovery listener and push session.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values.

use crate::wire;

// =============================================================================
// Public Interface
// =============================================================================

/// Groups all settings for a push session and acts as a
/// [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
/// target for them.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    /// UDP port on which to wait for the device's BOOTME broadcast.
    pub port: u16,

    /// Path to the image to be pushed. Optional, when not set, `bootpush`
    /// will push `nk.nb0` from the current working directory.
    pub image: Option<String>,

    /// Restrict creation of `Settings` instances unless through the
    /// `SettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}

/// The builder for the `Settings` values.
///
/// All values are optional and have default values that will be used if not
/// explicitly set.
///
/// **Example**
///
/// ```ignore
/// let settings = SettingsBuilder::new().image("my-kernel.nb0").finalize();
/// ```
pub struct SettingsBuilder {
    settings: Settings,
}
impl SettingsBuilder {
    /// Start building the settings using default values.
    pub fn new() -> Self {
        SettingsBuilder {
            settings: Settings {
                port: wire::BOOTME_PORT,
                image: None,
                _private_use_builder: (),
            },
        }
    }

    /// Set the port on which to listen for the BOOTME broadcast.
    pub fn port(mut self, port: u16) -> Self {
        self.settings.port = port;
        self
    }

    /// Set the path to the image to be pushed.
    pub fn image<'a>(mut self, image: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.image = Some(image.into().as_ref().to_owned());
        self
    }

    pub fn finalize(self) -> Settings {
        self.settings
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        SettingsBuilder::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn all_default() {
    let settings = SettingsBuilder::new().finalize();
    assert_eq!(
        settings,
        Settings {
            port: 980,
            image: None,
            _private_use_builder: (),
        }
    )
}

#[test]
fn port() {
    let settings = SettingsBuilder::new().port(9980).finalize();
    assert_eq!(settings.port, 9980);
}

#[test]
fn image() {
    let settings = SettingsBuilder::new().image("test-nk.nb0").finalize();
    assert_eq!(settings.image.unwrap(), "test-nk.nb0");
}
