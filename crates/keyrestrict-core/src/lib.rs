// Keyrestrict Core Library
// Grab physical keyboards and forward only allow-listed keys through uinput

pub mod allowlist;
pub mod config;
pub mod event;
pub mod input;
pub mod key;
pub mod output;
pub mod session;

pub use allowlist::{allowed_keys, AllowedKeys};
pub use config::{ConfigError, SessionConfig};
pub use event::{run_forwarder, ForwarderExit};
pub use input::{
    is_key_event, is_keyboard, is_virtual_device, DeviceCapabilities, InputSource, RawEvent, EV_KEY,
};
pub use key::Key;
pub use output::{OutputSink, SharedOutput, UInputError};
pub use session::{
    disable_keys, disable_keys_until, run_session, Session, SessionError, StopSignal,
    TeardownReport,
};

#[cfg(target_os = "linux")]
pub use input::{find_keyboard_devices, EvdevKeyboard};
#[cfg(target_os = "linux")]
pub use output::VirtualKeyboard;
