// Keyrestrict Output Layer
// Virtual keyboard and the lock-scoped sink shared by forwarders

mod sink;

#[cfg(target_os = "linux")]
mod uinput;

pub use sink::{OutputSink, SharedOutput, UInputError};

#[cfg(target_os = "linux")]
pub use uinput::VirtualKeyboard;
