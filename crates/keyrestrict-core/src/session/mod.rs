// Keyrestrict Session
// Session lifecycle, cancellation and public entry points

mod controller;
mod entry;
mod stop;

#[cfg(target_os = "linux")]
mod signals;

pub use controller::{DeviceFailure, Session, SessionError, TeardownReport};
pub use entry::{disable_keys, disable_keys_until, run_session};
pub use stop::StopSignal;

#[cfg(target_os = "linux")]
pub use signals::SignalGuard;
