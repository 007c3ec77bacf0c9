// Keyrestrict Event Handling
// Per-device forwarding loops

mod forwarder;

pub use forwarder::{run_forwarder, ForwarderExit};
