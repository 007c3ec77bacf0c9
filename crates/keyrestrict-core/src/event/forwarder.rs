// Keyrestrict Forwarder
// Per-device read -> filter -> emit loop

use std::io;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use parking_lot::Mutex;

use crate::allowlist::AllowedKeys;
use crate::input::InputSource;
use crate::output::{OutputSink, SharedOutput};
use crate::session::StopSignal;

/// Why a forwarder loop ended
#[derive(Debug)]
pub enum ForwarderExit {
    /// The session stop signal was observed
    Stopped { forwarded: u64 },
    /// The device stream ended; only this device stops forwarding
    ReadFailed { forwarded: u64, error: io::Error },
}

impl ForwarderExit {
    /// Number of events written to the output before exit
    pub fn forwarded(&self) -> u64 {
        match self {
            Self::Stopped { forwarded } | Self::ReadFailed { forwarded, .. } => *forwarded,
        }
    }
}

/// Read events from one device and forward the allowed ones until the
/// session stops or the device stream ends.
///
/// The device lock is only held for one bounded read, so the session can
/// ungrab the device between reads. Events read in the same batch in which
/// the stop signal is observed are discarded.
pub fn run_forwarder<D: InputSource, O: OutputSink>(
    device: Arc<Mutex<D>>,
    output: SharedOutput<O>,
    allowed: Arc<AllowedKeys>,
    stop: StopSignal,
    read_timeout: Duration,
) -> ForwarderExit {
    let name = device.lock().name().to_string();
    let mut forwarded = 0u64;

    loop {
        if stop.is_triggered() {
            break;
        }

        let batch = device.lock().read_events(read_timeout);
        let events = match batch {
            Ok(events) => events,
            Err(error) => {
                debug!("forwarder for {} ended: read failed: {}", name, error);
                return ForwarderExit::ReadFailed { forwarded, error };
            }
        };

        if stop.is_triggered() {
            break;
        }

        for event in events.iter().filter(|event| allowed.admits(event)) {
            match output.emit(*event) {
                Ok(()) => forwarded += 1,
                Err(e) => debug!("dropped event {:?} from {}: {}", event, name, e),
            }
        }
    }

    debug!("forwarder for {} stopped after {} events", name, forwarded);
    ForwarderExit::Stopped { forwarded }
}
