// Keyrestrict Input Layer - Input Sources
// The operations a session needs from one physical keyboard

use std::io;
use std::path::Path;
use std::time::Duration;

use super::event::RawEvent;

/// One physical keyboard as seen by a session.
///
/// Implemented by [`EvdevKeyboard`](super::EvdevKeyboard) on Linux and by
/// in-memory fakes in tests. A session owns every source it grabs; the
/// forwarder for a source only ever calls [`read_events`](Self::read_events).
pub trait InputSource: Send + 'static {
    /// Device node path (e.g. "/dev/input/event3")
    fn path(&self) -> &Path;

    /// Human readable device name
    fn name(&self) -> &str;

    /// Take an exclusive grab; no other reader receives events afterwards.
    fn grab(&mut self) -> io::Result<()>;

    /// Release the exclusive grab.
    fn ungrab(&mut self) -> io::Result<()>;

    /// Wait up to `timeout` for events and return them in arrival order.
    ///
    /// An empty batch means the timeout elapsed. An error means the device
    /// stream has ended (unplugged, closed, or otherwise unreadable).
    fn read_events(&mut self, timeout: Duration) -> io::Result<Vec<RawEvent>>;
}
