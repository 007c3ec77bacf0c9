// In-memory keyboards and output sinks for session tests

#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use keyrestrict_core::{InputSource, OutputSink, RawEvent, SessionConfig, UInputError, EV_KEY};
use parking_lot::Mutex;

/// Observable state of a fake keyboard, shared with the test
#[derive(Clone, Default)]
pub struct Probe {
    grabbed: Arc<AtomicBool>,
    grabs: Arc<AtomicUsize>,
    ungrabs: Arc<AtomicUsize>,
}

impl Probe {
    pub fn is_grabbed(&self) -> bool {
        self.grabbed.load(Ordering::SeqCst)
    }

    pub fn grabs(&self) -> usize {
        self.grabs.load(Ordering::SeqCst)
    }

    pub fn ungrabs(&self) -> usize {
        self.ungrabs.load(Ordering::SeqCst)
    }
}

/// A keyboard fed through a channel. Dropping the sender unplugs it.
pub struct FakeKeyboard {
    path: PathBuf,
    name: String,
    probe: Probe,
    events: Receiver<RawEvent>,
    fail_grab: bool,
    fail_ungrab: bool,
}

impl FakeKeyboard {
    pub fn new(name: &str) -> (Self, Sender<RawEvent>, Probe) {
        let (tx, rx) = mpsc::channel();
        let probe = Probe::default();
        let keyboard = Self {
            path: PathBuf::from(format!("/dev/input/fake-{name}")),
            name: name.to_string(),
            probe: probe.clone(),
            events: rx,
            fail_grab: false,
            fail_ungrab: false,
        };
        (keyboard, tx, probe)
    }

    pub fn failing_grab(mut self) -> Self {
        self.fail_grab = true;
        self
    }

    pub fn failing_ungrab(mut self) -> Self {
        self.fail_ungrab = true;
        self
    }
}

impl InputSource for FakeKeyboard {
    fn path(&self) -> &Path {
        &self.path
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn grab(&mut self) -> io::Result<()> {
        if self.fail_grab {
            return Err(io::Error::new(io::ErrorKind::ResourceBusy, "device busy"));
        }
        self.probe.grabs.fetch_add(1, Ordering::SeqCst);
        self.probe.grabbed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn ungrab(&mut self) -> io::Result<()> {
        self.probe.ungrabs.fetch_add(1, Ordering::SeqCst);
        if self.fail_ungrab {
            return Err(io::Error::other("ungrab refused"));
        }
        self.probe.grabbed.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn read_events(&mut self, timeout: Duration) -> io::Result<Vec<RawEvent>> {
        match self.events.recv_timeout(timeout) {
            Ok(first) => {
                let mut batch = vec![first];
                batch.extend(self.events.try_iter());
                Ok(batch)
            }
            Err(RecvTimeoutError::Timeout) => Ok(Vec::new()),
            Err(RecvTimeoutError::Disconnected) => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device unplugged",
            )),
        }
    }
}

/// Records every emitted event; shared with the test
#[derive(Clone, Default)]
pub struct OutputProbe {
    events: Arc<Mutex<Vec<RawEvent>>>,
    closed: Arc<AtomicBool>,
}

impl OutputProbe {
    pub fn events(&self) -> Vec<RawEvent> {
        self.events.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` events were emitted
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.events.lock().len() >= count {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }
}

pub struct FakeOutput {
    probe: OutputProbe,
    fail_close: bool,
}

impl FakeOutput {
    pub fn new() -> (Self, OutputProbe) {
        let probe = OutputProbe::default();
        (
            Self {
                probe: probe.clone(),
                fail_close: false,
            },
            probe,
        )
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

impl OutputSink for FakeOutput {
    fn emit(&mut self, event: RawEvent) -> Result<(), UInputError> {
        self.probe.events.lock().push(event);
        Ok(())
    }

    fn close(self) -> Result<(), UInputError> {
        self.probe.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            return Err(UInputError::Write(io::Error::other("close refused")));
        }
        Ok(())
    }
}

pub fn press(code: u16) -> RawEvent {
    RawEvent::new(EV_KEY, code, 1)
}

pub fn release(code: u16) -> RawEvent {
    RawEvent::new(EV_KEY, code, 0)
}

/// Short timings so tests do not wait on production intervals
pub fn fast_config() -> SessionConfig {
    SessionConfig {
        poll_interval_ms: 5,
        read_timeout_ms: 5,
        join_timeout_ms: 500,
        ..SessionConfig::default()
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_until(condition: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
