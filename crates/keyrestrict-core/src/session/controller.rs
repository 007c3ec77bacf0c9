// Keyrestrict Session Controller
// Grab -> create output -> spawn forwarders -> wait -> teardown

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use parking_lot::Mutex;

use super::stop::StopSignal;
use crate::allowlist::AllowedKeys;
use crate::config::{ConfigError, SessionConfig};
use crate::event::{run_forwarder, ForwarderExit};
use crate::input::InputSource;
use crate::output::{OutputSink, SharedOutput, UInputError};

/// How often teardown re-checks a forwarder that has not finished yet
const JOIN_POLL: Duration = Duration::from_millis(5);

/// Errors that end a session before or during setup.
///
/// Whenever one of these is returned, every device grabbed by the session
/// has already been released.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Platform unsupported: {0}")]
    PlatformUnsupported(String),

    #[error("No keyboard devices found")]
    NoKeyboardFound,

    #[error("Failed to grab device {device}: {source}")]
    GrabFailed {
        device: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create output device: {0}")]
    OutputDeviceCreationFailed(#[source] UInputError),

    #[error("Output device already attached")]
    OutputAlreadyAttached,

    #[error("Failed to start forwarder for {device}: {source}")]
    ForwarderSpawnFailed {
        device: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid session config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// A device that could not be released
#[derive(Debug)]
pub struct DeviceFailure {
    pub device: String,
    pub error: io::Error,
}

/// Everything that went wrong (and right) while tearing a session down.
///
/// Teardown never stops on a failure; failures are collected here instead.
/// Call [`log`](Self::log) to report and discard them.
#[must_use = "teardown failures are collected, call .log() to report and discard them"]
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Devices successfully ungrabbed
    pub released: usize,
    pub ungrab_failures: Vec<DeviceFailure>,
    /// Whether this call destroyed the output device
    pub output_destroyed: bool,
    pub output_failure: Option<UInputError>,
    /// Forwarders that exited within the join timeout
    pub joined: usize,
    /// Forwarders that panicked
    pub panicked: usize,
    /// Names of forwarders left running past the join timeout
    pub detached: Vec<String>,
}

impl TeardownReport {
    /// True if every step succeeded
    pub fn is_clean(&self) -> bool {
        self.ungrab_failures.is_empty()
            && self.output_failure.is_none()
            && self.panicked == 0
            && self.detached.is_empty()
    }

    /// True if this call had nothing left to tear down
    pub fn is_noop(&self) -> bool {
        self.released == 0
            && self.ungrab_failures.is_empty()
            && !self.output_destroyed
            && self.output_failure.is_none()
            && self.joined == 0
            && self.panicked == 0
            && self.detached.is_empty()
    }

    /// Log every collected failure and drop the report.
    pub fn log(self) {
        if self.is_noop() {
            return;
        }

        for failure in &self.ungrab_failures {
            warn!("failed to ungrab {}: {}", failure.device, failure.error);
        }
        if let Some(error) = &self.output_failure {
            warn!("failed to destroy virtual device: {}", error);
        }
        if self.panicked > 0 {
            warn!("{} forwarder(s) panicked", self.panicked);
        }
        for name in &self.detached {
            warn!("forwarder {} did not exit in time, detached", name);
        }

        info!(
            "session torn down: released {} device(s), joined {} forwarder(s)",
            self.released, self.joined
        );
    }
}

struct SessionState<D: InputSource, O: OutputSink> {
    grabbed: Vec<Arc<Mutex<D>>>,
    output: Option<SharedOutput<O>>,
    tasks: Vec<JoinHandle<ForwarderExit>>,
}

/// One filtering session: owns every grabbed device, the output device
/// and the forwarder threads.
///
/// Dropping a session tears it down, so devices are released even when the
/// owner unwinds from a panic.
pub struct Session<D: InputSource, O: OutputSink> {
    config: SessionConfig,
    stop: StopSignal,
    state: Mutex<SessionState<D, O>>,
}

impl<D: InputSource, O: OutputSink> Session<D, O> {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            stop: StopSignal::new(),
            state: Mutex::new(SessionState {
                grabbed: Vec::new(),
                output: None,
                tasks: Vec::new(),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The session's internal stop signal. Triggering it ends `wait` and
    /// every forwarder.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_triggered()
    }

    pub fn grabbed_count(&self) -> usize {
        self.state.lock().grabbed.len()
    }

    pub fn has_output(&self) -> bool {
        self.state.lock().output.is_some()
    }

    pub fn forwarder_count(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Grab every device in order, all or nothing.
    ///
    /// On the first failure the devices grabbed so far in this call are
    /// ungrabbed again and `GrabFailed` is returned.
    pub fn grab_all(&self, devices: Vec<D>) -> Result<usize, SessionError> {
        let mut grabbed: Vec<D> = Vec::with_capacity(devices.len());

        for mut device in devices {
            if let Err(source) = device.grab() {
                let name = device.name().to_string();
                let (_, failures) = ungrab_each(grabbed.iter_mut());
                for failure in failures {
                    warn!("rollback: failed to ungrab {}: {}", failure.device, failure.error);
                }
                return Err(SessionError::GrabFailed {
                    device: name,
                    source,
                });
            }
            info!("grabbed {} ({})", device.name(), device.path().display());
            grabbed.push(device);
        }

        let count = grabbed.len();
        self.state
            .lock()
            .grabbed
            .extend(grabbed.into_iter().map(|device| Arc::new(Mutex::new(device))));
        Ok(count)
    }

    /// Create the output device. On failure every grabbed device is released.
    ///
    /// A session holds at most one output; a second call returns
    /// `OutputAlreadyAttached` without calling `create` and leaves the
    /// session untouched.
    pub fn attach_output<F>(&self, create: F) -> Result<(), SessionError>
    where
        F: FnOnce() -> Result<O, UInputError>,
    {
        if self.has_output() {
            return Err(SessionError::OutputAlreadyAttached);
        }

        match create() {
            Ok(sink) => {
                self.state.lock().output = Some(SharedOutput::new(sink));
                Ok(())
            }
            Err(error) => {
                let devices = std::mem::take(&mut self.state.lock().grabbed);
                let mut locked: Vec<_> = devices.iter().map(|device| device.lock()).collect();
                let (_, failures) = ungrab_each(locked.iter_mut().map(|guard| &mut **guard));
                for failure in failures {
                    warn!("rollback: failed to ungrab {}: {}", failure.device, failure.error);
                }
                Err(SessionError::OutputDeviceCreationFailed(error))
            }
        }
    }

    /// Start one forwarder thread per grabbed device.
    ///
    /// If a thread cannot be started the whole session is torn down.
    pub fn spawn_forwarders(&self, allowed: Arc<AllowedKeys>) -> Result<usize, SessionError> {
        let spawn_error = {
            let mut state = self.state.lock();
            let Some(output) = state.output.clone() else {
                warn!("no output device attached, not starting forwarders");
                return Ok(0);
            };

            let mut spawn_error = None;
            for (index, device) in state.grabbed.clone().into_iter().enumerate() {
                let device_name = device.lock().name().to_string();
                let output = output.clone();
                let allowed = Arc::clone(&allowed);
                let stop = self.stop.clone();
                let read_timeout = self.config.read_timeout();

                let spawned = thread::Builder::new()
                    .name(format!("keyrestrict-fwd-{index}"))
                    .spawn(move || run_forwarder(device, output, allowed, stop, read_timeout));

                match spawned {
                    Ok(handle) => state.tasks.push(handle),
                    Err(source) => {
                        spawn_error = Some(SessionError::ForwarderSpawnFailed {
                            device: device_name,
                            source,
                        });
                        break;
                    }
                }
            }
            spawn_error
        };

        match spawn_error {
            None => Ok(self.forwarder_count()),
            Some(error) => {
                self.teardown().log();
                Err(error)
            }
        }
    }

    /// Block until `cancel` or the session's own stop signal is triggered.
    pub fn wait(&self, cancel: &StopSignal) {
        let interval = self.config.poll_interval();
        while !cancel.is_triggered() && !self.stop.is_triggered() {
            thread::sleep(interval);
        }
    }

    /// Stop forwarders, release every device and destroy the output.
    ///
    /// Safe to call any number of times, from any thread; later calls find
    /// nothing left to do. Individual failures never stop the remaining
    /// steps.
    pub fn teardown(&self) -> TeardownReport {
        let mut state = self.state.lock();
        self.stop.trigger();

        let mut report = TeardownReport::default();

        let devices = std::mem::take(&mut state.grabbed);
        let mut locked: Vec<_> = devices.iter().map(|device| device.lock()).collect();
        let (released, failures) = ungrab_each(locked.iter_mut().map(|guard| &mut **guard));
        report.released = released;
        report.ungrab_failures = failures;
        drop(locked);

        if let Some(output) = state.output.take() {
            match output.close() {
                Ok(destroyed) => report.output_destroyed = destroyed,
                Err(error) => report.output_failure = Some(error),
            }
        }

        let join_timeout = self.config.join_timeout();
        for handle in std::mem::take(&mut state.tasks) {
            let name = handle.thread().name().unwrap_or("forwarder").to_string();
            match join_with_timeout(handle, join_timeout) {
                JoinOutcome::Joined(exit) => {
                    debug!("{} exited after forwarding {} events", name, exit.forwarded());
                    report.joined += 1;
                }
                JoinOutcome::Panicked => report.panicked += 1,
                JoinOutcome::TimedOut => report.detached.push(name),
            }
        }

        report
    }
}

impl<D: InputSource, O: OutputSink> Drop for Session<D, O> {
    fn drop(&mut self) {
        self.teardown().log();
    }
}

/// Ungrab every device, collecting failures instead of stopping on them.
/// Returns how many were released.
fn ungrab_each<'a, D: InputSource>(
    devices: impl IntoIterator<Item = &'a mut D>,
) -> (usize, Vec<DeviceFailure>) {
    let mut released = 0;
    let mut failures = Vec::new();

    for device in devices {
        match device.ungrab() {
            Ok(()) => {
                debug!("ungrabbed {}", device.name());
                released += 1;
            }
            Err(error) => failures.push(DeviceFailure {
                device: device.name().to_string(),
                error,
            }),
        }
    }

    (released, failures)
}

enum JoinOutcome {
    Joined(ForwarderExit),
    Panicked,
    TimedOut,
}

fn join_with_timeout(handle: JoinHandle<ForwarderExit>, timeout: Duration) -> JoinOutcome {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            // Dropping the handle detaches the thread
            return JoinOutcome::TimedOut;
        }
        thread::sleep(JOIN_POLL);
    }

    match handle.join() {
        Ok(exit) => JoinOutcome::Joined(exit),
        Err(_) => JoinOutcome::Panicked,
    }
}
