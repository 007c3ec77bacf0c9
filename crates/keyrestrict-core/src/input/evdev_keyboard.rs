// Keyrestrict Input Layer - evdev Keyboards
// Keyboard enumeration and bounded reads on /dev/input/event* nodes

use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use evdev::{Device, EventType};
use log::debug;

use super::device::{is_keyboard, is_virtual_device, DeviceCapabilities};
use super::event::RawEvent;
use super::source::InputSource;

/// Virtual device prefix to filter out
pub const VIRT_DEVICE_PREFIX: &str = "Keyrestrict (virtual)";

/// A physical keyboard backed by an evdev device node.
pub struct EvdevKeyboard {
    path: PathBuf,
    name: String,
    device: Device,
}

impl EvdevKeyboard {
    fn new(path: PathBuf, device: Device) -> Self {
        let name = device.name().unwrap_or("Unknown").to_string();
        Self { path, name, device }
    }

    /// Open a single device node, regardless of its capabilities
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let device = Device::open(path.as_ref())?;
        Ok(Self::new(path.as_ref().to_path_buf(), device))
    }

    /// Capabilities of the underlying device
    pub fn capabilities(&self) -> DeviceCapabilities {
        capabilities_of(&self.device)
    }
}

impl std::fmt::Debug for EvdevKeyboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevKeyboard")
            .field("path", &self.path)
            .field("name", &self.name)
            .finish()
    }
}

fn capabilities_of(device: &Device) -> DeviceCapabilities {
    let has_ev_key = device.supported_events().contains(EventType::KEY);
    let supported_keys = device
        .supported_keys()
        .map(|keys| keys.iter().map(|key| key.code()).collect())
        .unwrap_or_default();
    DeviceCapabilities::new(has_ev_key, supported_keys)
}

impl InputSource for EvdevKeyboard {
    fn path(&self) -> &Path {
        &self.path
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn grab(&mut self) -> io::Result<()> {
        self.device.grab()
    }

    fn ungrab(&mut self) -> io::Result<()> {
        self.device.ungrab()
    }

    fn read_events(&mut self, timeout: Duration) -> io::Result<Vec<RawEvent>> {
        let mut poll_fd = libc::pollfd {
            fd: self.device.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);

        let poll_result = unsafe { libc::poll(&mut poll_fd, 1, timeout_ms) };

        if poll_result < 0 {
            let err = io::Error::last_os_error();
            // A signal landed while waiting; report an empty batch so the
            // caller gets a chance to check its stop flag.
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Vec::new());
            }
            return Err(err);
        }

        if poll_result == 0 {
            return Ok(Vec::new());
        }

        if poll_fd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("device {} is no longer readable", self.path.display()),
            ));
        }

        let events = self.device.fetch_events()?.map(RawEvent::from).collect();
        Ok(events)
    }
}

/// Find all devices that look like keyboards.
///
/// Devices that cannot be opened are skipped by `evdev::enumerate`. Virtual
/// keyboards created by keyrestrict are never returned. Order follows the
/// platform enumeration and is not stable across runs.
pub fn find_keyboard_devices() -> Vec<EvdevKeyboard> {
    let mut keyboards = Vec::new();

    for (path, device) in evdev::enumerate() {
        let device_name = device.name().unwrap_or("Unknown");

        if is_virtual_device(device_name, VIRT_DEVICE_PREFIX) {
            debug!("skipping virtual device {} ({})", device_name, path.display());
            continue;
        }

        if !is_keyboard(&capabilities_of(&device)) {
            debug!("skipping non-keyboard {} ({})", device_name, path.display());
            continue;
        }

        debug!("found keyboard {} ({})", device_name, path.display());
        keyboards.push(EvdevKeyboard::new(path, device));
    }

    keyboards
}
