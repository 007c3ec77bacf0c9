// Keyrestrict uinput Output Layer
// Virtual keyboard creation and key event emission

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, InputEvent};
use log::info;

use super::sink::{OutputSink, UInputError};
use crate::allowlist::AllowedKeys;
use crate::input::RawEvent;

/// Virtual uinput keyboard that can only produce allow-listed keys
pub struct VirtualKeyboard {
    device: VirtualDevice,
}

impl VirtualKeyboard {
    /// Create a virtual device declaring exactly the keys in `allowed`
    pub fn create(allowed: &AllowedKeys, name: &str) -> Result<Self, UInputError> {
        let mut keys = AttributeSet::<evdev::Key>::new();
        for key in allowed.iter() {
            keys.insert(evdev::Key::new(key.code()));
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(UInputError::DeviceCreation)?
            .name(name)
            .with_keys(&keys)
            .map_err(UInputError::DeviceCreation)?
            .build()
            .map_err(UInputError::DeviceCreation)?;

        info!("created virtual device '{}' with {} keys", name, allowed.len());
        Ok(Self { device })
    }
}

impl OutputSink for VirtualKeyboard {
    fn emit(&mut self, event: RawEvent) -> Result<(), UInputError> {
        let key_event: InputEvent = event.into();

        // emit() appends the SYN_REPORT that flushes the frame
        self.device.emit(&[key_event]).map_err(UInputError::Write)
    }

    fn close(self) -> Result<(), UInputError> {
        // Dropping the handle closes the uinput fd, which destroys the device
        drop(self.device);
        Ok(())
    }
}
