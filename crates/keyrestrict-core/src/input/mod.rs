// Keyrestrict Input Layer
// Device detection, raw events and keyboard sources

mod device;
mod event;
mod source;

#[cfg(target_os = "linux")]
mod evdev_keyboard;

pub use device::{is_keyboard, is_virtual_device, DeviceCapabilities};
pub use event::{is_key_event, RawEvent, EV_KEY, EV_SYN, SYN_REPORT};
pub use source::InputSource;

#[cfg(target_os = "linux")]
pub use evdev_keyboard::{find_keyboard_devices, EvdevKeyboard, VIRT_DEVICE_PREFIX};
