// Keyrestrict Input Layer - Device Detection
// Device capability analysis and keyboard detection

/// KEY_A from input-event-codes.h
const KEY_A: u16 = 30;

/// KEY_1 from input-event-codes.h
const KEY_1: u16 = 2;

/// Device capabilities extracted from evdev device.supported_keys()
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    /// Whether the device supports EV_KEY events
    pub has_ev_key: bool,
    /// List of supported key codes (EV_KEY capability codes)
    pub supported_keys: Vec<u16>,
}

impl DeviceCapabilities {
    /// Create a new DeviceCapabilities struct
    pub fn new(has_ev_key: bool, supported_keys: Vec<u16>) -> Self {
        Self {
            has_ev_key,
            supported_keys,
        }
    }

    /// Check if a specific key code is supported
    pub fn supports_key(&self, key_code: u16) -> bool {
        self.supported_keys.contains(&key_code)
    }
}

/// Determine if a device is a keyboard based on its capabilities.
///
/// A device is considered a keyboard if it supports EV_KEY events and
/// exposes either KEY_A or KEY_1. Mice and touchpads report EV_KEY for
/// their buttons but carry no alphanumeric codes, so they are excluded.
///
/// Keypad-only devices and composite nodes may be misjudged; the check is
/// a heuristic and is kept deliberately simple.
pub fn is_keyboard(capabilities: &DeviceCapabilities) -> bool {
    if !capabilities.has_ev_key {
        return false;
    }

    capabilities.supports_key(KEY_A) || capabilities.supports_key(KEY_1)
}

/// Check if a device is a virtual device based on its name.
///
/// Virtual devices are created by keyrestrict itself and must never be
/// grabbed by a session.
///
/// # Arguments
/// * `name` - The device name from evdev
/// * `prefix` - The virtual device prefix (e.g., "Keyrestrict (virtual)")
pub fn is_virtual_device(name: &str, prefix: &str) -> bool {
    name.contains(prefix)
}
