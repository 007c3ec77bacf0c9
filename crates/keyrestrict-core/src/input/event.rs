// Keyrestrict Input Layer - Raw Events
// Platform-neutral view of an input event as read from a device

use crate::key::Key;

/// EV_SYN event type code from input-event-codes.h
pub const EV_SYN: u16 = 0x00;

/// EV_KEY event type code from input-event-codes.h
pub const EV_KEY: u16 = 0x01;

/// SYN_REPORT code, terminates a batch of events
pub const SYN_REPORT: u16 = 0x00;

/// Check if an event is a key event.
pub fn is_key_event(event_type: u16) -> bool {
    event_type == EV_KEY
}

/// A single raw input event in arrival order.
///
/// `value` follows the evdev convention for key events:
/// 0 = release, 1 = press, 2 = repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    pub fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            event_type,
            code,
            value,
        }
    }

    /// Build an EV_KEY event for `key`
    pub fn key(key: Key, value: i32) -> Self {
        Self::new(EV_KEY, key.code(), value)
    }

    /// The SYN_REPORT marker emitted after each forwarded event
    pub fn syn_report() -> Self {
        Self::new(EV_SYN, SYN_REPORT, 0)
    }

    pub fn is_key(&self) -> bool {
        is_key_event(self.event_type)
    }
}

#[cfg(target_os = "linux")]
impl From<evdev::InputEvent> for RawEvent {
    fn from(event: evdev::InputEvent) -> Self {
        Self::new(event.event_type().0, event.code(), event.value())
    }
}

#[cfg(target_os = "linux")]
impl From<RawEvent> for evdev::InputEvent {
    fn from(event: RawEvent) -> Self {
        evdev::InputEvent::new(evdev::EventType(event.event_type), event.code, event.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_key_event_with_ev_key() {
        assert!(is_key_event(EV_KEY));
    }

    #[test]
    fn test_is_key_event_with_other_event() {
        assert!(!is_key_event(0x02)); // EV_REL
        assert!(!is_key_event(EV_SYN));
        assert!(!is_key_event(0x04)); // EV_MSC
    }

    #[test]
    fn test_key_constructor() {
        let event = RawEvent::key(Key::from(30), 1);
        assert!(event.is_key());
        assert_eq!(event.code, 30);
        assert_eq!(event.value, 1);
    }

    #[test]
    fn test_syn_report() {
        let event = RawEvent::syn_report();
        assert_eq!(event, RawEvent::new(0, 0, 0));
        assert!(!event.is_key());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_evdev_conversion() {
        let event = RawEvent::key(Key::from(28), 2);
        let input: evdev::InputEvent = event.into();
        assert_eq!(input.event_type(), evdev::EventType::KEY);
        assert_eq!(RawEvent::from(input), event);
    }
}
