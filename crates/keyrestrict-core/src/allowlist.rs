// Keyrestrict Allow-list
// The fixed set of keys that survive filtering

use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::input::RawEvent;
use crate::key::{key_from_name, Key};

/// Named keys allowed in addition to digits and letters
const SPECIAL_KEYS: &[&str] = &[
    "KEY_ENTER",
    "KEY_BACKSPACE",
    "KEY_LEFTSHIFT",
    "KEY_RIGHTSHIFT",
    "KEY_CAPSLOCK",
];

/// Immutable set of keys that are forwarded to the virtual device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllowedKeys {
    keys: BTreeSet<Key>,
}

impl AllowedKeys {
    /// Build the standard allow-list: digits 0-9 (main row and keypad),
    /// letters A-Z, Enter, Backspace, both Shifts and CapsLock.
    pub fn standard() -> Self {
        let digits = ('0'..='9').flat_map(|d| [format!("KEY_{d}"), format!("KEY_KP{d}")]);
        let letters = ('A'..='Z').map(|l| format!("KEY_{l}"));
        let specials = SPECIAL_KEYS.iter().map(|name| name.to_string());

        Self::from_names(digits.chain(letters).chain(specials))
    }

    /// Resolve key names into a set. Names without a known code are skipped.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = names
            .into_iter()
            .filter_map(|name| key_from_name(name.as_ref()))
            .collect();
        Self { keys }
    }

    pub fn contains(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }

    /// Whether `event` passes the filter: a key event whose code is allowed.
    pub fn admits(&self, event: &RawEvent) -> bool {
        event.is_key() && self.contains(Key::from(event.code))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in ascending code order
    pub fn iter(&self) -> impl Iterator<Item = Key> + '_ {
        self.keys.iter().copied()
    }
}

impl FromIterator<Key> for AllowedKeys {
    fn from_iter<T: IntoIterator<Item = Key>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

/// Process-wide standard allow-list, built on first use.
pub fn allowed_keys() -> &'static AllowedKeys {
    static ALLOWED: OnceLock<AllowedKeys> = OnceLock::new();
    ALLOWED.get_or_init(AllowedKeys::standard)
}
