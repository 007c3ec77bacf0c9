// Keyrestrict Session Config
// Timing and naming knobs for a filtering session

use std::time::Duration;

/// Default name of the virtual output keyboard
pub const DEFAULT_DEVICE_NAME: &str = "Keyrestrict (virtual) Keyboard";

/// Settings for one filtering session.
///
/// Every field has a default, so an embedder only needs to set what it
/// wants to change:
///
/// ```toml
/// device_name = "Kiosk (virtual) Keyboard"
/// join_timeout_ms = 500
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Name the virtual output keyboard is created with
    pub device_name: String,

    /// How often the controller wakes to check for cancellation
    pub poll_interval_ms: u64,

    /// Upper bound on a single forwarder read, so idle forwarders still
    /// notice the stop signal
    pub read_timeout_ms: u64,

    /// How long teardown waits for each forwarder to exit
    pub join_timeout_ms: u64,
}

/// Errors that can occur when loading a session config
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            poll_interval_ms: 500,
            read_timeout_ms: 100,
            join_timeout_ms: 200,
        }
    }
}

impl SessionConfig {
    /// Load config from a TOML string and validate it
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values a session cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "device_name must not be empty".to_string(),
            ));
        }

        for (field, value) in [
            ("poll_interval_ms", self.poll_interval_ms),
            ("read_timeout_ms", self.read_timeout_ms),
            ("join_timeout_ms", self.join_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue(format!(
                    "{field} must be greater than zero"
                )));
            }
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}
