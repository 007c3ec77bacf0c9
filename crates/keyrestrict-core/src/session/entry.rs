// Keyrestrict Entry Points
// Blocking calls that run one filtering session until cancelled

use std::sync::Arc;

use log::info;

use super::controller::{Session, SessionError};
use super::stop::StopSignal;
use crate::allowlist::AllowedKeys;
use crate::config::SessionConfig;
use crate::input::InputSource;
use crate::output::{OutputSink, UInputError};

/// Run one session over `devices` until `cancel` is triggered.
///
/// Grabs every device (all or nothing), creates the output with
/// `create_output(allowed, device_name)`, starts one forwarder per device
/// and blocks. Every device is released before this returns, on success
/// and on every error path.
pub fn run_session<D, O, F>(
    devices: Vec<D>,
    create_output: F,
    allowed: Arc<AllowedKeys>,
    config: SessionConfig,
    cancel: &StopSignal,
) -> Result<(), SessionError>
where
    D: InputSource,
    O: OutputSink,
    F: FnOnce(&AllowedKeys, &str) -> Result<O, UInputError>,
{
    config.validate()?;

    if devices.is_empty() {
        return Err(SessionError::NoKeyboardFound);
    }

    let device_name = config.device_name.clone();
    let session: Session<D, O> = Session::new(config);

    let grabbed = session.grab_all(devices)?;
    session.attach_output(|| create_output(&allowed, &device_name))?;
    session.spawn_forwarders(Arc::clone(&allowed))?;

    info!(
        "restricting {} keyboard(s) to {} allowed keys",
        grabbed,
        allowed.len()
    );
    session.wait(cancel);
    info!("stop requested, releasing keyboards");

    session.teardown().log();
    Ok(())
}

/// Grab every keyboard and forward only allow-listed keys until SIGINT or
/// SIGTERM is received.
pub fn disable_keys() -> Result<(), SessionError> {
    disable_keys_until(SessionConfig::default(), &StopSignal::new())
}

/// Like [`disable_keys`], but also returns once `cancel` is triggered.
#[cfg(target_os = "linux")]
pub fn disable_keys_until(config: SessionConfig, cancel: &StopSignal) -> Result<(), SessionError> {
    use super::signals::SignalGuard;
    use crate::allowlist::allowed_keys;
    use crate::input::find_keyboard_devices;
    use crate::output::VirtualKeyboard;

    check_platform()?;

    let _signals = SignalGuard::register(cancel).map_err(|e| {
        SessionError::PlatformUnsupported(format!("cannot install signal handlers: {}", e))
    })?;

    let devices = find_keyboard_devices();
    run_session(
        devices,
        VirtualKeyboard::create,
        Arc::new(allowed_keys().clone()),
        config,
        cancel,
    )
}

/// Like [`disable_keys`], but also returns once `cancel` is triggered.
#[cfg(not(target_os = "linux"))]
pub fn disable_keys_until(
    _config: SessionConfig,
    _cancel: &StopSignal,
) -> Result<(), SessionError> {
    Err(SessionError::PlatformUnsupported(format!(
        "{} has no evdev/uinput support",
        std::env::consts::OS
    )))
}

/// Directory holding the event device nodes
#[cfg(target_os = "linux")]
const INPUT_DIR: &str = "/dev/input";

/// Device nodes needed for creating the virtual keyboard
#[cfg(target_os = "linux")]
const UINPUT_NODES: &[&str] = &["/dev/uinput", "/dev/input/uinput"];

#[cfg(target_os = "linux")]
fn check_platform() -> Result<(), SessionError> {
    check_device_nodes(std::path::Path::new(INPUT_DIR), UINPUT_NODES)
}

#[cfg(target_os = "linux")]
fn check_device_nodes(
    input_dir: &std::path::Path,
    uinput_nodes: &[&str],
) -> Result<(), SessionError> {
    use std::path::Path;

    if !input_dir.is_dir() {
        return Err(SessionError::PlatformUnsupported(format!(
            "{} is missing",
            input_dir.display()
        )));
    }
    if !uinput_nodes.iter().any(|node| Path::new(node).exists()) {
        return Err(SessionError::PlatformUnsupported(
            "no uinput device node (is the uinput module loaded?)".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn test_missing_input_dir_is_unsupported() {
        let missing = std::env::temp_dir().join("keyrestrict-no-such-input-dir");
        match check_device_nodes(&missing, &["/"]) {
            Err(SessionError::PlatformUnsupported(reason)) => {
                assert!(reason.contains("keyrestrict-no-such-input-dir"));
            }
            other => panic!("expected PlatformUnsupported, got {:?}", other),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_missing_uinput_node_is_unsupported() {
        let input_dir = std::env::temp_dir();
        let result = check_device_nodes(&input_dir, &["/keyrestrict-no-such-uinput"]);
        match result {
            Err(SessionError::PlatformUnsupported(reason)) => assert!(reason.contains("uinput")),
            other => panic!("expected PlatformUnsupported, got {:?}", other),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_any_uinput_node_is_enough() {
        let input_dir = std::env::temp_dir();
        let existing = input_dir.to_string_lossy().into_owned();
        let nodes = ["/keyrestrict-no-such-uinput", existing.as_str()];
        assert!(check_device_nodes(&input_dir, &nodes).is_ok());
    }

    #[cfg(not(target_os = "linux"))]
    #[test]
    fn test_disable_keys_unsupported_off_linux() {
        let result = disable_keys_until(SessionConfig::default(), &StopSignal::new());
        assert!(matches!(result, Err(SessionError::PlatformUnsupported(_))));
    }
}
