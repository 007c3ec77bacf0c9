// Keyrestrict Signal Handling
// Route SIGINT/SIGTERM into a stop signal for the duration of a session

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{const_mutex, Mutex};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::SigId;

use super::stop::StopSignal;

const SIGNALS: [i32; 2] = [SIGINT, SIGTERM];

/// Process-wide bookkeeping shared by every live guard.
///
/// signal-hook cannot hand a signal back to the kernel default once an
/// action was registered; unregistering the last action leaves the signal
/// ignored. Instead a conditional default action is installed once, and it
/// is armed whenever no guard is alive.
struct DefaultRestore {
    active: usize,
    armed: Option<Arc<AtomicBool>>,
}

static RESTORE: Mutex<DefaultRestore> = const_mutex(DefaultRestore {
    active: 0,
    armed: None,
});

/// Keeps SIGINT and SIGTERM wired to a [`StopSignal`] until dropped.
///
/// After the last guard drops, both signals terminate the process again.
pub struct SignalGuard {
    ids: Vec<SigId>,
}

impl SignalGuard {
    /// Trigger `stop` when the process receives SIGINT or SIGTERM.
    pub fn register(stop: &StopSignal) -> io::Result<Self> {
        disarm_default()?;

        // From here on, dropping the guard re-arms the default action and
        // unregisters whatever was registered
        let mut guard = Self { ids: Vec::new() };
        for signal in SIGNALS {
            let id = signal_hook::flag::register(signal, stop.as_flag())?;
            guard.ids.push(id);
        }
        Ok(guard)
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            signal_hook::low_level::unregister(id);
        }

        let mut restore = RESTORE.lock();
        restore.active = restore.active.saturating_sub(1);
        if restore.active == 0 {
            if let Some(armed) = &restore.armed {
                armed.store(true, Ordering::SeqCst);
            }
        }
    }
}

/// Count one more live guard and keep the default action from firing.
fn disarm_default() -> io::Result<()> {
    let mut restore = RESTORE.lock();

    let armed = match &restore.armed {
        Some(armed) => Arc::clone(armed),
        None => {
            let armed = Arc::new(AtomicBool::new(false));
            for signal in SIGNALS {
                if let Err(e) = signal_hook::flag::register_conditional_default(
                    signal,
                    Arc::clone(&armed),
                ) {
                    // Whatever was installed must keep terminating the process
                    armed.store(true, Ordering::SeqCst);
                    restore.armed = Some(armed);
                    return Err(e);
                }
            }
            restore.armed = Some(Arc::clone(&armed));
            armed
        }
    };

    armed.store(false, Ordering::SeqCst);
    restore.active += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::Command;
    use std::time::Duration;

    const CHILD_ENV: &str = "KEYRESTRICT_SIGNAL_CHILD";

    #[test]
    fn test_register_and_unregister() {
        let stop = StopSignal::new();
        let guard = SignalGuard::register(&stop).unwrap();
        assert_eq!(guard.ids.len(), 2);
        drop(guard);
        assert!(!stop.is_triggered());
    }

    #[test]
    fn test_signal_triggers_stop_while_guarded() {
        if std::env::var_os(CHILD_ENV).is_none() {
            let status = Command::new(std::env::current_exe().unwrap())
                .args([
                    "--exact",
                    "session::signals::tests::test_signal_triggers_stop_while_guarded",
                    "--test-threads=1",
                ])
                .env(CHILD_ENV, "1")
                .status()
                .unwrap();
            assert!(status.success(), "child exited with {:?}", status);
            return;
        }

        let stop = StopSignal::new();
        let guard = SignalGuard::register(&stop).unwrap();
        signal_hook::low_level::raise(SIGTERM).unwrap();
        assert!(stop.is_triggered());
        drop(guard);
    }

    #[test]
    fn test_sigterm_terminates_after_guard_drop() {
        // Runs in a child process: the signal is fatal when handled correctly
        if std::env::var_os(CHILD_ENV).is_none() {
            let status = Command::new(std::env::current_exe().unwrap())
                .args([
                    "--exact",
                    "session::signals::tests::test_sigterm_terminates_after_guard_drop",
                    "--test-threads=1",
                ])
                .env(CHILD_ENV, "1")
                .status()
                .unwrap();
            assert_eq!(status.signal(), Some(SIGTERM), "child exited with {:?}", status);
            return;
        }

        let stop = StopSignal::new();
        let first = SignalGuard::register(&stop).unwrap();
        drop(first);
        // A second session must also hand the signal back when it ends
        let second = SignalGuard::register(&stop).unwrap();
        drop(second);

        signal_hook::low_level::raise(SIGTERM).unwrap();
        std::thread::sleep(Duration::from_millis(500));
    }
}
