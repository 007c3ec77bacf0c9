// Keyrestrict
// Grab every keyboard and let only 0-9, A-Z, Enter, Backspace, Shift and
// CapsLock through until SIGINT/SIGTERM

use anyhow::Context;
use log::info;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("keyrestrict is running. Send SIGTERM or SIGINT to release the keyboards.");
    keyrestrict_core::disable_keys().context("keyboard restriction failed")?;
    info!("keyboards released");

    Ok(())
}
