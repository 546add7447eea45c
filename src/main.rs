use std::process::ExitCode;

use win_tiler::TilerConfig;
use win_tiler::logging;

/// Reads the optional JSON configuration named by the first argument
fn load_config() -> Result<TilerConfig, String> {
    let Some(path) = std::env::args_os().nth(1) else {
        return Ok(TilerConfig::default());
    };

    let json = std::fs::read_to_string(&path).map_err(|error| format!("cannot read {}: {error}", path.to_string_lossy()))?;
    let config = TilerConfig::from_json_str(&json).map_err(|error| error.to_string())?;
    tracing::info!(path = %path.to_string_lossy(), "configuration loaded");
    Ok(config)
}

#[cfg(windows)]
fn run(config: TilerConfig) -> ExitCode {
    use win_tiler::Tiler;
    use win_tiler::platform::hook::Win32EventSource;
    use win_tiler::platform::window::Win32WindowManager;
    use win_tiler::platform::windows::enable_dpi_awareness;

    enable_dpi_awareness();

    let source = Win32EventSource::new(config.supervisor.gesture_button).with_arm_hotkey(config.arming.hotkey.clone());
    let mut tiler = Tiler::new(&config, source, Win32WindowManager::new());
    if let Err(error) = tiler.start() {
        tracing::error!(%error, "failed to start gesture listener");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        slots = config.layout.slots.len(),
        button = ?config.supervisor.gesture_button,
        "win-tiler running"
    );
    // The listener thread does all the work; watch for it dying on its own
    loop {
        std::thread::sleep(std::time::Duration::from_secs(1));
        if tiler.is_running() {
            continue;
        }
        tracing::warn!("gesture listener exited; restarting");
        if let Err(error) = tiler.start() {
            tracing::error!(%error, "failed to restart gesture listener");
            return ExitCode::FAILURE;
        }
    }
}

#[cfg(not(windows))]
fn run(_config: TilerConfig) -> ExitCode {
    tracing::error!("win-tiler drives the Win32 window manager and only runs on Windows");
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    logging::init();

    match load_config() {
        Ok(config) => run(config),
        Err(error) => {
            tracing::error!(%error, "invalid configuration");
            ExitCode::FAILURE
        }
    }
}
