//! Log subscriber setup for the binary
//!
//! The library only emits `tracing` events; installing a subscriber is
//! left to the executable.

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset or invalid
pub const DEFAULT_DIRECTIVE: &str = "win_tiler=info";

/// Installs a stderr fmt subscriber filtered by `RUST_LOG`
///
/// Does nothing if a global subscriber is already set, so tests and
/// embedding applications can call it freely.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directive_parses() {
        assert!(DEFAULT_DIRECTIVE.parse::<tracing_subscriber::filter::Directive>().is_ok());
    }

    #[test]
    fn init_twice_is_harmless() {
        init();
        init();
        tracing::info!("logging initialized");
    }
}
