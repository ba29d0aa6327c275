//! Logging setup: one JSON line per event.
//!
//! Call sites use `tracing` macros directly with an `ev` field naming the event,
//! plus `dur_ms` where a duration is meaningful.

use tracing_subscriber::EnvFilter;

/// Install the global JSON subscriber. Returns false if one was already installed.
pub fn init(directive: &str) -> bool {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        let _ = init("debug");
        assert!(!init("info"));
    }
}
