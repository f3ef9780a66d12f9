//! Log output for the binary.
//!
//! The library only emits `tracing` events; the binary installs a subscriber
//! writing to stderr so command output on stdout stays parseable.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter directive for the given `-v` count, or `configured` when none.
#[must_use]
pub fn filter_directive(verbosity: u8, configured: &str) -> String {
    match verbosity {
        0 => configured.to_string(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over everything else. A second call is ignored.
pub fn init(verbosity: u8, configured: &str) {
    let directive = filter_directive(verbosity, configured);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive(0, "notify=debug"), "notify=debug");
        assert_eq!(filter_directive(1, "warn"), "info");
        assert_eq!(filter_directive(2, "warn"), "debug");
        assert_eq!(filter_directive(7, "warn"), "trace");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(0, "warn");
        init(2, "warn");
    }
}
