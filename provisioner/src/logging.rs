//! Diagnostic tracing for the provisioner.
//!
//! Tracing is for debugging stage decisions and child-process invocations.
//! What the operator is meant to read (stage banners, warnings, the usage
//! summary) goes through [`crate::io::terminal`] and is printed regardless of
//! the filter configured here.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Map the CLI `-v` count to a default filter directive.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "warn,provisioner=info",
        _ => "warn,provisioner=debug",
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the filter comes from `verbosity`.
/// Output goes to stderr in compact format so it never interleaves with the
/// summary on stdout.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_crate_level_only() {
        assert_eq!(default_directive(0), "warn");
        assert!(default_directive(1).ends_with("provisioner=info"));
        assert!(default_directive(5).ends_with("provisioner=debug"));
    }
}
