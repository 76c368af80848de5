use std::io::stderr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// environment variable holding a filter like `noteorg=debug`
pub const LOG_ENV: &str = "NOTEORG_LOG";

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "noteorg=warn",
        1 => "noteorg=info",
        2 => "noteorg=debug",
        _ => "noteorg=trace",
    }
}

/// Send log events to stderr, leaving stdout to command output.
///
/// `NOTEORG_LOG` wins over `verbosity` when it is set and valid. Calling
/// this twice is harmless.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| default_directive(verbosity).into());
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(stderr)
        .with_target(false);
    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(default_directive(0), "noteorg=warn");
        assert_eq!(default_directive(2), "noteorg=debug");
        assert_eq!(default_directive(9), "noteorg=trace");
    }

    #[test]
    fn init_twice_is_fine() {
        init(0);
        init(1);
    }
}
