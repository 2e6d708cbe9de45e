//! Log output for the `backfill` binary.
//!
//! Everything goes to stderr. Stdout carries only what the user asked for
//! (the `preview` script, run reports).

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter from `RUST_LOG`, else `fallback` for every target.
fn filter(fallback: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback.as_str()))
}

/// Install the global subscriber. Plain text, or one JSON object per line.
///
/// Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let lines = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter(level));

    let installed = if json {
        registry.with(lines.json()).try_init()
    } else {
        registry.with(lines).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_keeps_first_subscriber() {
        init_tracing(false, Level::DEBUG);
        init_tracing(true, Level::INFO);
        tracing::info!(run = "t", "still logging");
    }

    #[test]
    fn fallback_level_without_env() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(
                filter(Level::WARN).max_level_hint(),
                Some(tracing::level_filters::LevelFilter::WARN)
            );
        }
    }
}
