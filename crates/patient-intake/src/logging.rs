//! Tracing setup for the `intake` binary and the test suite.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose events follow the command-line verbosity.
const LOG_TARGETS: &[&str] = &["patient_intake", "intake", "axum::rejection"];

/// How much the binary logs when `RUST_LOG` is unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// `--quiet`: errors only.
    Quiet,
    /// Registrations, server lifecycle and warnings.
    #[default]
    Normal,
    /// `-v`: adds rejected submissions and rule skips.
    Verbose,
    /// `-vv` or more: per-rule evaluation.
    Trace,
}

impl Verbosity {
    /// Map the `--quiet` flag and the `-v` count to a verbosity.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// The most detailed level emitted at this verbosity.
    #[must_use]
    pub fn level(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::ERROR,
            Self::Normal => LevelFilter::INFO,
            Self::Verbose => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }

    /// Filter directives used when `RUST_LOG` is unset.
    #[must_use]
    pub fn directives(self) -> String {
        let level = self.level();
        LOG_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `verbosity`.
///
/// ```no_run
/// use patient_intake::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(false, 1));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));

    // A second call keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Route warnings to the test harness output.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_to_verbosity() {
        assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, 5), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(true, 3), Verbosity::Quiet);
    }

    #[test]
    fn test_quiet_keeps_errors() {
        assert_eq!(Verbosity::Quiet.level(), LevelFilter::ERROR);
        assert_eq!(Verbosity::Trace.level(), LevelFilter::TRACE);
    }

    #[test]
    fn test_directives_cover_library_binary_and_extractors() {
        assert_eq!(
            Verbosity::Verbose.directives(),
            "patient_intake=debug,intake=debug,axum::rejection=debug"
        );
        assert!(EnvFilter::try_new(Verbosity::Normal.directives()).is_ok());
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        init_logging(Verbosity::Quiet);
        init_logging(Verbosity::Trace);
        init_test_logging();
    }
}
