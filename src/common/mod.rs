//! Commonly used code.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

/// Commonly used command line arguments.
#[derive(Parser, Debug, Default)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Args {
    /// The `tracing` level corresponding to the verbosity flags.
    pub fn tracing_level(&self) -> tracing::Level {
        match self.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        }
    }
}

/// The version of `gifts` package.
#[cfg(not(test))]
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// This allows us to override the version to `0.0.0` in tests.
pub fn version() -> &'static str {
    #[cfg(test)]
    return "0.0.0";
    #[cfg(not(test))]
    return VERSION;
}

/// Split a comma-separated list, dropping empty items and surrounding whitespace.
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod test {
    use clap_verbosity_flag::Verbosity;
    use pretty_assertions::assert_eq;

    #[rstest::rstest]
    #[case(0, 0, tracing::Level::INFO)]
    #[case(1, 0, tracing::Level::DEBUG)]
    #[case(2, 0, tracing::Level::TRACE)]
    #[case(0, 1, tracing::Level::WARN)]
    fn tracing_level(#[case] verbose: u8, #[case] quiet: u8, #[case] expected: tracing::Level) {
        let args = super::Args {
            verbose: Verbosity::new(verbose, quiet),
        };
        assert_eq!(args.tracing_level(), expected);
    }

    #[test]
    fn split_list() {
        let items = super::split_list(" 1,2,, 3 ,").collect::<Vec<_>>();
        assert_eq!(items, vec!["1", "2", "3"]);
    }

    #[test]
    fn version_is_overridden() {
        assert_eq!(super::version(), "0.0.0");
    }
}
