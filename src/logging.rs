//! Log output for the CLI.
//!
//! Everything goes to stderr. Rendered HTML is written to stdout, so piping
//! `carmo-cover render` into a file never captures log lines.

use std::io::{self, IsTerminal};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "carmo_cover=error";
    }
    match verbose {
        0 => "carmo_cover=info",
        1 => "carmo_cover=debug",
        _ => "carmo_cover=trace",
    }
}

/// How log lines are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

/// Pick the layout for `json` mode and whether stderr is a terminal.
///
/// | Mode | TTY | Output |
/// |------|-----|--------|
/// | `json` | any | JSON lines |
/// | human | yes | pretty, colored |
/// | human | no | compact, plain |
pub fn log_format(json: bool, is_terminal: bool) -> LogFormat {
    match (json, is_terminal) {
        (true, _) => LogFormat::Json,
        (false, true) => LogFormat::Pretty,
        (false, false) => LogFormat::Compact,
    }
}

/// Install the global subscriber, formatted per [`log_format`].
///
/// `RUST_LOG` overrides the verbosity flags.
pub fn init_logging(json: bool, verbose: u8, quiet: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    match log_format(json, io::stderr().is_terminal()) {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .with_span_events(FmtSpan::NONE)
                .with_writer(io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_target(false)
                .with_span_events(FmtSpan::NONE)
                .with_writer(io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_span_events(FmtSpan::NONE)
                .compact()
                .with_writer(io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
        }
    }
}
