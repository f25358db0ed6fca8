//! Logging setup for tests and debugging sessions.
//!
//! Devices log their trace traffic under short channel names (`bus` for
//! unmapped accesses, `gpu` for emitted quads) so a session can switch a
//! single device on: `V32_LOG=warn,gpu=trace`.
use std::io::Write;
use std::sync::Once;

use colored::*;
use log::Level;
use log::Record;

static ONCE_INIT: Once = Once::new();

/// A colored level letter, the device channel for non-module targets,
/// then the message.
fn format_record(buf: &mut env_logger::fmt::Formatter, record: &Record) -> std::io::Result<()> {
    let letter = match record.level() {
        Level::Error => "E".red().bold(),
        Level::Warn => "W".yellow().bold(),
        Level::Info => "I".blue().bold(),
        Level::Debug => "D".blue(),
        Level::Trace => "T".dimmed(),
    };
    let target = record.target();
    if target.contains("::") {
        // regular module-path targets carry no extra tag
        writeln!(buf, "{} {}", letter, record.args())
    } else {
        writeln!(buf, "{} [{}] {}", letter, target.cyan(), record.args())
    }
}

/// Configures logging once for the test binary. `V32_LOG` overrides the
/// default filter with env_logger's syntax.
pub fn test_init(verbose: bool) {
    ONCE_INIT.call_once(|| {
        let filter = std::env::var("V32_LOG")
            .unwrap_or_else(|_| if verbose { "info" } else { "warn" }.to_string());
        env_logger::builder()
            .parse_filters(&filter)
            .format(format_record)
            .is_test(true)
            .init();
    });
}
