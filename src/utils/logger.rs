use colored::Colorize;
use env_logger::{Builder, Target};
use log::{Level, LevelFilter};
use std::io::Write;

/// One formatted log line. Warnings and errors name the pipeline thread that raised them
/// (`scanner-3`, `reader-0`, ...), falling back to the module path on unnamed threads.
fn format_line(level: Level, thread: Option<&str>, target: &str, message: &str) -> String {
    let name = env!("CARGO_PKG_NAME").cyan();
    match level {
        Level::Error | Level::Warn => {
            let level_str = if level == Level::Error {
                "ERROR".red()
            } else {
                "WARN".yellow()
            };
            let origin = thread.filter(|t| *t != "main").unwrap_or(target).white();
            format!("[{} {} {}] {}", name, level_str, origin, message)
        }
        Level::Debug | Level::Trace => format!("[{}] {}", name, message.dimmed()),
        Level::Info => format!("[{}] {}", name, message),
    }
}

/// Install the stderr logger. The archive may go to stdout, so log lines never do.
pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::from_default_env()
        .target(Target::Stderr)
        .filter_level(LevelFilter::Warn) // dependencies: warnings only
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .format(|buf, record| {
            let thread = std::thread::current();
            let line = format_line(
                record.level(),
                thread.name(),
                record.target(),
                &record.args().to_string(),
            );
            writeln!(buf, "{}", line)
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_names_worker_thread() {
        colored::control::set_override(false);
        let line = format_line(
            Level::Warn,
            Some("reader-2"),
            "packstream::pipeline::reader",
            "file open error",
        );
        assert_eq!(line, "[packstream WARN reader-2] file open error");
    }

    #[test]
    fn test_main_thread_falls_back_to_target() {
        colored::control::set_override(false);
        let line = format_line(Level::Error, Some("main"), "packstream::archive", "boom");
        assert_eq!(line, "[packstream ERROR packstream::archive] boom");
    }
}
