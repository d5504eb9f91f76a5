use chrono::Local;
use env_logger::{Builder, Env, Target};
use log::Level;
use std::io::{IsTerminal, Write};

pub const DEFAULT_FILTER: &str = "info";

pub fn init_logger() {
    init_logger_with(DEFAULT_FILTER);
}

/// Logs go to stderr; stdout is reserved for the run report.
/// `RUST_LOG` overrides `default_filter`.
pub fn init_logger_with(default_filter: &str) {
    let colored = std::io::stderr().is_terminal();

    Builder::from_env(Env::default().default_filter_or(default_filter))
        .target(Target::Stderr)
        .format(move |buf, record| {
            let time = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let (start, end) = if colored {
                (level_color(record.level()), "\x1b[0m")
            } else {
                ("", "")
            };
            writeln!(
                buf,
                "{} {}{:<5}{} [{}:{}] {}",
                time,
                start,
                record.level(),
                end,
                record.module_path().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args(),
            )
        })
        .init();
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[31m\x1b[1m", // 红色
        Level::Warn => "\x1b[33m\x1b[1m",  // 黄色
        Level::Info => "\x1b[32m\x1b[1m",  // 绿色
        Level::Debug => "\x1b[36m\x1b[1m", // 青色
        Level::Trace => "\x1b[90m\x1b[1m", // 灰色
    }
}
