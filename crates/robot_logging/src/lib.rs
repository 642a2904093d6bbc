#![deny(missing_docs)]
//! Shared logging utilities for the robot workspace.
//!
//! This crate provides the `robot_*` logging macros used across the codebase,
//! which all log under the [`CORE_TARGET`] target, plus initializers for the
//! global logger in applications and unit tests.

use std::fs::File;
use std::path::PathBuf;

use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

#[doc(hidden)]
pub use log;

pub use log::LevelFilter;

/// Log target shared by every `robot_*` macro.
///
/// Filter on this target to silence or isolate job engine output.
pub const CORE_TARGET: &str = "robot::core";

/// Logs a trace-level message under the robot target.
#[macro_export]
macro_rules! robot_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!(target: $crate::CORE_TARGET, $($arg)*);
    }};
}

/// Logs a debug-level message under the robot target.
#[macro_export]
macro_rules! robot_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!(target: $crate::CORE_TARGET, $($arg)*);
    }};
}

/// Logs an info-level message under the robot target.
#[macro_export]
macro_rules! robot_info {
    ($($arg:tt)*) => {{
        $crate::log::info!(target: $crate::CORE_TARGET, $($arg)*);
    }};
}

/// Logs a warn-level message under the robot target.
#[macro_export]
macro_rules! robot_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!(target: $crate::CORE_TARGET, $($arg)*);
    }};
}

/// Logs an error-level message under the robot target.
#[macro_export]
macro_rules! robot_error {
    ($($arg:tt)*) => {{
        $crate::log::error!(target: $crate::CORE_TARGET, $($arg)*);
    }};
}

/// Returns true when debug output for the robot target would be emitted.
///
/// Used to skip building expensive request dumps.
pub fn debug_enabled() -> bool {
    log::log_enabled!(target: CORE_TARGET, log::Level::Debug)
}

/// Destination for log output.
#[derive(Debug, Clone)]
pub enum LogDestination {
    /// Write to the given file, truncating it.
    File(PathBuf),
    /// Write to the terminal.
    Terminal,
    /// Write to both the terminal and the given file.
    Both(PathBuf),
}

/// Initializes the global logger for an application embedding the engine.
///
/// Does nothing if a logger is already installed. A log file that cannot be
/// created is reported on stderr and skipped.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File(path) => match create_file_logger(path, level, config) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Terminal => {
            vec![TermLogger::new(
                level,
                config,
                TerminalMode::Mixed,
                ColorChoice::Auto,
            )]
        }
        LogDestination::Both(path) => {
            let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
                level,
                config.clone(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            )];
            if let Some(file_logger) = create_file_logger(path, level, config) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    path: PathBuf,
    level: LevelFilter,
    config: Config,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(&path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", path, err);
            None
        }
    }
}
