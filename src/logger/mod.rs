//! Logger module
//!
//! Provides logging utilities for the router including:
//! - Server lifecycle logging (route table, listen address)
//! - Access logging with multiple formats
//! - Error and warning logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::{AccessLogEntry, AccessLogFormat};
pub use writer::Level;

use crate::config::{Config, LoggingConfig};
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    writer::init(
        Level::parse(&config.level),
        config.access_log_file.as_deref(),
        config.error_log_file.as_deref(),
    )
}

fn write(level: Level, message: &str) {
    match writer::get() {
        Some(writer) => writer.write(level, message),
        None if level <= Level::Warn => eprintln!("{message}"),
        None if level == Level::Info => println!("{message}"),
        None => {}
    }
}

pub fn log_info(message: &str) {
    write(Level::Info, message);
}

pub fn log_debug(message: &str) {
    write(Level::Debug, &format!("[DEBUG] {message}"));
}

pub fn log_warning(message: &str) {
    write(Level::Warn, &format!("[WARN] {message}"));
}

pub fn log_error(message: &str) {
    write(Level::Error, &format!("[ERROR] {message}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    log_error(&format!("Failed to serve connection: {err:?}"));
}

/// Startup banner: the registered route table, then the listen address
pub fn log_server_start<'a>(
    addr: &SocketAddr,
    config: &Config,
    routes: impl IntoIterator<Item = &'a str>,
) {
    log_info("[Routes]");
    for route in routes {
        log_info(&format!("  GET {route}"));
    }
    log_info(&format!(
        "[Config] timeout: {}ms, charset: {}, gzip: {}",
        config.server.timeout, config.server.charset, config.server.gzip
    ));
    log_info(&format!("Server running at http://{addr}/"));
}

/// Write a formatted access log line
pub fn log_access(entry: &AccessLogEntry, format: &AccessLogFormat) {
    let line = entry.format(format);
    match writer::get() {
        Some(writer) => writer.write_access(&line),
        None => println!("{line}"),
    }
}
