use std::{fs, panic, path::Path};

use anyhow::Result;
use backtrace::Backtrace;
use chrono::prelude::*;
use log::*;
use simplelog::{ColorChoice, CombinedLogger, SharedLogger, TermLogger, TerminalMode, WriteLogger};

mod augment;
mod classify;
mod config;
mod core;
mod error;
mod game;
mod interaction;
#[cfg(feature = "profile")]
mod profile;
mod report;
mod scan;
pub mod utils;

pub use augment::*;
pub use classify::*;
pub use config::Config;
pub use self::core::*;
pub use error::*;
pub use game::*;
pub use interaction::*;
pub use report::*;
pub use scan::*;

/// Handle panics by both logging and popping up a message box, which is the
/// most reliable way to make something visible to the end user.
pub fn handle_panics() {
    panic::set_hook(Box::new(|panic_info| {
        let mut message = String::new();
        if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            message.push_str(&format!("Rust panic: {s}"));
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            message.push_str(&format!("Rust panic: {s}"));
        } else {
            message.push_str(&format!("Rust panic: {:?}", panic_info.payload()));
        }
        if let Some(location) = panic_info.location() {
            message.push_str(&format!(" at {location}"));
        }

        message.push_str(&format!("\n{:?}", Backtrace::new()));

        error!("{}", message);
        message_box(message);
    }));
}

/// Displays a message box with the given message.
#[cfg(windows)]
pub fn message_box(message: impl Into<String>) {
    use windows::Win32::UI::WindowsAndMessaging::MessageBoxW;
    use windows::core::{HSTRING, w};

    unsafe {
        MessageBoxW(
            None,
            &HSTRING::from(message.into()),
            w!("Inkling Pets"),
            Default::default(),
        );
    }
}

/// Displays a message box with the given message.
///
/// There's no native dialog outside of Windows, so this writes to stderr,
/// which the mod loader's console usually captures.
#[cfg(not(windows))]
pub fn message_box(message: impl Into<String>) {
    eprintln!("Inkling Pets: {}", message.into());
}

/// Starts the logger which logs to both stdout and a file which users can send
/// to the devs for debugging.
///
/// The file logger accepts every level. Callers narrow what's actually written
/// with [log::set_max_level] once the configuration has been read.
pub fn start_logger() {
    // If there's an error locating the mod directory, try to log to the current
    // dir instead.
    if let Ok(dir) = utils::mod_directory() {
        let _ = start_logger_for_dir(dir);
        info!("Logger initialized.");
    } else {
        let _ = start_logger_for_dir(".");
        info!("Failed to determine mod directory, logging to current directory instead.");
    }
}

/// Starts a logger for the given directory.
fn start_logger_for_dir(dir: impl AsRef<Path>) -> Result<()> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Warn,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Ok(logger) = create_write_logger(dir) {
        loggers.push(logger);
    }
    CombinedLogger::init(loggers)?;
    Ok(())
}

/// Creates a write logger that writes to files in [dir].
fn create_write_logger(dir: impl AsRef<Path>) -> Result<Box<WriteLogger<fs::File>>> {
    let dir = dir.as_ref().join("log");
    fs::create_dir_all(&dir)?;
    let filename = dir.join(Local::now().format("inkling-pets-%Y-%m-%d.log").to_string());
    Ok(WriteLogger::new(
        LevelFilter::Trace,
        simplelog::Config::default(),
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(filename)?,
    ))
}
