use colored::*;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }
}

static DEBUG_MODE: AtomicBool = AtomicBool::new(false);
static JSON_OUTPUT: AtomicBool = AtomicBool::new(false);

pub fn set_debug_mode(enabled: bool) {
    DEBUG_MODE.store(enabled, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

pub fn set_json_output(enabled: bool) {
    JSON_OUTPUT.store(enabled, Ordering::Relaxed);
}

#[derive(Serialize)]
struct Event<'a> {
    level: &'a str,
    code: &'a str,
    message: &'a str,
}

fn colorize(level: Level, s: &str) -> String {
    match level {
        Level::Info => s.normal().to_string(),
        Level::Success => s.green().bold().to_string(),
        Level::Warn => s.yellow().bold().to_string(),
        Level::Error => s.red().bold().to_string(),
        Level::Debug => s.cyan().to_string(),
    }
}

/// Emit one status event. Errors and warnings go to stderr, everything else
/// to stdout; debug events are suppressed unless debug mode is on.
pub fn emit(level: Level, code: &str, message: &str) {
    if matches!(level, Level::Debug) && !is_debug_enabled() {
        return;
    }

    if JSON_OUTPUT.load(Ordering::Relaxed) {
        let event = Event {
            level: level.as_str(),
            code,
            message,
        };
        if let Ok(line) = serde_json::to_string(&event) {
            println!("{line}");
        }
        return;
    }

    match level {
        Level::Warn | Level::Error => {
            let _ = writeln!(io::stderr(), "{}", colorize(level, message));
        }
        _ => {
            println!("{}", colorize(level, message));
        }
    }
}
