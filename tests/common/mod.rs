//! Shared utilities for integration tests.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Mutex;
use tracing_pretty_handler::config::HandlerConfig;
use tracing_pretty_handler::PrettyHandler;

static ANSI: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());

pub type BufferHandler = PrettyHandler<Mutex<Vec<u8>>>;

/// Root handler writing into memory, with terminal colors forced on.
pub fn pretty(config: HandlerConfig) -> BufferHandler {
    colored::control::set_override(true);
    PrettyHandler::new(config.with_writer(Mutex::new(Vec::new()))).unwrap()
}

/// Everything written so far, with color escapes removed.
pub fn output(handler: &BufferHandler) -> String {
    let bytes = handler.writer().lock().unwrap();
    strip_ansi(&String::from_utf8_lossy(&bytes))
}

pub fn strip_ansi(text: &str) -> String {
    ANSI.replace_all(text, "").into_owned()
}

/// Split output into `(header, attribute block)` pairs. Header lines are
/// the ones starting with `[`.
#[allow(dead_code)]
pub fn entries(output: &str) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = Vec::new();
    for line in output.lines() {
        if line.starts_with('[') {
            entries.push((line.to_string(), String::new()));
        } else if let Some((_, block)) = entries.last_mut() {
            block.push_str(line);
            block.push('\n');
        } else {
            panic!("attribute line before any header: {line:?}");
        }
    }
    entries
}

/// Message part of a stripped header line.
#[allow(dead_code)]
pub fn message(header: &str) -> &str {
    header.split_once(": ").map(|(_, m)| m).unwrap_or("")
}
