//! Error reporting and exit code mapping.

use crate::tty;
use garrison::Error;
use std::io::{self, Write};

const MARKER: &str = "✗";

/// Render one error as a marked line followed by its hints.
pub fn render_error(err: &Error, colored: bool) -> String {
    let mut text = format!("{} {}\n", tty::red(MARKER, colored), tty::red(&err.message, colored));
    for hint in &err.hints {
        text.push_str(&format!("  hint: {}\n", hint.message));
    }
    text
}

/// Print every error to stderr once all targets have been attempted.
pub fn print_errors(errors: &[Error]) {
    if errors.is_empty() {
        return;
    }

    let colored = tty::is_stderr_tty();
    let stderr = io::stderr();
    let mut handle = stderr.lock();
    for err in errors {
        if handle.write_all(render_error(err, colored).as_bytes()).is_err() {
            return;
        }
    }
}

/// The process exits with the number of collected errors.
pub fn exit_code_for_errors(errors: &[Error]) -> u8 {
    exit_code_to_u8(errors.len())
}

fn exit_code_to_u8(count: usize) -> u8 {
    if count >= 255 {
        255
    } else {
        count as u8
    }
}
