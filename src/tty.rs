//! Terminal detection and coloring for CLI output.

use std::io::{self, IsTerminal};

const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

pub fn is_stderr_tty() -> bool {
    io::stderr().is_terminal()
}

/// Wrap `text` in red when `colored` is set.
pub fn red(text: &str, colored: bool) -> String {
    if colored {
        format!("{}{}{}", RED, text, RESET)
    } else {
        text.to_string()
    }
}
