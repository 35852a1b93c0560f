use garrison::command;
use garrison::config::ServerConfiguration;
use garrison::Error;
use std::io::{self, Write};

pub fn print_usage(program: &str, groups: &[ServerConfiguration]) -> Vec<Error> {
    write_stdout(&command::usage(program, groups))
}

pub fn print_completion(groups: &[ServerConfiguration]) -> Vec<Error> {
    let mut text = command::completion_tokens(groups).join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    write_stdout(&text)
}

fn write_stdout(text: &str) -> Vec<Error> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match handle.write_all(text.as_bytes()) {
        Ok(()) => Vec::new(),
        // Exit quietly when piped into `head` and friends.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Vec::new(),
        Err(e) => vec![Error::internal_unexpected(format!("couldn't write to stdout: {}", e))],
    }
}
