use crate::error::{Error, Result};
use crate::server::Server;
use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;

use super::{RemoteExecutor, RemoteRun};

/// Runs payloads through the system `ssh` binary.
///
/// The payload is fed on stdin to a non-interactive session (`-T`), so the
/// remote login shell executes it line by line. Host key checking is off and
/// no timeouts are set: a stalled session blocks until ssh gives up.
pub struct SshClient {
    program: String,
    leading_args: Vec<String>,
}

impl SshClient {
    pub fn new() -> Self {
        Self::with_program("ssh", Vec::<String>::new())
    }

    /// Use another ssh-compatible command. It is invoked with `leading_args`
    /// followed by the usual ssh arguments.
    pub fn with_program<I, S>(program: impl Into<String>, leading_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            leading_args: leading_args.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for SshClient {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_ssh_args(server: &Server) -> Vec<String> {
    let mut args = vec![
        "-T".to_string(),
        "-o".to_string(),
        "StrictHostKeyChecking=no".to_string(),
        "-p".to_string(),
        server.effective_port().to_string(),
    ];

    if let Some(identity_file) = server.identity_path() {
        args.push("-i".to_string());
        args.push(identity_file);
    }

    args.push(server.destination());
    args
}

impl RemoteExecutor for SshClient {
    fn run(&self, run: &RemoteRun<'_>, out: &mut dyn Write) -> Result<()> {
        let args = build_ssh_args(run.server);

        // stdout and stderr share one pipe so the sink sees them in the order
        // ssh produced them.
        let (mut reader, writer) = io::pipe()
            .map_err(|e| Error::connection_setup_failed(run.target(), e.to_string()))?;
        let stderr_writer = writer
            .try_clone()
            .map_err(|e| Error::connection_setup_failed(run.target(), e.to_string()))?;

        // The Command holds the write ends; it must be gone before we read to EOF.
        let mut child = Command::new(&self.program)
            .args(&self.leading_args)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(writer)
            .stderr(stderr_writer)
            .spawn()
            .map_err(|e| {
                Error::launch_failed(run.target(), format!("{}: {}", self.program, e))
            })?;

        let Some(stdin) = child.stdin.take() else {
            reap(&mut child);
            return Err(Error::connection_setup_failed(
                run.target(),
                "ssh stdin was not captured",
            ));
        };

        let (forwarded, fed) = thread::scope(|scope| {
            let feeder = scope.spawn(move || feed(stdin, run.payload));
            let forwarded = forward(&mut reader, out);
            if forwarded.is_err() {
                // Nothing drains ssh any more, so it would stop reading stdin
                // and leave the feeder blocked on a full pipe.
                let _ = child.kill();
            }
            let fed = feeder
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin feeder panicked")));
            (forwarded, fed)
        });

        if let Err(e) = forwarded {
            reap(&mut child);
            return Err(Error::remote_execution_failed(
                run.target(),
                None,
                format!("couldn't forward output: {}", e),
            ));
        }

        let status = child
            .wait()
            .map_err(|e| Error::remote_execution_failed(run.target(), None, e.to_string()))?;

        if !status.success() {
            return Err(Error::remote_execution_failed(
                run.target(),
                status.code(),
                status.to_string(),
            ));
        }

        // A clean exit with a truncated payload still means the script did not run in full.
        if let Err(e) = fed {
            return Err(Error::remote_execution_failed(
                run.target(),
                status.code(),
                format!("couldn't send script to ssh: {}", e),
            ));
        }

        Ok(())
    }
}

/// Write the payload and close stdin so the remote shell sees end of input.
fn feed(mut stdin: ChildStdin, payload: &[u8]) -> io::Result<()> {
    match stdin.write_all(payload) {
        // ssh exited before reading everything; its exit status tells the story.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

fn forward(reader: &mut impl Read, out: &mut dyn Write) -> io::Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        out.write_all(&chunk[..n])?;
    }
    out.flush()
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
