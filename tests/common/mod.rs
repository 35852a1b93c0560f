#![allow(dead_code)]

use garrison::ssh::{RemoteExecutor, RemoteRun};
use garrison::{Error, Result, Server, SharedStream, Task};
use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

/// Stand-in for ssh. Writes `lines` numbered lines per target, pausing
/// between them so concurrent targets overlap, and fails selected addresses.
pub struct ScriptedExecutor {
    lines: usize,
    pause: Duration,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    wait_for: usize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new(lines: usize) -> Self {
        Self {
            lines,
            pause: Duration::from_millis(2),
            failing: HashSet::new(),
            panicking: HashSet::new(),
            wait_for: 0,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing<I: IntoIterator<Item = S>, S: Into<String>>(mut self, addresses: I) -> Self {
        self.failing = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn panicking(mut self, address: &str) -> Self {
        self.panicking.insert(address.to_string());
        self
    }

    /// Hold each run until `peers` runs are in flight at once (or a second passes).
    pub fn waiting_for(mut self, peers: usize) -> Self {
        self.wait_for = peers;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl RemoteExecutor for ScriptedExecutor {
    fn run(&self, run: &RemoteRun<'_>, out: &mut dyn Write) -> Result<()> {
        let address = run.server.address.clone();
        self.calls.lock().unwrap().push(address.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let deadline = Instant::now() + Duration::from_secs(1);
        while self.in_flight.load(Ordering::SeqCst) < self.wait_for && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        self.max_in_flight
            .fetch_max(self.in_flight.load(Ordering::SeqCst), Ordering::SeqCst);

        for line in 0..self.lines {
            write!(out, "{} ", address).unwrap();
            thread::sleep(self.pause);
            writeln!(out, "line {}", line).unwrap();
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.contains(&address) {
            panic!("scripted panic on {}", address);
        }
        if self.failing.contains(&address) {
            return Err(Error::remote_execution_failed(
                run.target(),
                Some(1),
                "exit status: 1",
            ));
        }
        Ok(())
    }
}

/// In-memory stream target, cloneable so a test can read back what a run
/// wrote.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream(&self) -> SharedStream {
        SharedStream::new(self.clone())
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn script_file(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn task(script: &NamedTempFile, parallel: bool) -> Task {
    let mut task = Task::new("deploy", script.path().to_string_lossy().to_string());
    task.parallel = parallel;
    task
}

pub fn servers(count: usize) -> Vec<Server> {
    (0..count)
        .map(|i| Server::new("root", format!("10.0.0.{}", i)))
        .collect()
}

pub fn address_of(err: &Error) -> String {
    err.details["target"]["address"]
        .as_str()
        .or_else(|| err.details["address"].as_str())
        .unwrap_or_default()
        .to_string()
}

/// Split captured output into runs of consecutive lines from the same address.
pub fn blocks(output: &str) -> Vec<(String, usize)> {
    let mut blocks: Vec<(String, usize)> = Vec::new();
    for line in output.lines().filter(|l| !l.starts_with("Executing")) {
        let address = line.split(' ').next().unwrap_or_default().to_string();
        match blocks.last_mut() {
            Some((last, count)) if *last == address => *count += 1,
            _ => blocks.push((address, 1)),
        }
    }
    blocks
}
