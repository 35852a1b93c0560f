use crate::error::{Error, Result};
use crate::server::Server;
use crate::sink::{OutputSink, SharedStream};
use crate::ssh::{RemoteExecutor, RemoteRun};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::thread;

/// A named script plus the policy for running it across a group's servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    /// Local path of the script; read fresh for every target.
    pub script: String,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Names of process environment variables that must be set and non-empty.
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub merged_output: bool,
}

/// Where required task parameters are looked up.
#[derive(Debug, Clone, Default)]
pub enum ParameterSource {
    #[default]
    Process,
    Fixed(HashMap<String, String>),
}

impl ParameterSource {
    pub fn fixed<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        ParameterSource::Fixed(
            values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Absent, empty and non-UTF-8 values all count as missing.
    pub fn lookup(&self, name: &str) -> Option<String> {
        let value = match self {
            ParameterSource::Process => std::env::var(name).ok(),
            ParameterSource::Fixed(values) => values.get(name).cloned(),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Everything a task run needs besides the task and its targets.
pub struct Runner<'a> {
    executor: &'a dyn RemoteExecutor,
    out: SharedStream,
    parameters: ParameterSource,
}

impl<'a> Runner<'a> {
    pub fn new(executor: &'a dyn RemoteExecutor, out: SharedStream) -> Self {
        Self {
            executor,
            out,
            parameters: ParameterSource::Process,
        }
    }

    pub fn with_parameters(mut self, parameters: ParameterSource) -> Self {
        self.parameters = parameters;
        self
    }

    fn announce(&self, task: &Task, server: &Server) {
        let line = format!("Executing {:?} on {:?}", task.script, server.address);
        // Best-effort: a lost announcement never skips the target.
        let _ = self.out.status_line(&line);
    }
}

impl Task {
    pub fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            parallel: false,
            environment: BTreeMap::new(),
            parameters: Vec::new(),
            merged_output: false,
        }
    }

    /// True when a run over `targets` servers fans out concurrently.
    pub fn runs_concurrently(&self, targets: usize) -> bool {
        self.parallel && targets > 1
    }

    /// Run against one server, writing its combined output to `out`.
    pub fn execute(&self, server: &Server, runner: &Runner<'_>, out: &mut dyn Write) -> Result<()> {
        let script = std::fs::read(&self.script).map_err(|e| {
            Error::script_unreadable(&self.name, &self.script, &server.address, e.to_string())
        })?;
        let payload = self.build_payload(&script, server, &runner.parameters)?;

        runner.executor.run(
            &RemoteRun {
                task: &self.name,
                script: &self.script,
                server,
                payload: &payload,
            },
            out,
        )
    }

    /// Environment exports, then required parameters, then the script body.
    ///
    /// Fails on the first missing parameter, before anything reaches the
    /// remote side.
    pub fn build_payload(
        &self,
        script: &[u8],
        server: &Server,
        parameters: &ParameterSource,
    ) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(script.len() + 64);

        for (name, value) in &self.environment {
            push_export(&mut payload, name, value);
        }

        for name in &self.parameters {
            let value = parameters.lookup(name).ok_or_else(|| {
                Error::missing_required_parameter(&self.name, name, &server.address)
            })?;
            push_export(&mut payload, name, &value);
        }

        payload.extend_from_slice(script);
        Ok(payload)
    }

    /// Run against every server and return every failure.
    ///
    /// No target is skipped because another failed. Sequential runs report
    /// errors in server order; concurrent runs report them in the same order
    /// as well, since workers are joined in spawn order.
    pub fn execute_on_servers(&self, servers: &[Server], runner: &Runner<'_>) -> Vec<Error> {
        if self.runs_concurrently(servers.len()) {
            log_status!(
                "run",
                "Running '{}' on {} servers in parallel",
                self.name,
                servers.len()
            );
            self.execute_concurrently(servers, runner)
        } else {
            self.execute_sequentially(servers, runner)
        }
    }

    fn execute_sequentially(&self, servers: &[Server], runner: &Runner<'_>) -> Vec<Error> {
        let mut errors = Vec::new();
        for server in servers {
            runner.announce(self, server);
            if let Err(err) = self.execute_on_target(server, runner, false) {
                errors.push(err);
            }
        }
        errors
    }

    fn execute_concurrently(&self, servers: &[Server], runner: &Runner<'_>) -> Vec<Error> {
        // Every announcement lands before any worker can flush output.
        for server in servers {
            runner.announce(self, server);
        }

        thread::scope(|scope| {
            let handles: Vec<_> = servers
                .iter()
                .map(|server| {
                    let handle = scope.spawn(move || self.execute_on_target(server, runner, true));
                    (server, handle)
                })
                .collect();

            handles
                .into_iter()
                .filter_map(|(server, handle)| match handle.join() {
                    Ok(result) => result.err(),
                    Err(_) => Some(Error::internal_unexpected(format!(
                        "worker running '{}' on '{}' panicked",
                        self.script, server.address
                    ))),
                })
                .collect()
        })
    }

    /// One target with its own sink. The sink is released whether the run
    /// succeeds, fails or unwinds.
    fn execute_on_target(&self, server: &Server, runner: &Runner<'_>, concurrent: bool) -> Result<()> {
        let mut sink = OutputSink::for_run(&runner.out, concurrent, self.merged_output);
        let result = self.execute(server, runner, &mut sink);
        let released = sink.finish();

        result?;
        released.map_err(|e| {
            Error::internal_unexpected(format!(
                "couldn't write output of '{}' on '{}': {}",
                self.script, server.address, e
            ))
        })
    }
}

fn push_export(payload: &mut Vec<u8>, name: &str, value: &str) {
    payload.extend_from_slice(format!("export {}=\"{}\"\n", name, value).as_bytes());
}
