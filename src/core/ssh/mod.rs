mod client;

pub use client::{build_ssh_args, SshClient};

use crate::error::{Result, TargetDetails};
use crate::server::Server;
use std::io::Write;

/// One payload headed for one server.
pub struct RemoteRun<'a> {
    pub task: &'a str,
    pub script: &'a str,
    pub server: &'a Server,
    /// Environment exports followed by the script body.
    pub payload: &'a [u8],
}

impl RemoteRun<'_> {
    pub fn target(&self) -> TargetDetails {
        TargetDetails {
            task: self.task.to_string(),
            script: self.script.to_string(),
            user: self.server.user.clone(),
            address: self.server.address.clone(),
            port: self.server.effective_port(),
        }
    }
}

/// Transport that runs a payload on a remote host.
///
/// Implementations write the session's combined stdout and stderr to `out`
/// and report connection, launch and exit failures as errors. They are
/// shared across fan-out workers.
pub trait RemoteExecutor: Send + Sync {
    fn run(&self, run: &RemoteRun<'_>, out: &mut dyn Write) -> Result<()>;
}
