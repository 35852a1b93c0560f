// Public modules
pub mod command;
pub mod config;
pub mod error;
pub mod server;
pub mod sink;
pub mod ssh;
pub mod task;

// Re-export common types for convenience
pub use command::{resolve, Resolved};
pub use config::ServerConfiguration;
pub use error::{Error, ErrorCode, Result};
pub use server::Server;
pub use sink::{OutputSink, SharedStream};
pub use ssh::{RemoteExecutor, SshClient};
pub use task::{ParameterSource, Runner, Task};
