use garrison::command;
use garrison::config::ServerConfiguration;
use garrison::{Error, Runner, SharedStream, SshClient};

/// Resolve `token` and run its task over ssh on every selected server.
pub fn execute(token: &str, groups: &[ServerConfiguration]) -> Vec<Error> {
    let resolved = match command::resolve(token, groups) {
        Ok(resolved) => resolved,
        Err(err) => return vec![err],
    };

    let client = SshClient::new();
    let runner = Runner::new(&client, SharedStream::stdout());
    let errors = resolved.task.execute_on_servers(&resolved.servers, &runner);

    log_summary(token, resolved.servers.len(), errors.len());
    errors
}

fn log_summary(token: &str, total: usize, failed: usize) {
    if failed == 0 {
        garrison::log_status!("run", "'{}' succeeded on {} server(s)", token, total);
    } else {
        garrison::log_status!(
            "run",
            "'{}' failed on {} of {} server(s)",
            token,
            failed,
            total
        );
    }
}
