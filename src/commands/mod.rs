use garrison::config::{self, ServerConfiguration};
use garrison::Error;
use std::path::PathBuf;

pub mod list;
pub mod run;

pub(crate) struct GlobalArgs {
    /// Explicit configuration file; the working directory is searched when unset.
    pub config: Option<PathBuf>,
    /// Name the binary was invoked as, for the usage line.
    pub program: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    List,
    Completion,
    Run(String),
}

/// Run one CLI action and return every error it collected.
///
/// Configuration problems stop everything before any target is attempted.
pub(crate) fn run(action: Action, global: &GlobalArgs) -> Vec<Error> {
    let groups = match load_groups(global) {
        Ok(groups) => groups,
        Err(err) => return vec![err],
    };

    match action {
        Action::List => list::print_usage(&global.program, &groups),
        Action::Completion => list::print_completion(&groups),
        Action::Run(token) => run::execute(&token, &groups),
    }
}

fn load_groups(global: &GlobalArgs) -> garrison::Result<Vec<ServerConfiguration>> {
    config::load(global.config.as_deref())
}
