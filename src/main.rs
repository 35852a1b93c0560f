use clap::Parser;
use std::path::PathBuf;

mod commands;
mod output;
mod tty;

use commands::{Action, GlobalArgs};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "garrison")]
#[command(version = VERSION)]
#[command(about = "Run deployment scripts across groups of servers over ssh")]
struct Cli {
    /// Command to run: group:task, group:<index>:task or group:<address>:task.
    /// Omit to list the available commands.
    command: Option<String>,

    /// Print every valid command, one per line (for shell completion).
    /// A trailing word is accepted and ignored.
    #[arg(long, hide = true)]
    completion_help: bool,

    /// Configuration file (default: garrison.json, garrison.yml or garrison.yaml
    /// in the current directory)
    #[arg(short, long, value_name = "PATH", env = "GARRISON_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    fn action(&self) -> Action {
        match (&self.command, self.completion_help) {
            (_, true) => Action::Completion,
            (Some(token), false) => Action::Run(token.clone()),
            (None, false) => Action::List,
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs {
        config: cli.config.clone(),
        program: std::env::args()
            .next()
            .unwrap_or_else(|| "garrison".to_string()),
    };

    let errors = commands::run(cli.action(), &global);
    output::print_errors(&errors);

    std::process::ExitCode::from(output::exit_code_for_errors(&errors))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("valid arguments")
    }

    #[test]
    fn bare_invocation_lists_commands() {
        assert_eq!(parse(&["garrison"]).action(), Action::List);
    }

    #[test]
    fn positional_token_runs_it() {
        assert_eq!(
            parse(&["garrison", "web:0:deploy"]).action(),
            Action::Run("web:0:deploy".to_string())
        );
    }

    #[test]
    fn completion_flag_wins() {
        assert_eq!(
            parse(&["garrison", "--completion-help"]).action(),
            Action::Completion
        );
    }

    #[test]
    fn completion_flag_ignores_a_trailing_word() {
        assert_eq!(
            parse(&["garrison", "--completion-help", "web:de"]).action(),
            Action::Completion
        );
    }

    #[test]
    fn config_path_is_accepted_before_token() {
        let cli = parse(&["garrison", "--config", "deploy/garrison.yml", "web:deploy"]);
        assert_eq!(cli.config, Some(PathBuf::from("deploy/garrison.yml")));
    }
}
