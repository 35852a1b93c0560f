use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigUnreadable,
    ConfigMalformed,

    CommandNotFound,

    ScriptUnreadable,
    MissingRequiredParameter,

    ConnectionSetupFailed,
    LaunchFailed,
    RemoteExecutionFailed,

    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigUnreadable => "config.unreadable",
            ErrorCode::ConfigMalformed => "config.malformed",

            ErrorCode::CommandNotFound => "command.not_found",

            ErrorCode::ScriptUnreadable => "task.script_unreadable",
            ErrorCode::MissingRequiredParameter => "task.missing_parameter",

            ErrorCode::ConnectionSetupFailed => "remote.connection_setup_failed",
            ErrorCode::LaunchFailed => "remote.launch_failed",
            ErrorCode::RemoteExecutionFailed => "remote.execution_failed",

            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }

    /// Fatal errors stop the run before any target is attempted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ErrorCode::ConfigUnreadable | ErrorCode::ConfigMalformed | ErrorCode::CommandNotFound
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPathDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandNotFoundDetails {
    pub command: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptUnreadableDetails {
    pub task: String,
    pub script: String,
    pub address: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingParameterDetails {
    pub task: String,
    pub parameter: String,
    pub address: String,
}

/// Identifies the target a remote failure happened on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDetails {
    pub task: String,
    pub script: String,
    pub user: String,
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFailureDetails {
    pub target: TargetDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub diagnostic: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn config_unreadable(path: Option<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        let message = match &path {
            Some(path) => format!("Couldn't read configuration file '{}': {}", path, error),
            None => error.clone(),
        };
        Self::new(
            ErrorCode::ConfigUnreadable,
            message,
            to_details(ConfigPathDetails { path, error }),
        )
    }

    pub fn config_not_found(candidates: &[&str]) -> Self {
        Self::config_unreadable(
            None,
            format!(
                "Couldn't find a configuration file (looked for {})",
                candidates.join(", ")
            ),
        )
        .with_hint("Create a garrison.json or garrison.yml listing your groups, tasks and servers")
        .with_hint("Or point at a file with --config <PATH>")
    }

    pub fn config_malformed(path: impl Into<String>, error: impl Into<String>) -> Self {
        let path = path.into();
        let error = error.into();
        Self::new(
            ErrorCode::ConfigMalformed,
            format!("Couldn't decode '{}': {}", path, error),
            to_details(ConfigPathDetails {
                path: Some(path),
                error,
            }),
        )
    }

    pub fn command_not_found(command: impl Into<String>) -> Self {
        let command = command.into();
        Self::new(
            ErrorCode::CommandNotFound,
            format!("Couldn't find the command '{}'", command),
            to_details(CommandNotFoundDetails { command }),
        )
        .with_hint("Run 'garrison' without arguments to list available commands")
    }

    pub fn script_unreadable(
        task: impl Into<String>,
        script: impl Into<String>,
        address: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let details = ScriptUnreadableDetails {
            task: task.into(),
            script: script.into(),
            address: address.into(),
            error: error.into(),
        };
        Self::new(
            ErrorCode::ScriptUnreadable,
            format!(
                "Couldn't read script '{}' for '{}': {}",
                details.script, details.address, details.error
            ),
            to_details(details),
        )
    }

    pub fn missing_required_parameter(
        task: impl Into<String>,
        parameter: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        let details = MissingParameterDetails {
            task: task.into(),
            parameter: parameter.into(),
            address: address.into(),
        };
        Self::new(
            ErrorCode::MissingRequiredParameter,
            format!(
                "Environment variable '{}' is required by task '{}' but is not set",
                details.parameter, details.task
            ),
            to_details(details),
        )
        .with_hint("Export the variable before running garrison")
    }

    pub fn connection_setup_failed(target: TargetDetails, diagnostic: impl Into<String>) -> Self {
        Self::remote(
            ErrorCode::ConnectionSetupFailed,
            "Couldn't open an input channel to ssh for",
            target,
            None,
            diagnostic.into(),
        )
    }

    pub fn launch_failed(target: TargetDetails, diagnostic: impl Into<String>) -> Self {
        Self::remote(
            ErrorCode::LaunchFailed,
            "Couldn't launch ssh for",
            target,
            None,
            diagnostic.into(),
        )
    }

    pub fn remote_execution_failed(
        target: TargetDetails,
        exit_code: Option<i32>,
        diagnostic: impl Into<String>,
    ) -> Self {
        Self::remote(
            ErrorCode::RemoteExecutionFailed,
            "Problems running",
            target,
            exit_code,
            diagnostic.into(),
        )
    }

    fn remote(
        code: ErrorCode,
        lead: &str,
        target: TargetDetails,
        exit_code: Option<i32>,
        diagnostic: String,
    ) -> Self {
        let message = format!(
            "{} '{}' on '{}': {}",
            lead, target.script, target.address, diagnostic
        );
        Self::new(
            code,
            message,
            to_details(RemoteFailureDetails {
                target,
                exit_code,
                diagnostic,
            }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        let error = error.into();
        Self::new(
            ErrorCode::InternalUnexpected,
            format!("Unexpected error: {}", error),
            serde_json::json!({ "error": error }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
