use serde::{Deserialize, Serialize};

pub const DEFAULT_SSH_PORT: u16 = 22;

/// One remote target. A configuration may list the same address more than
/// once; each entry is a distinct target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub user: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,
}

impl Server {
    pub fn new(user: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            address: address.into(),
            port: None,
            identity_file: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_identity_file(mut self, path: impl Into<String>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    /// Port 0 and an absent port both mean the ssh default.
    pub fn effective_port(&self) -> u16 {
        match self.port {
            Some(port) if port != 0 => port,
            _ => DEFAULT_SSH_PORT,
        }
    }

    /// `user@address` destination for ssh.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.address)
    }

    /// Identity file with a leading `~` expanded, or `None` when unset or empty.
    pub fn identity_path(&self) -> Option<String> {
        match &self.identity_file {
            Some(path) if !path.is_empty() => Some(shellexpand::tilde(path).to_string()),
            _ => None,
        }
    }
}
