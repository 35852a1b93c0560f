use crate::error::{Error, Result};
use crate::server::Server;
use crate::task::Task;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Files looked up in the working directory, in order.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["garrison.json", "garrison.yml", "garrison.yaml"];

/// A named group of tasks and the servers they run on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfiguration {
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub servers: Vec<Server>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Some(Format::Json),
            Some("yml") | Some("yaml") => Some(Format::Yaml),
            _ => None,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load groups from `explicit`, or from the first default file found in the
/// working directory.
pub fn load(explicit: Option<&Path>) -> Result<Vec<ServerConfiguration>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| Error::config_unreadable(None, e.to_string()))?;
            discover(&cwd)?
        }
    };
    load_file(&path)
}

/// First default configuration file present in `dir`.
pub fn discover(dir: &Path) -> Result<PathBuf> {
    DEFAULT_CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| Error::config_not_found(DEFAULT_CONFIG_FILES))
}

pub fn load_file(path: &Path) -> Result<Vec<ServerConfiguration>> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::config_unreadable(Some(display.clone()), e.to_string()))?;

    let groups = parse(&content, Format::from_path(path), &display)?;
    log_status!("config", "Loaded {} group(s) from {}", groups.len(), display);
    Ok(groups)
}

/// Decode configuration text. Without a known format, JSON is tried first and
/// the YAML error is reported if both fail.
pub fn from_str(content: &str, path: &str) -> Result<Vec<ServerConfiguration>> {
    parse(content, Format::from_path(Path::new(path)), path)
}

fn parse(content: &str, format: Option<Format>, path: &str) -> Result<Vec<ServerConfiguration>> {
    match format {
        Some(Format::Json) => decode_json(content, path),
        Some(Format::Yaml) => decode_yaml(content, path),
        None => decode_json(content, path).or_else(|_| decode_yaml(content, path)),
    }
}

fn decode_json<T: DeserializeOwned>(content: &str, path: &str) -> Result<T> {
    serde_json::from_str(content).map_err(|e| Error::config_malformed(path, e.to_string()))
}

fn decode_yaml<T: DeserializeOwned>(content: &str, path: &str) -> Result<T> {
    serde_yml::from_str(content).map_err(|e| Error::config_malformed(path, e.to_string()))
}
