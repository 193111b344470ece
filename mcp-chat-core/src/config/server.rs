use super::error::ConfigError;
use super::loader::expand;
use crate::domain::ServerDescriptor;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ServerStoreError {
    #[error("server with name \"{name}\" already exists")]
    DuplicateName { name: String },
    #[error("invalid URL format: {url} ({message})")]
    InvalidUrl { url: String, message: String },
    #[error("server \"{name}\" not found")]
    NotFound { name: String },
    #[error(transparent)]
    Persist(#[from] ConfigError),
}

/// On-disk shape of the server list.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ServersFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_server: Option<String>,
    #[serde(default)]
    servers: Vec<RawServer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawServer {
    name: String,
    url: String,
}

/// The configured MCP servers, optionally persisted to a TOML file.
///
/// Names are unique. The first server added becomes the default; removing
/// the default promotes the first remaining server.
#[derive(Debug, Clone, Default)]
pub struct ServerStore {
    servers: Vec<RawServer>,
    default_name: Option<String>,
    path: Option<PathBuf>,
}

impl ServerStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store backed by `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let file = match fs::read_to_string(&path) {
            Ok(content) => toml::from_str::<ServersFile>(&content).map_err(|source| {
                ConfigError::Parse {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No server list yet");
                ServersFile::default()
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        // URLs stay unexpanded so `$VAR` references survive the next save.
        let mut servers: Vec<RawServer> = Vec::with_capacity(file.servers.len());
        for raw in file.servers {
            if servers.iter().any(|server| server.name == raw.name) {
                warn!(
                    path = %path.display(),
                    server = %raw.name,
                    "Duplicate server name in server list, keeping the first entry"
                );
                continue;
            }
            servers.push(raw);
        }
        let default_name = file
            .default_server
            .filter(|name| servers.iter().any(|server| &server.name == name));

        info!(path = %path.display(), servers = servers.len(), "Loaded MCP server list");
        Ok(Self {
            servers,
            default_name,
            path: Some(path),
        })
    }

    /// Open the file store when a path is configured, else an in-memory one.
    pub fn from_config_path(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::open(path),
            None => Ok(Self::in_memory()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Servers in insertion order, with the default flagged.
    pub fn list(&self) -> Vec<ServerDescriptor> {
        self.servers.iter().map(|raw| self.describe(raw)).collect()
    }

    pub fn get(&self, name: &str) -> Option<ServerDescriptor> {
        self.servers
            .iter()
            .find(|raw| raw.name == name)
            .map(|raw| self.describe(raw))
    }

    pub fn default_server(&self) -> Option<ServerDescriptor> {
        self.default_name.as_deref().and_then(|name| self.get(name))
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn add(&mut self, name: &str, url: &str) -> Result<ServerDescriptor, ServerStoreError> {
        let name = name.trim();
        let url = url.trim();
        if self.servers.iter().any(|server| server.name == name) {
            return Err(ServerStoreError::DuplicateName {
                name: name.to_string(),
            });
        }
        Url::parse(&expand(url)).map_err(|err| ServerStoreError::InvalidUrl {
            url: url.to_string(),
            message: err.to_string(),
        })?;

        let mut next = self.clone();
        next.servers.push(RawServer {
            name: name.to_string(),
            url: url.to_string(),
        });
        if next.servers.len() == 1 && next.default_name.is_none() {
            next.default_name = Some(name.to_string());
        }
        next.commit_into(self)?;

        info!(server = name, url, "Added MCP server");
        self.get(name).ok_or_else(|| ServerStoreError::NotFound {
            name: name.to_string(),
        })
    }

    pub fn remove(&mut self, name: &str) -> Result<ServerDescriptor, ServerStoreError> {
        let removed = self.get(name).ok_or_else(|| ServerStoreError::NotFound {
            name: name.to_string(),
        })?;

        let mut next = self.clone();
        next.servers.retain(|server| server.name != name);
        if next.default_name.as_deref() == Some(name) {
            next.default_name = next.servers.first().map(|server| server.name.clone());
        }
        next.commit_into(self)?;

        info!(
            server = name,
            new_default = ?self.default_name,
            "Removed MCP server"
        );
        Ok(removed)
    }

    pub fn set_default(&mut self, name: &str) -> Result<(), ServerStoreError> {
        if self.get(name).is_none() {
            return Err(ServerStoreError::NotFound {
                name: name.to_string(),
            });
        }
        let mut next = self.clone();
        next.default_name = Some(name.to_string());
        next.commit_into(self)?;
        info!(server = name, "Default MCP server changed");
        Ok(())
    }

    fn describe(&self, raw: &RawServer) -> ServerDescriptor {
        ServerDescriptor {
            name: raw.name.clone(),
            url: expand(&raw.url),
            is_default: self.default_name.as_deref() == Some(raw.name.as_str()),
        }
    }

    /// Persist this state, then make it current. On failure `target` is
    /// left unchanged.
    fn commit_into(self, target: &mut Self) -> Result<(), ConfigError> {
        self.persist()?;
        *target = self;
        Ok(())
    }

    fn persist(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = ServersFile {
            default_server: self.default_name.clone(),
            servers: self.servers.clone(),
        };
        let rendered = toml::to_string_pretty(&file).map_err(|source| ConfigError::Serialize {
            path: path.clone(),
            source,
        })?;

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, rendered).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Saved MCP server list");
        Ok(())
    }
}
