//! Discovery Types
//!
//! Results of one discovery round: the registry of callable functions and
//! the per-server bookkeeping that explains how it was built.

use crate::application::schema::FunctionDeclaration;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Links one LLM-facing function back to the server tool that implements it.
///
/// `tool_name` is the provider's original, unsanitized name and is what
/// `tools/call` receives.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolMapping {
    pub declaration: FunctionDeclaration,
    pub server_name: String,
    pub server_url: String,
    pub tool_name: String,
}

impl ToolMapping {
    /// Function name the LLM uses to request this tool.
    pub fn function_name(&self) -> &str {
        &self.declaration.name
    }
}

/// Ordered, deduplicated set of tool mappings.
///
/// Order is discovery order across servers. Registries are immutable once
/// built; a new discovery round produces a new registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolRegistry {
    mappings: Vec<ToolMapping>,
}

impl ToolRegistry {
    /// Build a registry, keeping the first mapping for any repeated name.
    pub fn new(mappings: Vec<ToolMapping>) -> Self {
        let mut seen = HashSet::new();
        let mappings = mappings
            .into_iter()
            .filter(|mapping| seen.insert(mapping.declaration.name.clone()))
            .collect();
        Self { mappings }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a mapping by function name.
    pub fn find(&self, function_name: &str) -> Option<&ToolMapping> {
        self.mappings
            .iter()
            .find(|mapping| mapping.declaration.name == function_name)
    }

    /// Declarations in registry order, ready to hand to the LLM.
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.mappings
            .iter()
            .map(|mapping| mapping.declaration.clone())
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.mappings
            .iter()
            .map(|mapping| mapping.declaration.name.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolMapping> {
        self.mappings.iter()
    }

    pub fn mappings(&self) -> &[ToolMapping] {
        &self.mappings
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Status of connecting to a server and fetching its tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// Server listed at least one tool
    Success,
    /// Connection could not be established
    Failed(String),
    /// Server answered but listed no tools
    NoTools,
}

impl LoadStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadStatus::Success)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            LoadStatus::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

/// What happened to one server during a discovery round.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerReport {
    pub name: String,
    pub url: String,
    pub status: LoadStatus,
    /// Tools the server listed
    pub listed: usize,
    /// Function names minted from this server's tools
    pub mapped: Vec<String>,
    /// Tools whose schema could not be used
    pub rejected: usize,
    /// Tools skipped because their function name was already taken
    pub duplicates: usize,
}

impl ServerReport {
    pub fn new(name: impl Into<String>, url: impl Into<String>, status: LoadStatus) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            status,
            listed: 0,
            mapped: Vec::new(),
            rejected: 0,
            duplicates: 0,
        }
    }
}

/// Aggregate statistics of a discovery round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    pub total_servers: usize,
    pub loaded: usize,
    pub failed: usize,
    pub no_tools: usize,
    pub tools_mapped: usize,
    pub tools_rejected: usize,
    pub duplicates: usize,
}

impl DiscoverySummary {
    pub fn from_reports(reports: &[ServerReport]) -> Self {
        let mut summary = Self {
            total_servers: reports.len(),
            ..Self::default()
        };

        for report in reports {
            match &report.status {
                LoadStatus::Success => summary.loaded += 1,
                LoadStatus::Failed(_) => summary.failed += 1,
                LoadStatus::NoTools => summary.no_tools += 1,
            }
            summary.tools_mapped += report.mapped.len();
            summary.tools_rejected += report.rejected;
            summary.duplicates += report.duplicates;
        }

        summary
    }
}

/// Result of `DiscoveryCoordinator::discover`.
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    /// Carry-over mappings followed by the newly minted ones
    pub registry: ToolRegistry,
    /// Mappings minted in this round only
    pub new_mappings: Vec<ToolMapping>,
    pub servers: Vec<ServerReport>,
    pub summary: DiscoverySummary,
}

/// How servers are contacted during a round. Name minting always follows
/// the server list order, so both modes produce the same registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    #[default]
    Sequential,
    Concurrent,
}
