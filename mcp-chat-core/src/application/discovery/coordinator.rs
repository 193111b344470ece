use super::naming::derive_function_name;
use super::types::{
    DiscoveryMode, DiscoveryOutcome, DiscoverySummary, LoadStatus, ServerReport, ToolMapping,
    ToolRegistry,
};
use crate::application::schema::{FunctionDeclaration, SchemaSkip, translate_input_schema};
use crate::application::tooling::{RawToolDescriptor, ToolTransport, TransportError};
use crate::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::domain::ServerDescriptor;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Builds a fresh tool registry from the configured servers.
#[derive(Clone)]
pub struct DiscoveryCoordinator {
    transport: Arc<dyn ToolTransport>,
    mode: DiscoveryMode,
    timeout: Duration,
}

type Listing = Result<Vec<RawToolDescriptor>, String>;

impl DiscoveryCoordinator {
    pub fn new(transport: Arc<dyn ToolTransport>) -> Self {
        Self {
            transport,
            mode: DiscoveryMode::default(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_mode(mut self, mode: DiscoveryMode) -> Self {
        self.mode = mode;
        self
    }

    /// Bound on each connect, list and close.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn mode(&self) -> DiscoveryMode {
        self.mode
    }

    /// Run one discovery round.
    ///
    /// Names already in `carry_over` are treated as taken, and the resulting
    /// registry is `carry_over` followed by the mappings minted here. Server
    /// failures are absorbed into the per-server reports.
    pub async fn discover(
        &self,
        servers: &[ServerDescriptor],
        carry_over: &ToolRegistry,
    ) -> DiscoveryOutcome {
        info!(
            servers = servers.len(),
            mode = ?self.mode,
            "Discovering tools from MCP servers"
        );

        let listings: Vec<Listing> = match self.mode {
            DiscoveryMode::Sequential => {
                let mut listings = Vec::with_capacity(servers.len());
                for server in servers {
                    listings.push(self.fetch_tools(server).await);
                }
                listings
            }
            DiscoveryMode::Concurrent => {
                join_all(servers.iter().map(|server| self.fetch_tools(server))).await
            }
        };

        let mut taken: HashSet<String> = carry_over
            .names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut new_mappings = Vec::new();
        let mut reports = Vec::with_capacity(servers.len());
        for (server, listing) in servers.iter().zip(listings) {
            reports.push(map_server_tools(server, listing, &mut taken, &mut new_mappings));
        }

        let mut all = carry_over.mappings().to_vec();
        all.extend(new_mappings.iter().cloned());
        let registry = ToolRegistry::new(all);
        let summary = DiscoverySummary::from_reports(&reports);

        info!(
            loaded = summary.loaded,
            failed = summary.failed,
            no_tools = summary.no_tools,
            new_tools = summary.tools_mapped,
            rejected = summary.tools_rejected,
            duplicates = summary.duplicates,
            total = registry.len(),
            "Tool discovery complete"
        );

        DiscoveryOutcome {
            registry,
            new_mappings,
            servers: reports,
            summary,
        }
    }

    /// Connect, list, close. The connection is closed on every path that
    /// opened one.
    async fn fetch_tools(&self, server: &ServerDescriptor) -> Listing {
        debug!(server = %server.name, url = %server.url, "Checking MCP server");

        let mut connection = match timeout(self.timeout, self.transport.connect(&server.url)).await
        {
            Ok(Ok(connection)) => connection,
            Ok(Err(err)) => {
                warn!(server = %server.name, %err, "Failed to connect to MCP server");
                return Err(err.to_string());
            }
            Err(_) => {
                let err = TransportError::timeout(&server.name, "connect");
                warn!(server = %server.name, %err, "Failed to connect to MCP server");
                return Err(err.to_string());
            }
        };

        let tools = match timeout(self.timeout, connection.list_tools()).await {
            Ok(tools) => tools,
            Err(_) => {
                warn!(server = %server.name, "Timed out listing tools");
                Vec::new()
            }
        };

        if timeout(self.timeout, connection.close()).await.is_err() {
            debug!(server = %server.name, "Timed out closing MCP connection");
        }
        Ok(tools)
    }
}

fn map_server_tools(
    server: &ServerDescriptor,
    listing: Listing,
    taken: &mut HashSet<String>,
    mappings: &mut Vec<ToolMapping>,
) -> ServerReport {
    let tools = match listing {
        Ok(tools) => tools,
        Err(message) => return ServerReport::new(&server.name, &server.url, LoadStatus::Failed(message)),
    };
    if tools.is_empty() {
        info!(server = %server.name, "MCP server listed no tools");
        return ServerReport::new(&server.name, &server.url, LoadStatus::NoTools);
    }

    let mut report = ServerReport::new(&server.name, &server.url, LoadStatus::Success);
    report.listed = tools.len();

    for tool in tools {
        let declaration = match declare_tool(&server.name, &tool) {
            Ok(declaration) => declaration,
            Err(reason) => {
                warn!(
                    server = %server.name,
                    tool = %tool.name,
                    %reason,
                    "Skipping tool with unusable input schema"
                );
                report.rejected += 1;
                continue;
            }
        };

        if !taken.insert(declaration.name.clone()) {
            warn!(
                server = %server.name,
                tool = %tool.name,
                function = %declaration.name,
                "Function name already registered, skipping duplicate"
            );
            report.duplicates += 1;
            continue;
        }

        debug!(
            server = %server.name,
            tool = %tool.name,
            function = %declaration.name,
            "Mapped MCP tool"
        );
        report.mapped.push(declaration.name.clone());
        mappings.push(ToolMapping {
            declaration,
            server_name: server.name.clone(),
            server_url: server.url.clone(),
            tool_name: tool.name,
        });
    }

    report
}

/// Function declaration for one listed tool.
pub fn declare_tool(
    server_name: &str,
    tool: &RawToolDescriptor,
) -> Result<FunctionDeclaration, SchemaSkip> {
    let schema = tool.schema().ok_or(SchemaSkip::MissingType)?;
    let parameters = translate_input_schema(&schema)?;

    let description = match tool.description.as_deref() {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => default_description(server_name, tool),
    };

    Ok(FunctionDeclaration {
        name: derive_function_name(server_name, &tool.name),
        description,
        parameters,
    })
}

fn default_description(server_name: &str, tool: &RawToolDescriptor) -> String {
    let text = format!(
        "Calls {} on MCP server {}. {}",
        tool.name,
        server_name,
        tool.display_title().unwrap_or_default()
    );
    text.trim_end().to_string()
}
