use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "mcp-chat",
    version,
    about = "Chat with Gemini using tools from MCP servers"
)]
pub struct Cli {
    /// Path to client.toml
    #[arg(long)]
    pub config: Option<String>,
    /// Override the configured Gemini model
    #[arg(long)]
    pub model: Option<String>,
    /// Override the configured system prompt
    #[arg(long)]
    pub system: Option<String>,
    /// Only log warnings and errors
    #[arg(long, short)]
    pub quiet: bool,
}
