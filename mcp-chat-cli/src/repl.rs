use mcp_chat_core::domain::MessageRole;
use mcp_chat_core::infrastructure::model::ModelSession;
use mcp_chat_core::{ChatController, ChatEvent, EventKind};
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

const HELP: &str = "\
Commands:
  /servers              list configured MCP servers
  /add <name> <url>     add a server and rediscover tools
  /remove <name>        remove a server and rediscover tools
  /default <name>       make a server the default
  /tools                list discovered tools
  /rediscover           discover tools again
  /attach <path>        attach a file to the next message
  /reset                clear the conversation
  /help                 show this help
  /quit                 exit
Anything else is sent to the assistant.";

#[derive(Debug, Error)]
pub enum ReplError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Servers,
    Add { name: String, url: String },
    Remove(String),
    Default(String),
    Tools,
    Rediscover,
    Attach(PathBuf),
    Reset,
    Help,
    Quit,
    Chat(String),
    Invalid(String),
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Chat(line.to_string());
    };
    let mut words = rest.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    match (verb, args.as_slice()) {
        ("servers", []) => Command::Servers,
        ("add", [name, url]) => Command::Add {
            name: name.to_string(),
            url: url.to_string(),
        },
        ("remove", [name]) => Command::Remove(name.to_string()),
        ("default", [name]) => Command::Default(name.to_string()),
        ("tools", []) => Command::Tools,
        ("rediscover", []) => Command::Rediscover,
        ("attach", [_, ..]) => Command::Attach(PathBuf::from(args.join(" "))),
        ("reset", []) => Command::Reset,
        ("help", []) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        _ => Command::Invalid(line.to_string()),
    }
}

/// Interactive loop over stdin until `/quit` or end of input.
pub async fn run<S: ModelSession>(controller: &mut ChatController<S>) -> Result<(), ReplError> {
    subscribe_printers(controller);

    let stdin = BufReader::new(io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = io::stdout();
    let mut attachments: Vec<PathBuf> = Vec::new();

    println!("Type a message, or /help for commands.");
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        debug!("Received REPL line");

        match parse_command(&line) {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Servers => print_servers(controller),
            Command::Tools => print_tools(controller),
            Command::Add { name, url } => match controller.add_server(&name, &url).await {
                Ok(server) => println!("Added {} ({})", server.name, server.url),
                Err(err) => println!("Could not add server: {err}"),
            },
            Command::Remove(name) => match controller.remove_server(&name).await {
                Ok(server) => println!("Removed {}", server.name),
                Err(err) => println!("Could not remove server: {err}"),
            },
            Command::Default(name) => match controller.set_default_server(&name) {
                Ok(()) => println!("Default server is now {name}"),
                Err(err) => println!("Could not set default: {err}"),
            },
            Command::Rediscover => {
                let summary = controller.rediscover_tools().await;
                println!(
                    "{} tools from {}/{} servers ({} failed, {} rejected, {} duplicates)",
                    controller.discovered_tools().len(),
                    summary.loaded,
                    summary.total_servers,
                    summary.failed,
                    summary.tools_rejected,
                    summary.duplicates
                );
            }
            Command::Attach(path) => {
                println!("Attached {} to the next message", path.display());
                attachments.push(path);
            }
            Command::Reset => {
                attachments.clear();
                controller.reset_session();
                println!("Conversation cleared.");
            }
            Command::Chat(text) => {
                let pending = std::mem::take(&mut attachments);
                controller.send_message(&text, &pending).await;
            }
            Command::Invalid(line) => {
                warn!(%line, "Unrecognised command");
                println!("Unknown command or wrong arguments. Type /help.");
            }
        }
    }
    Ok(())
}

fn subscribe_printers<S: ModelSession>(controller: &ChatController<S>) {
    let events = controller.events();
    events.subscribe(EventKind::Message, |event| {
        let ChatEvent::Message(message) = event else {
            return;
        };
        match message.role {
            MessageRole::User => {}
            MessageRole::Assistant => println!("\nassistant: {}\n", message.content),
            MessageRole::System if message.is_error => println!("! {}", message.content),
            MessageRole::System | MessageRole::Tool => println!("  {}", message.content),
        }
    });
    events.subscribe(EventKind::ToolDiscoveryUpdated, |event| {
        if let ChatEvent::ToolDiscoveryUpdated(registry) = event {
            debug!(tools = registry.len(), "Tool set updated");
        }
    });
}

fn print_servers<S: ModelSession>(controller: &ChatController<S>) {
    let servers = controller.list_servers();
    if servers.is_empty() {
        println!("No MCP servers configured. Use /add <name> <url>.");
        return;
    }
    for server in servers {
        let marker = if server.is_default { "*" } else { " " };
        println!("{marker} {:<16} {}", server.name, server.url);
    }
}

fn print_tools<S: ModelSession>(controller: &ChatController<S>) {
    let registry = controller.discovered_tools();
    if registry.is_empty() {
        println!("No tools discovered.");
        return;
    }
    for mapping in registry.iter() {
        println!(
            "{:<32} {}/{}  {}",
            mapping.function_name(),
            mapping.server_name,
            mapping.tool_name,
            mapping.declaration.description
        );
    }
}
