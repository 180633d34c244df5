//! mcp-assistant CLI: 向助手提问、管理历史与 API Key 的命令行工具
//!
//! Usage:
//!   mcp-assistant ask <question...>           Ask a question and record the answer
//!   mcp-assistant history [--favorites]       List past questions, newest first
//!   mcp-assistant favorite|unfavorite <id>    Toggle the favorite flag
//!   mcp-assistant delete <id>                 Delete one record
//!   mcp-assistant clear-history               Delete every record
//!   mcp-assistant set-key <key> | clear-key | key-status

use std::path::PathBuf;

use anyhow::Context;
use mcp_assistant::storage::{JsonFileConversationStore, KeyringSecretStore};
use mcp_assistant::{AppError, Assistant, ClientConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const ENV_CONFIG: &str = "MCP_ASSISTANT_CONFIG";
const ENV_HISTORY: &str = "MCP_ASSISTANT_HISTORY";
const DEFAULT_HISTORY_FILE: &str = "mcp-assistant-history.json";

type CliAssistant = Assistant<KeyringSecretStore, JsonFileConversationStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    match args[1].as_str() {
        "version" | "--version" | "-V" => {
            cmd_version();
            return Ok(());
        }
        "help" | "--help" | "-h" => {
            print_usage();
            return Ok(());
        }
        _ => {}
    }

    let assistant = open_assistant().await?;
    let rest = &args[2..];
    let outcome = match args[1].as_str() {
        "ask" => cmd_ask(&assistant, rest).await,
        "history" => cmd_history(&assistant, rest).await,
        "favorite" => cmd_favorite(&assistant, rest, true).await,
        "unfavorite" => cmd_favorite(&assistant, rest, false).await,
        "delete" => cmd_delete(&assistant, rest).await,
        "clear-history" => assistant.delete_all().await,
        "set-key" => cmd_set_key(&assistant, rest).await,
        "clear-key" => assistant.clear_api_key().await,
        "key-status" => cmd_key_status(&assistant).await,
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("[{}] {}", e.kind(), e.user_message());
        std::process::exit(1);
    }
    Ok(())
}

fn print_usage() {
    println!(
        r#"mcp-assistant: MCP 問答アシスタント

USAGE:
    mcp-assistant <COMMAND> [ARGS]

COMMANDS:
    ask <question...>           Ask a question and record the answer
    history [--favorites]       List past questions, newest first
    favorite <id>               Mark a record as favorite
    unfavorite <id>             Remove the favorite mark
    delete <id>                 Delete one record
    clear-history               Delete every record
    set-key <key>               Store the API key in the OS keyring
    clear-key                   Remove the stored API key
    key-status                  Show whether an API key is stored
    version                     Show version information
    help                        Show this help message

ENVIRONMENT:
    MCP_ASSISTANT_CONFIG        YAML configuration file
    MCP_ASSISTANT_HISTORY       History file (default: ./mcp-assistant-history.json)
    MCP_ASSISTANT_*             Per-field overrides (MODEL, BASE_URL, MAX_TOKENS, ...)
    RUST_LOG                    Log filter (default: warn)"#
    );
}

fn cmd_version() {
    println!("mcp-assistant {}", env!("CARGO_PKG_VERSION"));
}

async fn open_assistant() -> anyhow::Result<CliAssistant> {
    let config = match std::env::var(ENV_CONFIG) {
        Ok(path) => ClientConfig::from_yaml_file(&path)
            .with_context(|| format!("loading config from {path}"))?
            .with_overrides(|k| std::env::var(k).ok()),
        Err(_) => ClientConfig::from_env().context("loading config from environment")?,
    };

    let history_path = std::env::var(ENV_HISTORY)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_HISTORY_FILE));
    let history = JsonFileConversationStore::open(&history_path)
        .await
        .with_context(|| format!("opening history at {}", history_path.display()))?;

    Ok(Assistant::new(
        config,
        KeyringSecretStore::default(),
        history,
    ))
}

async fn cmd_ask(assistant: &CliAssistant, args: &[String]) -> Result<(), AppError> {
    let question = args.join(" ");
    if question.trim().is_empty() {
        eprintln!("Usage: mcp-assistant ask <question...>");
        std::process::exit(1);
    }

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    if let Some(item) = assistant.ask_with_cancel(&question, &cancel).await? {
        println!("{}", item.answer);
        println!();
        println!("(id: {})", item.id);
    }
    Ok(())
}

async fn cmd_history(assistant: &CliAssistant, args: &[String]) -> Result<(), AppError> {
    let favorites_only = args.iter().any(|a| a == "--favorites" || a == "-f");
    let items = assistant.history(favorites_only).await?;
    if items.is_empty() {
        println!("No history.");
        return Ok(());
    }
    for item in items {
        let star = if item.is_favorite { "★" } else { " " };
        println!("{star} {}  {}", item.id, item.question);
        for line in item.answer.lines() {
            println!("    {line}");
        }
        println!();
    }
    Ok(())
}

async fn cmd_favorite(
    assistant: &CliAssistant,
    args: &[String],
    favorite: bool,
) -> Result<(), AppError> {
    let id = require_id(args, if favorite { "favorite" } else { "unfavorite" });
    assistant.set_favorite(&id, favorite).await
}

async fn cmd_delete(assistant: &CliAssistant, args: &[String]) -> Result<(), AppError> {
    let id = require_id(args, "delete");
    assistant.delete(&id).await
}

async fn cmd_set_key(assistant: &CliAssistant, args: &[String]) -> Result<(), AppError> {
    let key = args.first().map(String::as_str).unwrap_or_default();
    assistant.save_api_key(key).await?;
    println!("API key saved.");
    Ok(())
}

async fn cmd_key_status(assistant: &CliAssistant) -> Result<(), AppError> {
    let status = assistant.api_key_status().await?;
    if status.has_key {
        println!("API key: {}", status.masked);
    } else {
        println!("API key: (not set)");
    }
    Ok(())
}

fn require_id(args: &[String], command: &str) -> String {
    match args.first() {
        Some(id) => id.clone(),
        None => {
            eprintln!("Usage: mcp-assistant {command} <id>");
            std::process::exit(1);
        }
    }
}
