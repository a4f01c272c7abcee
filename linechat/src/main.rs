//! `LineChat`: terminal client for a line-based chat server.
//!
//! Connects, optionally logs in, prints incoming events and sends what you
//! type. Configuration via CLI flags, environment variables, or config file
//! (`~/.config/linechat/config.toml`).
//!
//! ```bash
//! cargo run --bin linechat -- --host localhost --port 1300 --username alice
//!
//! # Or via environment variables
//! LINECHAT_HOST=localhost LINECHAT_PORT=1300 LINECHAT_USER=alice cargo run
//! ```

use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing_appender::non_blocking::WorkerGuard;

use linechat::client::ChatClient;
use linechat::config::{CliArgs, ClientConfig};
use linechat::console::{self, ConsoleListener, Flow};
use linechat::transport::Connector;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > env > config file > defaults).
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file; stdout carries the chat.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("linechat starting");
    let code = match run(&config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Terminal I/O failed: {e}");
            ExitCode::FAILURE
        }
    };
    tracing::info!("linechat exiting");
    code
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("linechat.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Connect, log in, then pump stdin into the client until quit or EOF.
async fn run(config: &ClientConfig) -> io::Result<ExitCode> {
    let client = ChatClient::with_options(config.tcp_connector(), config.client_options());
    client.add_listener(Arc::new(ConsoleListener::stdout()));

    if !client.connect(&config.host, config.port).await {
        eprintln!(
            "Could not connect to {}:{}: {}",
            config.host,
            config.port,
            client.last_error()
        );
        return Ok(ExitCode::FAILURE);
    }
    println!("* Connected to {}:{}", config.host, config.port);
    client.start_listen_task();

    if let Some(username) = &config.username
        && !client.try_login(username).await
    {
        eprintln!("Login not sent: {}", client.last_error());
    }

    let poller = config
        .user_poll_interval
        .map(|every| spawn_user_poll(client.clone(), every));

    let mut stdout = io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = console::parse_input(&line);
        if console::execute(&client, command, &mut stdout).await? == Flow::Quit {
            break;
        }
        if !client.is_connection_active() {
            println!("* Connection closed, exiting");
            break;
        }
    }

    if let Some(poller) = poller {
        poller.abort();
    }
    client.disconnect().await;
    Ok(ExitCode::SUCCESS)
}

/// Refresh the user list every `every` while the connection is open.
fn spawn_user_poll<C: Connector>(client: ChatClient<C>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if !client.is_connection_active() {
                break;
            }
            client.refresh_user_list().await;
        }
        tracing::debug!("user list polling stopped");
    })
}
