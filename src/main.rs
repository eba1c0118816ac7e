//! memline - A Small In-Memory Cache Server
//!
//! This is the main entry point for the memline server.
//! It sets up the TCP listener, the shared store, and hands each
//! incoming connection to its own session task.

use memline::commands::CommandHandler;
use memline::connection::{handle_connection, ConnectionStats};
use memline::storage::Store;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Maximum number of entries the store will hold
    item_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: memline::DEFAULT_HOST.to_string(),
            port: memline::DEFAULT_PORT,
            item_limit: memline::DEFAULT_ITEM_LIMIT,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" => {
                    if i + 1 < args.len() {
                        config.host = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --host requires a value");
                        std::process::exit(1);
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        config.port = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --port requires a value");
                        std::process::exit(1);
                    }
                }
                "--items" | "-i" => {
                    if i + 1 < args.len() {
                        config.item_limit = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid item limit");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --items requires a value");
                        std::process::exit(1);
                    }
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("memline version {}", memline::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
memline - A Small In-Memory Cache Server

USAGE:
    memline [OPTIONS]

OPTIONS:
        --host <HOST>     Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>     Port to listen on (default: 11212)
    -i, --items <LIMIT>   Maximum number of cached entries (default: 65535)
    -v, --version         Print version information
        --help            Print this help message

EXAMPLES:
    memline                        # Start on 127.0.0.1:11212
    memline --port 11300           # Start on port 11300
    memline --items 1000           # Cap the cache at 1000 entries

CONNECTING:
    Any line-oriented TCP client works:
    $ nc 127.0.0.1 11212
    set name
    Ariz
    STORED
    get name
    VALUE name
    Ariz
    END
"#
    );
}

fn print_banner(config: &Config) {
    println!(
        r#"
memline v{} - In-Memory Cache Server
──────────────────────────────────────────────
Server started on {}
Item limit: {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        memline::VERSION,
        config.bind_address(),
        config.item_limit
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Print the banner
    print_banner(&config);

    // Create the store (shared across all sessions)
    let store = Arc::new(Store::with_capacity(config.item_limit));
    info!(limit = config.item_limit, "Store initialized");

    // Create connection statistics
    let stats = Arc::new(ConnectionStats::new());

    // Bind the TCP listener
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    // Set up graceful shutdown; the cache is volatile, so there is
    // nothing to flush - just stop accepting and exit.
    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received, stopping server...");
    };

    // Main accept loop
    tokio::select! {
        _ = accept_loop(listener, store, stats) => {}
        _ = shutdown => {}
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(listener: TcpListener, store: Arc<Store>, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                // Create a command handler for this connection
                let handler = CommandHandler::new(Arc::clone(&store));
                let stats = Arc::clone(&stats);

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
