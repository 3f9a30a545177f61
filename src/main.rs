use color_eyre::eyre::{Result, WrapErr};
use echoharness::EchoServerTrait;
use echoharness::http::{HttpConfig, HttpEchoServer};
use echoharness::websocket::{WebSocketConfig, WebSocketEchoServer};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Initialize logging, RUST_LOG overrides the default filter
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("echoharness=info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("echoharness");
    let protocol = args.get(1).map(|s| s.to_lowercase()).unwrap_or_else(|| "http".to_string());
    let port = args
        .get(2)
        .map(|p| p.parse::<u16>().wrap_err_with(|| format!("Invalid port: {p}")))
        .transpose()?;

    match protocol.as_str() {
        "http" => {
            let config = HttpConfig {
                bind_addr: SocketAddr::from(([0, 0, 0, 0], port.unwrap_or(80))),
                ..HttpConfig::default()
            };
            info!(address = %config.bind_addr, route = %config.route, "Starting HTTP echo server");

            let server = HttpEchoServer::from_config(config).wrap_err("Invalid HTTP configuration")?;
            server.run().await.wrap_err("Failed to run HTTP echo server")?;
        }
        "ws" | "websocket" => {
            let config = WebSocketConfig {
                bind_addr: SocketAddr::from(([0, 0, 0, 0], port.unwrap_or(8765))),
                ..WebSocketConfig::default()
            };
            info!(address = %config.bind_addr, "WebSocket server running on ws://{}", config.bind_addr);

            let server = WebSocketEchoServer::from_config(config);
            server.run().await.wrap_err("Failed to run WebSocket echo server")?;
        }
        _ => {
            eprintln!("Usage: {program} [http|ws] [port]");
            eprintln!("  http|ws: Service to run (default: http)");
            eprintln!("  port:    Port to bind on all interfaces (default: 80 for http, 8765 for ws)");
            eprintln!();
            eprintln!("Examples:");
            eprintln!("  {program} http           # HTTP echo on 0.0.0.0:80, route /api/Tags/tag-crime");
            eprintln!("  {program} http 8080      # HTTP echo on 0.0.0.0:8080");
            eprintln!("  {program} ws             # WebSocket echo on 0.0.0.0:8765");
            std::process::exit(1);
        }
    }

    Ok(())
}
