use clap::Parser;
use nimbus::agents::ChatAgentService;
use nimbus::cli::Cli;
use nimbus::config::Settings;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration with CLI overrides
    let settings = Settings::new_with_cli(&cli)?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(settings.logging.max_level())
        .init();

    let host = settings.server.host.clone();
    let port = settings.server.port;

    info!(
        app = %settings.server.app_name,
        orchestration = %settings.chat.orchestration,
        "Starting Nimbus chat service on {}:{}",
        host,
        port
    );

    let service = ChatAgentService::from_settings(&settings)?;

    // Create application using the library function
    let app = nimbus::create_app(Arc::new(service), &settings.server);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
