use clap::Parser;
use nimbus::adapters::weather_function::weather_router;
use std::net::SocketAddr;
use tracing::info;

/// Weather function - fixed weather data for the chat service's weather plugin
#[derive(Parser, Debug)]
#[command(name = "weather-function", version, about, long_about = None)]
struct Args {
    /// Server host address
    #[arg(long, env = "WEATHER_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(long, env = "WEATHER_PORT", default_value_t = 7071)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Weather function listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, weather_router()).await?;

    Ok(())
}
