use clap::Parser;
use std::path::PathBuf;

use crate::agents::config::OrchestrationMode;

/// Nimbus - chat service answering with Azure OpenAI and a weather tool
#[derive(Parser, Debug, Clone)]
#[command(name = "nimbus", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "NIMBUS_CONFIG", default_value = "nimbus.toml")]
    pub config: PathBuf,

    /// Server host address
    #[arg(long, env = "NIMBUS_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "NIMBUS_PORT")]
    pub port: Option<u16>,

    /// Azure OpenAI endpoint
    #[arg(long, env = "AZURE_AI_PROJECT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Model deployment name
    #[arg(long, env = "AZURE_AI_MODEL_DEPLOYMENT")]
    pub deployment: Option<String>,

    /// Base URL of the weather function
    #[arg(long, env = "WeatherFunctionUrl")]
    pub weather_url: Option<String>,

    /// Completion engine: single or handoff
    #[arg(long, env = "NIMBUS_ORCHESTRATION")]
    pub orchestration: Option<OrchestrationMode>,

    /// Maximum log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Allowed CORS origins, comma separated, or "*"
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["nimbus"]);
        assert_eq!(cli.config, PathBuf::from("nimbus.toml"));
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert!(cli.orchestration.is_none());
    }

    #[test]
    fn test_cli_with_args() {
        let cli = Cli::parse_from([
            "nimbus",
            "--config",
            "custom.toml",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--endpoint",
            "https://example.openai.azure.com",
            "--deployment",
            "gpt-4o",
            "--orchestration",
            "handoff",
            "--cors-origins",
            "http://localhost:3000,http://localhost:5173",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert_eq!(cli.host, Some("0.0.0.0".to_string()));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.deployment.as_deref(), Some("gpt-4o"));
        assert_eq!(cli.orchestration, Some(OrchestrationMode::Handoff));
        assert_eq!(
            cli.cors_origins,
            Some(vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string()
            ])
        );
    }

    #[test]
    fn test_cli_rejects_unknown_orchestration() {
        assert!(Cli::try_parse_from(["nimbus", "--orchestration", "swarm"]).is_err());
    }
}
