use clap::Parser;
use nimbus::agents::OrchestrationMode;
use nimbus::cli::Cli;
use nimbus::config::Settings;
use std::fs;
use tempfile::TempDir;

const NIMBUS_TOML: &str = r#"
[server]
port = 9100
cors_origins = ["http://localhost:3000"]

[logging]
level = "debug"

[llm]
base_url = "https://example.openai.azure.com"
model = "gpt-4o"

[chat]
orchestration = "handoff"
temperature = 0.2

[chat.handoff]
max_handoffs = 3

[weather]
base_url = "http://weather.internal:7071"
"#;

#[test]
fn test_load_file_settings() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("nimbus.toml");
    fs::write(&path, NIMBUS_TOML)?;

    let settings = Settings::load(&path)?;

    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 9100);
    assert!(!settings.server.allows_any_origin());
    assert_eq!(settings.logging.max_level(), tracing::Level::DEBUG);
    assert_eq!(settings.llm.model, "gpt-4o");
    assert_eq!(settings.llm.api_version, "2024-10-21");
    assert_eq!(settings.chat.orchestration, OrchestrationMode::Handoff);
    assert!((settings.chat.temperature - 0.2).abs() < f32::EPSILON);
    assert_eq!(settings.chat.max_tokens, 800);
    assert_eq!(settings.chat.handoff.max_handoffs, 3);
    assert_eq!(settings.chat.handoff.result_timeout_seconds, 60);
    assert_eq!(settings.weather.base_url, "http://weather.internal:7071");
    assert!(settings.validate().is_ok());

    Ok(())
}

#[test]
fn test_missing_file_uses_defaults() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let settings = Settings::load(&temp_dir.path().join("absent.toml"))?;

    assert_eq!(settings.server.port, 8000);
    assert_eq!(settings.server.app_name, "AI Chat Service");
    assert_eq!(settings.chat.orchestration, OrchestrationMode::Single);
    assert_eq!(settings.chat.max_tool_rounds, 5);

    // No endpoint or deployment configured
    let err = settings.validate().unwrap_err().to_string();
    assert!(err.contains("llm.base_url"));
    assert!(err.contains("llm.model"));

    Ok(())
}

#[test]
fn test_cli_overrides_file() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("nimbus.toml");
    fs::write(&path, NIMBUS_TOML)?;

    let cli = Cli::parse_from([
        "nimbus",
        "--config",
        path.to_str().unwrap(),
        "--port",
        "9200",
        "--deployment",
        "gpt-4o-mini",
        "--orchestration",
        "single",
        "--cors-origins",
        "*",
        "--weather-url",
        "http://localhost:7072",
    ]);
    let settings = Settings::new_with_cli(&cli)?;

    assert_eq!(settings.server.port, 9200);
    assert!(settings.server.allows_any_origin());
    assert_eq!(settings.llm.model, "gpt-4o-mini");
    assert_eq!(settings.llm.base_url, "https://example.openai.azure.com");
    assert_eq!(settings.chat.orchestration, OrchestrationMode::Single);
    assert_eq!(settings.weather.base_url, "http://localhost:7072");

    Ok(())
}

#[test]
fn test_environment_overrides_file() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("nimbus.toml");
    fs::write(&path, NIMBUS_TOML)?;

    std::env::set_var("NIMBUS__WEATHER__DEFAULT_LOCATION", "Reykjavik");
    let settings = Settings::load(&path);
    std::env::remove_var("NIMBUS__WEATHER__DEFAULT_LOCATION");

    assert_eq!(settings?.weather.default_location, "Reykjavik");
    Ok(())
}

#[test]
fn test_invalid_values_are_all_reported() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("nimbus.toml");
    fs::write(
        &path,
        r#"
[llm]
base_url = "https://example.openai.azure.com"
model = "gpt-4o"

[chat]
temperature = 3.0
max_tool_rounds = 0

[weather]
base_url = "weather-function"
"#,
    )?;

    let cli = Cli::parse_from(["nimbus", "--config", path.to_str().unwrap()]);
    let err = Settings::new_with_cli(&cli).unwrap_err().to_string();

    assert!(err.contains("Configuration validation failed"));
    assert!(err.contains("chat.temperature"));
    assert!(err.contains("chat.max_tool_rounds"));
    assert!(err.contains("weather.base_url"));

    Ok(())
}
