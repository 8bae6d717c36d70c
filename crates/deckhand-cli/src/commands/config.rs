//! Config command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use deckhand_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config = Config::load_with_override(config_path.map(PathBuf::as_path))
        .context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "api_url": config.api_url,
                    "api_token": config.api_token.as_ref().map(|_| "(set)"),
                    "request_timeout_secs": config.request_timeout_secs,
                    "export_dir": config.export_dir,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.api_url);
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  api_url:              {}", config.api_url);
            println!(
                "  api_token:            {}",
                if config.api_token.is_some() {
                    "(set)"
                } else {
                    "(not set)"
                }
            );
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!("  export_dir:           {}", display_path(&config.export_dir));
            println!("  log_file:             {}", display_path(&config.log_file));
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config = Config::load_with_override(config_path.map(PathBuf::as_path))
        .context("Failed to load configuration")?;

    let value = if value == "none" { String::new() } else { value };
    config.set(&key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to(&save_path)
        .context("Failed to save configuration")?;

    let shown = if key == "api_token" && !value.is_empty() {
        "(hidden)"
    } else {
        value.as_str()
    };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_writes_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let output = Output::new(OutputFormat::Quiet);

        set(
            "request_timeout_secs".into(),
            "42".into(),
            Some(&path),
            &output,
        )
        .unwrap();
        set("export_dir".into(), "/tmp/decks".into(), Some(&path), &output).unwrap();
        set("export_dir".into(), "none".into(), Some(&path), &output).unwrap();

        let saved = Config::load_from_path(&path).unwrap();
        assert_eq!(saved.request_timeout_secs, 42);
        assert!(saved.export_dir.is_none());
    }

    #[test]
    fn test_set_unknown_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let output = Output::new(OutputFormat::Quiet);

        assert!(set("theme".into(), "dark".into(), Some(&path), &output).is_err());
        assert!(!path.exists());
    }
}
