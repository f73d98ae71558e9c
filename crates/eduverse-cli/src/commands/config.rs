//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use eduverse_core::Config;

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str = "data_dir, api_url, timeout_secs, drafts_prefix, default_model, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "api_url": config.api_url,
                    "timeout_secs": config.timeout_secs,
                    "drafts_prefix": config.drafts_prefix,
                    "default_model": config.default_model,
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
            println!("  data_dir:      {}", config.data_dir.display());
            println!("  api_url:       {}", config.api_url);
            println!("  timeout_secs:  {}", config.timeout_secs);
            println!("  drafts_prefix: {}", config.drafts_prefix);
            println!("  default_model: {}", config.default_model);
            println!(
                "  log_file:      {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
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
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "api_url" => {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                bail!("api_url must start with http:// or https://");
            }
            config.api_url = value.trim_end_matches('/').to_string();
        }
        "timeout_secs" => {
            let secs: u64 = value
                .parse()
                .context("Invalid value for timeout_secs. Use a whole number of seconds.")?;
            if secs == 0 {
                bail!("timeout_secs must be at least 1");
            }
            config.timeout_secs = secs;
        }
        "drafts_prefix" => {
            if value.is_empty() {
                bail!("drafts_prefix cannot be empty");
            }
            config.drafts_prefix = value.to_string();
        }
        "default_model" => {
            config.default_model = value.to_string();
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "api_url", "https://edu.example.com/api/v1/").unwrap();
        apply(&mut config, "timeout_secs", "5").unwrap();
        apply(&mut config, "log_file", "/tmp/eduverse.log").unwrap();

        assert_eq!(config.api_url, "https://edu.example.com/api/v1");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/eduverse.log")));

        apply(&mut config, "log_file", "none").unwrap();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();

        assert!(apply(&mut config, "api_url", "ftp://nope").is_err());
        assert!(apply(&mut config, "timeout_secs", "soon").is_err());
        assert!(apply(&mut config, "timeout_secs", "0").is_err());
        assert!(apply(&mut config, "sync_url", "x").is_err());
    }

    #[test]
    fn test_set_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!("data_dir = {:?}\n", dir.path().join("data").display().to_string()),
        )
        .unwrap();
        let output = Output::new(OutputFormat::Quiet);

        set(
            "default_model".to_string(),
            "meta-llama/llama-3-8b-instruct".to_string(),
            Some(&path),
            &output,
        )
        .unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains("meta-llama/llama-3-8b-instruct"));
    }
}
