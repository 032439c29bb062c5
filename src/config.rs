use anyhow::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Service configuration, loadable from CLI arguments with an optional TOML
/// file underneath (CLI values win).
///
/// Example configuration file:
///
/// # Video Trimmer Configuration
/// listen_on_port = 8080
/// permits = 2
/// token_rate = 0.0
/// workspace = "./data"
/// max_upload_mb = 512
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    #[serde(default = "default_port")]
    pub listen_on_port: u16,

    /// Number of trim jobs allowed to encode concurrently
    #[arg(short, long, default_value_t = 2)]
    #[serde(default = "default_permits")]
    pub permits: usize,

    /// Download throttle in bytes per second (0.0 = disabled)
    #[arg(short, long, default_value_t = 0.0)]
    #[serde(default = "default_token_rate")]
    pub token_rate: f64,

    /// Working directory holding the uploads/ and processed/ folders
    #[arg(short = 'w', long, default_value = ".")]
    #[serde(default = "default_workspace")]
    pub workspace: String,

    /// Maximum accepted upload size in megabytes
    #[arg(short, long, default_value_t = 512)]
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,

    /// Configuration file path
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_on_port: default_port(),
            permits: default_permits(),
            token_rate: default_token_rate(),
            workspace: default_workspace(),
            max_upload_mb: default_max_upload_mb(),
            config: None,
        }
    }
}

impl Config {
    /// Load configuration from CLI args, optionally merging with a config file
    pub fn load() -> Result<Self> {
        let mut config = Config::parse();

        if let Some(config_path) = &config.config {
            let file_config = Self::from_file(Path::new(config_path))?;
            config = config.merge_with_file(file_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge with file config; CLI args left at their defaults yield to the file.
    fn merge_with_file(mut self, file_config: Config) -> Self {
        if self.listen_on_port == default_port() {
            self.listen_on_port = file_config.listen_on_port;
        }
        if self.permits == default_permits() {
            self.permits = file_config.permits;
        }
        if self.token_rate == default_token_rate() {
            self.token_rate = file_config.token_rate;
        }
        if self.workspace == default_workspace() {
            self.workspace = file_config.workspace;
        }
        if self.max_upload_mb == default_max_upload_mb() {
            self.max_upload_mb = file_config.max_upload_mb;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.permits == 0 {
            return Err(anyhow::anyhow!("permits must be at least 1"));
        }
        if self.max_upload_mb == 0 {
            return Err(anyhow::anyhow!("max_upload_mb must be at least 1"));
        }
        if self.workspace.is_empty() {
            return Err(anyhow::anyhow!("workspace cannot be empty"));
        }
        if self.token_rate < 0.0 {
            return Err(anyhow::anyhow!("token_rate cannot be negative"));
        }
        Ok(())
    }
}

fn default_port() -> u16 {
    8080
}

fn default_permits() -> usize {
    2
}

fn default_token_rate() -> f64 {
    0.0
}

fn default_workspace() -> String {
    ".".to_string()
}

fn default_max_upload_mb() -> u64 {
    512
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_permits() {
        let config = Config {
            permits: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_values_fill_in_cli_defaults() {
        let file = Config {
            listen_on_port: 9999,
            workspace: "/srv/videos".into(),
            ..Default::default()
        };
        let merged = Config::default().merge_with_file(file);
        assert_eq!(merged.listen_on_port, 9999);
        assert_eq!(merged.workspace, "/srv/videos");
        assert_eq!(merged.permits, 2);
    }

    #[test]
    fn explicit_cli_values_win_over_file() {
        let cli = Config {
            listen_on_port: 8081,
            ..Default::default()
        };
        let file = Config {
            listen_on_port: 9999,
            ..Default::default()
        };
        assert_eq!(cli.merge_with_file(file).listen_on_port, 8081);
    }
}
