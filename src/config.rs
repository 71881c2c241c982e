use crate::lens::ripestat::{RequestOptions, DEFAULT_TIMEOUT, RIPESTAT_BASE_URL};
use anyhow::{anyhow, Result};
use config::Config;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub struct RipecheckConfig {
    /// Timeout of the first attempt of every data call
    pub timeout: Duration,

    /// Retries after a failed attempt (default: none)
    pub max_retries: u32,

    /// RIPEstat host, overridable for mirrors
    pub base_url: String,
}

const EMPTY_CONFIG: &str = r#"### ripecheck configuration file

### timeout of the first attempt of each data call; doubled on every retry
# timeout = "10s"

### number of retries after a failed attempt
# max_retries = 0

### RIPEstat host
# base_url = "https://stat.ripe.net"
"#;

impl Default for RipecheckConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: 0,
            base_url: RIPESTAT_BASE_URL.to_string(),
        }
    }
}

impl RipecheckConfig {
    /// Function to create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<RipecheckConfig> {
        let mut builder = Config::builder();

        // Add in toml configuration file
        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                // By default use $HOME/.ripecheck/ripecheck.toml
                let ripecheck_dir = Self::config_dir()?;
                std::fs::create_dir_all(ripecheck_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create ripecheck directory: {}", e))?;
                let p = format!("{}/ripecheck.toml", ripecheck_dir.as_str());
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // Add in settings from the environment (with a prefix of RIPECHECK)
        // E.g., `RIPECHECK_TIMEOUT=30s ./ripecheck check AS3333`
        builder = builder.add_source(config::Environment::with_prefix("RIPECHECK"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_map(&config)
    }

    /// Build a configuration from flat key/value settings
    fn from_map(config: &HashMap<String, String>) -> Result<RipecheckConfig> {
        let defaults = RipecheckConfig::default();

        let timeout = match config.get("timeout") {
            Some(s) => humantime::parse_duration(s)
                .map_err(|e| anyhow!("Invalid timeout '{}': {}", s, e))?,
            None => defaults.timeout,
        };

        let max_retries = match config.get("max_retries") {
            Some(s) => s
                .parse()
                .map_err(|e| anyhow!("Invalid max_retries '{}': {}", s, e))?,
            None => defaults.max_retries,
        };

        let base_url = config
            .get("base_url")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);

        Ok(RipecheckConfig {
            timeout,
            max_retries,
            base_url,
        })
    }

    /// Timeout and retries to hand to the transport
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions::new(self.timeout, self.max_retries)
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        [
            format!("Config File:   {}", Self::config_file_path()),
            format!("Base URL:      {}", self.base_url),
            format!("Timeout:       {}", humantime::format_duration(self.timeout)),
            format!("Max Retries:   {}", self.max_retries),
        ]
        .join("\n")
    }

    fn config_dir() -> Result<String> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not find home directory"))?
            .to_str()
            .ok_or_else(|| anyhow!("Could not convert home directory path to string"))?
            .to_owned();
        Ok(format!("{}/.ripecheck", home_dir))
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.ripecheck/ripecheck.toml", home_dir)
    }
}
