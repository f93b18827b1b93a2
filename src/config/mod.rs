use anyhow::{Context, Result};
use aws_config::Region;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AWS configuration
    pub aws: AwsConfig,

    /// Caption lookup settings
    pub transcripts: TranscriptsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// AWS region (falls back to the SDK's provider chain)
    pub region: Option<String>,

    /// DynamoDB table the transcripts are written to
    pub table_name: String,

    /// Secrets Manager secret holding the proxy credentials
    pub secret_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptsConfig {
    /// Caption languages in order of preference
    pub languages: Vec<String>,

    /// Rotating proxy endpoint
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub domain: String,
    pub port: u16,
}

impl Default for TranscriptsConfig {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string(), "pl".to_string()],
            proxy: ProxyConfig::default(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            domain: "p.webshare.io".to_string(),
            port: 80,
        }
    }
}

impl Config {
    /// Load configuration from file (if any) and the process environment
    pub async fn load() -> Result<Self> {
        let mut config = match Self::config_path()? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a YAML configuration file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Override settings from environment variables
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(table_name) = lookup("TABLE_NAME").filter(|v| !v.is_empty()) {
            self.aws.table_name = table_name;
        }

        if let Some(secret_name) = lookup("SECRET_NAME").filter(|v| !v.is_empty()) {
            self.aws.secret_name = secret_name;
        }

        if let Some(region) = lookup("AWS_REGION").filter(|v| !v.is_empty()) {
            self.aws.region = Some(region);
        }
    }

    /// Save configuration to the user's config directory
    pub async fn save(&self) -> Result<PathBuf> {
        let config_path = Self::user_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(config_path)
    }

    /// Get the configuration file path, if one exists
    fn config_path() -> Result<Option<PathBuf>> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(Some(local_config));
        }

        let user_config = Self::user_config_path()?;
        Ok(user_config.exists().then_some(user_config))
    }

    fn user_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("transcript-provider").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.aws.table_name.is_empty() {
            anyhow::bail!("DynamoDB table name must be configured (TABLE_NAME)");
        }

        if self.aws.secret_name.is_empty() {
            anyhow::bail!("Secret name must be configured (SECRET_NAME)");
        }

        if self.transcripts.languages.is_empty() {
            anyhow::bail!("At least one caption language must be configured");
        }

        if self.transcripts.proxy.domain.is_empty() {
            anyhow::bail!("Proxy domain must be configured");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  AWS Region: {}", self.aws.region.as_deref().unwrap_or("(sdk default)"));
        println!("  Table: {}", self.aws.table_name);
        println!("  Secret: {}", self.aws.secret_name);
        println!("  Languages: {}", self.transcripts.languages.join(", "));
        println!("  Proxy: {}:{}", self.transcripts.proxy.domain, self.transcripts.proxy.port);
    }

    /// Get AWS region override
    pub fn aws_region(&self) -> Option<Region> {
        self.aws.region.clone().map(Region::new)
    }
}
