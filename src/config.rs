use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub blob_store: BlobStoreConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

/// Which blob store backs tool images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobProvider {
    Local,
    Azure,
    Memory,
}

impl BlobProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Some(BlobProvider::Local),
            "azure" => Some(BlobProvider::Azure),
            "memory" => Some(BlobProvider::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlobStoreConfig {
    #[serde(default = "default_provider")]
    pub provider: BlobProvider,
    #[serde(default = "default_local_path")]
    pub local_path: String,
    #[serde(default = "default_account_name")]
    pub account_name: String,
    #[serde(default = "default_container_name")]
    pub container_name: String,
    /// Base64 storage account key used for SharedKey signing
    #[serde(default)]
    pub account_key: Option<String>,
    /// Alternative to the account key; appended to every request URL
    #[serde(default)]
    pub sas_token: Option<String>,
    /// Overrides `https://<account>.blob.core.windows.net`, e.g. for Azurite
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MaintenanceConfig {
    /// Seconds between reconciliation sweeps, 0 disables the background task
    #[serde(default)]
    pub reconcile_interval_secs: u64,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8900
}

fn default_db_path() -> String {
    "data/toolhire.db".to_string()
}

fn default_provider() -> BlobProvider {
    BlobProvider::Local
}

fn default_local_path() -> String {
    "data/images".to_string()
}

fn default_account_name() -> String {
    "toolapistorage".to_string()
}

fn default_container_name() -> String {
    "images".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            local_path: default_local_path(),
            account_name: default_account_name(),
            container_name: default_container_name(),
            account_key: None,
            sas_token: None,
            endpoint: None,
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| env::var(key).ok());
        config.ensure_directories()?;
        tracing::info!(
            "Blob store: provider={:?}, account={}, container={}",
            config.blob_store.provider,
            config.blob_store.account_name,
            config.blob_store.container_name
        );
        Ok(config)
    }

    /// Load configuration from conf.toml or config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["conf.toml", "config.toml", "data/conf.toml", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply overrides looked up by key
    /// Format: TH_CONF_<SECTION>_<KEY>
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(val) = lookup("TH_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("TH_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }

        // Database overrides
        if let Some(val) = lookup("TH_CONF_DATABASE_PATH") {
            self.database.path = val;
        }

        // Blob store overrides
        if let Some(val) = lookup("TH_CONF_BLOB_STORE_PROVIDER") {
            match BlobProvider::from_str(&val) {
                Some(provider) => self.blob_store.provider = provider,
                None => tracing::warn!("Ignoring unknown blob store provider: {}", val),
            }
        }
        if let Some(val) = lookup("TH_CONF_BLOB_STORE_LOCAL_PATH") {
            self.blob_store.local_path = val;
        }
        if let Some(val) = lookup("TH_CONF_BLOB_STORE_ACCOUNT_NAME") {
            self.blob_store.account_name = val;
        }
        if let Some(val) = lookup("TH_CONF_BLOB_STORE_CONTAINER_NAME") {
            self.blob_store.container_name = val;
        }
        if let Some(val) = lookup("TH_CONF_BLOB_STORE_ACCOUNT_KEY") {
            if !val.trim().is_empty() {
                self.blob_store.account_key = Some(val);
            }
        }
        if let Some(val) = lookup("TH_CONF_BLOB_STORE_SAS_TOKEN") {
            if !val.trim().is_empty() {
                self.blob_store.sas_token = Some(val);
            }
        }
        if let Some(val) = lookup("TH_CONF_BLOB_STORE_ENDPOINT") {
            if !val.trim().is_empty() {
                self.blob_store.endpoint = Some(val);
            }
        }

        // Maintenance overrides
        if let Some(val) = lookup("TH_CONF_MAINTENANCE_RECONCILE_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                self.maintenance.reconcile_interval_secs = secs;
            }
        }
    }

    /// Ensure required directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        if let Some(parent) = Path::new(&self.database.path).parent() {
            fs::create_dir_all(parent)?;
        }

        if self.blob_store.provider == BlobProvider::Local {
            fs::create_dir_all(&self.blob_store.local_path)?;
        }

        Ok(())
    }
}
