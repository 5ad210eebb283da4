use {
    std::{net::SocketAddr, path::PathBuf},
    tokio::fs,
    serde::Deserialize,
    clap::Args,
    tracing::info,
    visits_core::{CorsPolicy, DEFAULT_COUNTER_NAME},
    crate::{
        error::ConfigError,
        store::{BoxedStore, MemoryStore, SqliteStore},
        dynamodb::DynamoDbStore,
    },
};

/// Settings shared by every surface, read from the environment.
#[derive(Args, Debug, Clone)]
pub struct CounterConfig {
    #[arg(long, env = "REGION", default_value = "eu-west-1")]
    pub region: String,

    #[arg(long, env = "TABLE_NAME", default_value = "VisitsCounter")]
    pub table_name: String,

    #[arg(long, env = "COUNTER_NAME", default_value = DEFAULT_COUNTER_NAME)]
    pub counter_name: String,

    /// Name of the table's primary key attribute.
    #[arg(long, env = "COUNTER_KEY_ATTRIBUTE", default_value = "name")]
    pub key_attribute: String,

    #[arg(long, env = "WEBSITE_CLOUDFRONT_DOMAIN", default_value = "*")]
    pub allowed_origin: String,

    /// Overrides the DynamoDB endpoint, e.g. for DynamoDB Local.
    #[arg(long, env = "DYNAMODB_ENDPOINT")]
    pub dynamodb_endpoint: Option<String>,
}

impl CounterConfig {
    pub fn cors_policy(&self) -> Result<CorsPolicy, ConfigError> {
        Ok(CorsPolicy::new(&self.allowed_origin)?)
    }
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            region: "eu-west-1".to_owned(),
            table_name: "VisitsCounter".to_owned(),
            counter_name: DEFAULT_COUNTER_NAME.to_owned(),
            key_attribute: "name".to_owned(),
            allowed_origin: "*".to_owned(),
            dynamodb_endpoint: None,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct ServerConfig {
    #[serde(skip_deserializing)]
    pub config_path: Option<PathBuf>,

    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    pub metrics_port: Option<u16>,

    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Deserialize, Debug, Clone, Eq, PartialEq, Default)]
#[serde(tag = "type")]
pub enum StoreConfig {
    #[default]
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "sqlite")]
    Sqlite {
        path: PathBuf,
    },
    #[serde(rename = "dynamodb")]
    DynamoDb,
}

fn default_listen() -> SocketAddr {
    ([0, 0, 0, 0], 8080).into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            listen: default_listen(),
            metrics_port: None,
            store: StoreConfig::default(),
        }
    }
}

impl ServerConfig {
    pub async fn load(file_path: PathBuf) -> Result<Self, ConfigError> {
        let mut config = Self::parse(
            &fs::read_to_string(&file_path).await
                .map_err(ConfigError::FailedToRead)?
        )?;
        config.config_path = Some(file_path);
        config.resolve_relative_paths();
        Ok(config)
    }

    /// Relative paths in the config file are relative to the file itself, not to the working directory.
    fn resolve_relative_paths(&mut self) {
        let config_dir = match self.config_path.as_ref().and_then(|v| v.parent()) {
            Some(v) => v.to_path_buf(),
            None => return,
        };

        if let StoreConfig::Sqlite { path } = &mut self.store {
            if path.is_relative() {
                *path = config_dir.join(&*path);
            }
        }
    }

    pub fn parse(config: &str) -> Result<Self, ConfigError> {
        serde_yml::from_str(config).map_err(ConfigError::FailedToParse)
    }
}

pub async fn store_from_config(store: &StoreConfig, config: &CounterConfig) -> Result<BoxedStore, ConfigError> {
    Ok(match store {
        StoreConfig::Memory => {
            info!("using in-memory store, counter is lost on restart");
            BoxedStore::new(MemoryStore::new())
        },
        StoreConfig::Sqlite { path } => {
            info!("using sqlite store at {path:?}");
            BoxedStore::new(
                SqliteStore::new(path)
                    .map_err(|err| ConfigError::Store { reason: err.to_string() })?
            )
        },
        StoreConfig::DynamoDb => {
            info!(table = %config.table_name, region = %config.region, "using dynamodb store");
            BoxedStore::new(DynamoDbStore::from_config(config).await)
        },
    })
}
