use serde::Deserialize;

/// Which `UserRepository` implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" => Ok(Self::Memory),
            other => anyhow::bail!("unknown USER_STORE backend: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub store: StoreBackend,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = match var("DATABASE_URL") {
            Some(url) => url,
            None => {
                let host = var("DB_HOST").unwrap_or_else(|| "localhost".into());
                let port = var("DB_PORT").unwrap_or_else(|| "5432".into());
                let user = var("DB_USERNAME").unwrap_or_else(|| "postgres".into());
                let password = var("DB_PASSWORD").unwrap_or_default();
                let database = var("DB_DATABASE").unwrap_or_else(|| "crud_api".into());
                format!("postgres://{user}:{password}@{host}:{port}/{database}")
            }
        };
        let max_connections = var("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let store = match var("USER_STORE") {
            Some(v) => v.parse()?,
            None => StoreBackend::Postgres,
        };
        let host = var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match var("APP_PORT") {
            Some(v) => v.parse::<u16>()?,
            None => 3000,
        };
        Ok(Self {
            database_url,
            max_connections,
            store,
            host,
            port,
        })
    }
}
