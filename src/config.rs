use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs the service on the in-memory stores.
    pub db: Option<DbConfig>,
    pub host: String,
    pub port: u16,
    pub upload_max_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let db = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|url| DbConfig {
                url,
                max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            });
        Ok(Self {
            db,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080),
            upload_max_bytes: env_or("UPLOAD_MAX_BYTES", 20 * 1024 * 1024),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db: None,
            host: "127.0.0.1".into(),
            port: 8080,
            upload_max_bytes: 20 * 1024 * 1024,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
