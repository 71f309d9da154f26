use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub query: QueryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON connection store.
    pub connections_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// Row cap applied when a request does not carry its own.
    pub default_max_rows: usize,
    pub statement_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("storage.connections_file", "./connections.json")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("query.default_max_rows", 100)?
            .set_default("query.statement_timeout_secs", 30)?
            .set_default("logging.level", "info")?;

        // Load from environment variables
        if let Ok(connections_file) = env::var("CONNECTIONS_FILE") {
            builder = builder.set_override("storage.connections_file", connections_file)?;
        }

        if let Ok(host) = env::var("HOST") {
            builder = builder.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            builder = builder.set_override("server.port", port.parse::<u16>().unwrap_or(3000))?;
        }

        if let Ok(max_rows) = env::var("DEFAULT_MAX_ROWS") {
            builder = builder.set_override(
                "query.default_max_rows",
                max_rows.parse::<usize>().unwrap_or(100) as u64,
            )?;
        }

        if let Ok(timeout) = env::var("STATEMENT_TIMEOUT_SECS") {
            builder = builder.set_override(
                "query.statement_timeout_secs",
                timeout.parse::<u64>().unwrap_or(30),
            )?;
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            builder = builder.set_override("logging.level", log_level)?;
        }

        // Try to load from .env file
        let _ = dotenv::dotenv();

        builder.build()?.try_deserialize()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        env::remove_var("CONNECTIONS_FILE");
        env::remove_var("HOST");
        env::remove_var("PORT");
        env::remove_var("DEFAULT_MAX_ROWS");
        env::remove_var("STATEMENT_TIMEOUT_SECS");

        let config = Config::from_env().unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.connections_file, "./connections.json");
        assert_eq!(config.query.default_max_rows, 100);
        assert_eq!(config.query.statement_timeout_secs, 30);
    }
}
