use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::AppError;

/// Supported database engines (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineKind {
    #[serde(rename = "postgresql", alias = "postgres")]
    PostgreSql,
    #[serde(rename = "sqlserver")]
    SqlServer,
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "oracle")]
    Oracle,
    #[serde(rename = "sqlite")]
    Sqlite,
}

impl EngineKind {
    pub fn from_str(s: &str) -> Result<Self, AppError> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(EngineKind::PostgreSql),
            "sqlserver" => Ok(EngineKind::SqlServer),
            "mysql" => Ok(EngineKind::MySql),
            "oracle" => Ok(EngineKind::Oracle),
            "sqlite" => Ok(EngineKind::Sqlite),
            _ => Err(AppError::UnsupportedEngine(format!(
                "Unsupported database type: {}. Supported types: postgresql, sqlserver, mysql, oracle, sqlite",
                s
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::PostgreSql => "postgresql",
            EngineKind::SqlServer => "sqlserver",
            EngineKind::MySql => "mysql",
            EngineKind::Oracle => "oracle",
            EngineKind::Sqlite => "sqlite",
        }
    }
}

/// A stored configuration identifying one database and how to reach it.
///
/// Serialized field names match the connection store document; the id is
/// caller-assigned and immutable for the lifetime of the descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub connection_id: String,
    #[serde(default)]
    pub connection_name: Option<String>,
    pub database_type: EngineKind,
    pub connection_string: String,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connect timeout in seconds; 0 means "use the driver default".
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u32,
    #[serde(default = "default_command_timeout")]
    pub command_timeout: u32,
    #[serde(default = "default_read_only")]
    pub read_only: bool,
    #[serde(default)]
    pub semantic_model_path: Option<String>,
    /// Reserved: no component reads this today.
    #[serde(default = "default_metadata_cache_duration")]
    pub metadata_cache_duration: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout() -> u32 {
    30
}

fn default_command_timeout() -> u32 {
    60
}

fn default_read_only() -> bool {
    true
}

fn default_metadata_cache_duration() -> u32 {
    3600
}

impl ConnectionDescriptor {
    pub fn new(connection_id: String, database_type: EngineKind, connection_string: String) -> Self {
        Self {
            connection_id,
            connection_name: None,
            database_type,
            connection_string,
            schema_name: None,
            max_connections: default_max_connections(),
            connection_timeout: default_connection_timeout(),
            command_timeout: default_command_timeout(),
            read_only: default_read_only(),
            semantic_model_path: None,
            metadata_cache_duration: default_metadata_cache_duration(),
            tags: Vec::new(),
            description: None,
            created_by: None,
            created_at: Some(Utc::now()),
            updated_at: None,
        }
    }
}
