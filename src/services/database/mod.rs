// Engine drivers and the factory that turns stored descriptors into
// unopened connection handles.
mod catalog;
mod mysql;
mod oracle;
mod postgres;
mod session;
mod sqlite;
mod sqlserver;

pub use session::{CappedRows, DatabaseSession, SqlRow};

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncWriteCompatExt;
use tracing::warn;

use crate::api::middleware::AppError;
use crate::models::{ConnectionDescriptor, EngineKind};
use crate::storage::ConnectionRegistry;

use self::mysql::MySqlSession;
use self::oracle::OracleSession;
use self::postgres::PostgresSession;
use self::sqlite::SqliteSession;
use self::sqlserver::SqlServerSession;

/// A parsed, validated, but not yet opened connection. Parsing the
/// connection string happens here so a bad descriptor fails before any
/// network traffic; `open` performs the actual connect.
pub enum ConnectionHandle {
    PostgreSql {
        config: tokio_postgres::Config,
        database: String,
    },
    MySql {
        opts: mysql_async::Opts,
        connect_timeout: Option<Duration>,
        database: String,
    },
    SqlServer {
        config: tiberius::Config,
        connect_timeout: Option<Duration>,
        database: String,
    },
    Oracle {
        username: String,
        password: String,
        connect_descriptor: String,
        database: String,
    },
    Sqlite {
        path: String,
        database: String,
    },
}

impl ConnectionHandle {
    /// Name of the database the handle points at, known before opening.
    pub fn database_name(&self) -> &str {
        match self {
            ConnectionHandle::PostgreSql { database, .. }
            | ConnectionHandle::MySql { database, .. }
            | ConnectionHandle::SqlServer { database, .. }
            | ConnectionHandle::Oracle { database, .. }
            | ConnectionHandle::Sqlite { database, .. } => database,
        }
    }

    /// Open the connection and hand back a live session.
    pub async fn open(self) -> Result<Box<dyn DatabaseSession>, AppError> {
        match self {
            ConnectionHandle::PostgreSql { config, database } => {
                let (client, connection) =
                    config.connect(tokio_postgres::NoTls).await.map_err(|e| {
                        AppError::Connection(format!("PostgreSQL connect failed: {}", e))
                    })?;
                // The connection object drives the socket until the client
                // is dropped.
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("PostgreSQL connection task ended: {}", e);
                    }
                });
                Ok(Box::new(PostgresSession::new(client, database)))
            }
            ConnectionHandle::MySql {
                opts,
                connect_timeout,
                database,
            } => {
                // The mysql_async options carry no connect timeout, so it
                // is enforced around the connect future instead.
                let connect = mysql_async::Conn::new(opts);
                let conn = match connect_timeout {
                    Some(limit) => tokio::time::timeout(limit, connect).await.map_err(|_| {
                        AppError::Connection(format!(
                            "MySQL connect timed out after {:?}",
                            limit
                        ))
                    })?,
                    None => connect.await,
                }
                .map_err(|e| AppError::Connection(format!("MySQL connect failed: {}", e)))?;
                Ok(Box::new(MySqlSession::new(conn, database)))
            }
            ConnectionHandle::SqlServer {
                config,
                connect_timeout,
                database,
            } => {
                let addr = config.get_addr();
                let connect = TcpStream::connect(&addr);
                let tcp = match connect_timeout {
                    Some(limit) => tokio::time::timeout(limit, connect).await.map_err(|_| {
                        AppError::Connection(format!(
                            "SQL Server connect to {} timed out after {:?}",
                            addr, limit
                        ))
                    })?,
                    None => connect.await,
                }
                .map_err(|e| AppError::Connection(format!("SQL Server connect failed: {}", e)))?;
                tcp.set_nodelay(true)
                    .map_err(|e| AppError::Connection(format!("SQL Server socket setup failed: {}", e)))?;

                let client = tiberius::Client::connect(config, tcp.compat_write())
                    .await
                    .map_err(|e| AppError::Connection(format!("SQL Server login failed: {}", e)))?;
                Ok(Box::new(SqlServerSession::new(client, database)))
            }
            ConnectionHandle::Oracle {
                username,
                password,
                connect_descriptor,
                database,
            } => {
                let conn = tokio::task::spawn_blocking(move || {
                    ::oracle::Connection::connect(&username, &password, &connect_descriptor)
                })
                .await
                .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?
                .map_err(|e| AppError::Connection(format!("Oracle connect failed: {}", e)))?;
                Ok(Box::new(OracleSession::new(conn, database)))
            }
            ConnectionHandle::Sqlite { path, database } => {
                let conn = tokio::task::spawn_blocking(move || rusqlite::Connection::open(&path))
                    .await
                    .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?
                    .map_err(|e| AppError::Connection(format!("SQLite open failed: {}", e)))?;
                Ok(Box::new(SqliteSession::new(conn, database)))
            }
        }
    }
}

/// Builds connection handles from stored descriptors.
pub struct DriverFactory {
    registry: Arc<ConnectionRegistry>,
}

impl DriverFactory {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn build_by_id(&self, connection_id: &str) -> Result<ConnectionHandle, AppError> {
        let descriptor = self.registry.get(connection_id).await.ok_or_else(|| {
            AppError::NotFound(format!("Connection '{}' not found", connection_id))
        })?;
        Self::build(&descriptor)
    }

    pub fn build(descriptor: &ConnectionDescriptor) -> Result<ConnectionHandle, AppError> {
        let timeout = match descriptor.connection_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs as u64)),
        };

        match descriptor.database_type {
            EngineKind::PostgreSql => {
                let mut config: tokio_postgres::Config =
                    descriptor.connection_string.parse().map_err(|e| {
                        AppError::Validation(format!("Invalid PostgreSQL connection string: {}", e))
                    })?;
                if let Some(limit) = timeout {
                    config.connect_timeout(limit);
                }
                let database = config.get_dbname().unwrap_or("postgres").to_string();
                Ok(ConnectionHandle::PostgreSql { config, database })
            }
            EngineKind::MySql => {
                let opts = mysql_async::Opts::from_url(&descriptor.connection_string)
                    .map_err(|e| {
                        AppError::Validation(format!("Invalid MySQL connection string: {}", e))
                    })?;
                let database = opts.db_name().unwrap_or_default().to_string();
                Ok(ConnectionHandle::MySql {
                    opts,
                    connect_timeout: timeout,
                    database,
                })
            }
            EngineKind::SqlServer => {
                let config = tiberius::Config::from_ado_string(&descriptor.connection_string)
                    .map_err(|e| {
                        AppError::Validation(format!(
                            "Invalid SQL Server connection string: {}",
                            e
                        ))
                    })?;
                let database =
                    ado_value(&descriptor.connection_string, &["database", "initial catalog"])
                        .unwrap_or_else(|| "master".to_string());
                Ok(ConnectionHandle::SqlServer {
                    config,
                    connect_timeout: timeout,
                    database,
                })
            }
            EngineKind::Oracle => {
                let (username, password, connect_descriptor) =
                    oracle_credentials(&descriptor.connection_string)?;
                let database = connect_descriptor.clone();
                Ok(ConnectionHandle::Oracle {
                    username,
                    password,
                    connect_descriptor,
                    database,
                })
            }
            EngineKind::Sqlite => {
                let path = sqlite_path(&descriptor.connection_string);
                if path.is_empty() {
                    return Err(AppError::Validation(
                        "SQLite connection string has no file path".to_string(),
                    ));
                }
                let database = std::path::Path::new(&path)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("main")
                    .to_string();
                Ok(ConnectionHandle::Sqlite { path, database })
            }
        }
    }
}

/// Accepts the native `user/password@connect-descriptor` form or
/// `User Id=…;Password=…;Data Source=…` key/value pairs.
fn oracle_credentials(connection_string: &str) -> Result<(String, String, String), AppError> {
    if !connection_string.contains('=') {
        let (credentials, connect_descriptor) =
            connection_string.split_once('@').ok_or_else(|| {
                AppError::Validation(
                    "Oracle connection string must look like user/password@host/service"
                        .to_string(),
                )
            })?;
        let (username, password) = credentials.split_once('/').unwrap_or((credentials, ""));
        if username.is_empty() || connect_descriptor.is_empty() {
            return Err(AppError::Validation(
                "Oracle connection string is missing the user or connect descriptor".to_string(),
            ));
        }
        return Ok((
            username.to_string(),
            password.to_string(),
            connect_descriptor.to_string(),
        ));
    }

    let username = ado_value(connection_string, &["user id", "user"]).ok_or_else(|| {
        AppError::Validation("Oracle connection string is missing 'User Id'".to_string())
    })?;
    let password = ado_value(connection_string, &["password"]).unwrap_or_default();
    let connect_descriptor = ado_value(connection_string, &["data source"]).ok_or_else(|| {
        AppError::Validation("Oracle connection string is missing 'Data Source'".to_string())
    })?;
    Ok((username, password, connect_descriptor))
}

/// Look up one key in a semicolon-delimited `Key=Value` connection string,
/// case-insensitively.
fn ado_value(connection_string: &str, keys: &[&str]) -> Option<String> {
    for pair in connection_string.split(';') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        if keys.contains(&key.as_str()) {
            return Some(value.trim().to_string());
        }
    }
    None
}

/// Accepts `sqlite:path`, `sqlite://path`, `Data Source=path` or a bare
/// file path.
fn sqlite_path(connection_string: &str) -> String {
    if let Some(path) = ado_value(connection_string, &["data source"]) {
        return path;
    }
    let stripped = connection_string
        .strip_prefix("sqlite:")
        .unwrap_or(connection_string);
    let stripped = stripped.strip_prefix("//").unwrap_or(stripped);
    stripped.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(kind: EngineKind, conn_str: &str) -> ConnectionDescriptor {
        ConnectionDescriptor::new("test".to_string(), kind, conn_str.to_string())
    }

    #[test]
    fn postgres_handle_knows_its_database() {
        let d = descriptor(
            EngineKind::PostgreSql,
            "postgresql://user:pw@localhost:5432/sales",
        );
        let handle = DriverFactory::build(&d).unwrap();
        assert_eq!(handle.database_name(), "sales");
    }

    #[test]
    fn mysql_handle_carries_connect_timeout() {
        let mut d = descriptor(EngineKind::MySql, "mysql://user:pw@localhost:3306/sales");
        d.connection_timeout = 5;
        match DriverFactory::build(&d).unwrap() {
            ConnectionHandle::MySql {
                connect_timeout,
                database,
                ..
            } => {
                assert_eq!(connect_timeout, Some(Duration::from_secs(5)));
                assert_eq!(database, "sales");
            }
            _ => panic!("expected a MySQL handle"),
        }

        d.connection_timeout = 0;
        match DriverFactory::build(&d).unwrap() {
            ConnectionHandle::MySql {
                connect_timeout, ..
            } => assert_eq!(connect_timeout, None),
            _ => panic!("expected a MySQL handle"),
        }
    }

    #[test]
    fn mysql_rejects_malformed_url() {
        let d = descriptor(EngineKind::MySql, "not a url");
        assert!(matches!(
            DriverFactory::build(&d),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn sqlserver_database_falls_back_to_master() {
        let d = descriptor(
            EngineKind::SqlServer,
            "Server=localhost,1433;User Id=sa;Password=pw;TrustServerCertificate=true",
        );
        let handle = DriverFactory::build(&d).unwrap();
        assert_eq!(handle.database_name(), "master");
    }

    #[test]
    fn oracle_requires_user_and_data_source() {
        let d = descriptor(EngineKind::Oracle, "Password=pw;Data Source=localhost/XE");
        assert!(matches!(
            DriverFactory::build(&d),
            Err(AppError::Validation(_))
        ));

        let d = descriptor(
            EngineKind::Oracle,
            "User Id=scott;Password=tiger;Data Source=localhost/XE",
        );
        let handle = DriverFactory::build(&d).unwrap();
        assert_eq!(handle.database_name(), "localhost/XE");
    }

    #[test]
    fn oracle_accepts_native_credential_form() {
        let (user, password, descriptor) =
            oracle_credentials("scott/tiger@db.example.com:1521/XEPDB1").unwrap();
        assert_eq!(user, "scott");
        assert_eq!(password, "tiger");
        assert_eq!(descriptor, "db.example.com:1521/XEPDB1");

        assert!(matches!(
            oracle_credentials("scott/tiger"),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn build_by_id_resolves_through_the_registry() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = Arc::new(
            crate::storage::ConnectionRegistry::load(dir.path().join("connections.json")).await,
        );
        registry
            .add(descriptor(EngineKind::Sqlite, "sqlite:data/app.db"))
            .await
            .unwrap();
        let factory = DriverFactory::new(registry);

        let handle = factory.build_by_id("test").await.unwrap();
        assert_eq!(handle.database_name(), "app");

        assert!(matches!(
            factory.build_by_id("ghost").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn sqlite_path_accepts_common_spellings() {
        assert_eq!(sqlite_path("sqlite:///tmp/db.sqlite"), "/tmp/db.sqlite");
        assert_eq!(sqlite_path("sqlite:data/app.db"), "data/app.db");
        assert_eq!(sqlite_path("Data Source=./app.db"), "./app.db");
        assert_eq!(sqlite_path("/var/lib/app.db"), "/var/lib/app.db");
    }
}
