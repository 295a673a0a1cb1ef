use anyhow::Result;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use serde::{Deserialize, Serialize};
use tokio_postgres::NoTls;

/// Connection settings for the metadata store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub pool_size: usize,
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "hydrant".to_string(),
            user: "hydrant".to_string(),
            password: String::new(),
            pool_size: 8,
        }
    }
}

impl PostgresSettings {
    fn pool_config(&self) -> Config {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.database.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg
    }

    /// Build the connection pool, sized to `pool_size`.
    pub fn build_pool(&self) -> Result<Pool> {
        let pool = self.pool_config().create_pool(Some(Runtime::Tokio1), NoTls)?;
        pool.resize(self.pool_size);
        Ok(pool)
    }
}
