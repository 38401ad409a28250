// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter identity and health checks for the database handle.

use async_trait::async_trait;
use tracing::debug;

use cinebot_core::{AdapterType, CinebotError, HealthStatus, PluginAdapter};

use crate::database::{Database, map_tr_err};

#[async_trait]
impl PluginAdapter for Database {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, CinebotError> {
        self.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CinebotError> {
        self.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("shutdown: WAL checkpoint complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn database_reports_identity_and_health() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(db.name(), "sqlite");
        assert_eq!(db.adapter_type(), AdapterType::Storage);
        assert_eq!(db.health_check().await.unwrap(), HealthStatus::Healthy);
        db.shutdown().await.unwrap();
    }
}
