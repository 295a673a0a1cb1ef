use crate::settings::PostgresSettings;
use anyhow::Result;
use async_trait::async_trait;
use deadpool_postgres::Pool;
use hydrant_domain::{
    Asset, AssetLocation, ClientRef, Device, DomainError, DomainResult, MetadataRepository,
    SensorDescriptor, SensorKind,
};
use tokio_postgres::Row;
use tracing::{debug, instrument};

/// Postgres implementation of the metadata lookups the pipeline performs.
///
/// The schema is owned by the platform's provisioning service; this
/// repository only reads the device/asset/sensor hierarchy and writes back
/// device-reported geolocation and reset-log entries.
#[derive(Clone)]
pub struct PostgresMetadataRepository {
    pool: Pool,
}

impl PostgresMetadataRepository {
    pub fn connect(settings: &PostgresSettings) -> Result<Self> {
        Ok(Self {
            pool: settings.build_pool()?,
        })
    }

    /// Verify connectivity before the worker starts consuming.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.pool.get().await?;
        conn.execute("SELECT 1", &[]).await?;
        debug!("metadata store reachable");
        Ok(())
    }

    async fn conn(&self) -> DomainResult<deadpool_postgres::Client> {
        self.pool
            .get()
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))
    }
}

fn device_from_row(row: &Row) -> Device {
    Device {
        device_id: row.get("device_id"),
        source_id: row.get("source_id"),
        serial_number: row.get("serial_number"),
        kind: row.get("device_kind"),
        description: row.get("description"),
        asset_id: row.get("asset_id"),
        client: ClientRef {
            client_id: row.get("client_id"),
            tag_code: row.get("client_tag_code"),
        },
    }
}

fn asset_from_row(row: &Row) -> Asset {
    Asset {
        asset_id: row.get("asset_id"),
        tag_code: row.get("tag_code"),
        name: row.get("name"),
        description: row.get("description"),
        location: AssetLocation {
            tag_code: row.get("location_tag_code"),
            description: row.get("location_description"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
        },
    }
}

fn sensor_from_row(row: &Row) -> DomainResult<SensorDescriptor> {
    let code: i16 = row.get("kind");
    let kind = SensorKind::from_code(code)
        .ok_or_else(|| DomainError::Decode(format!("unknown sensor kind code {}", code)))?;
    Ok(SensorDescriptor {
        sensor_id: row.get("sensor_id"),
        kind,
        type_string: row.get("type_string"),
        tag_code: row.get("tag_code"),
        description: row.get("description"),
        unit: row.get("unit"),
    })
}

#[async_trait]
impl MetadataRepository for PostgresMetadataRepository {
    #[instrument(skip(self), fields(source_id = %source_id))]
    async fn find_device_by_source(&self, source_id: &str) -> DomainResult<Option<Device>> {
        let conn = self.conn().await?;

        let row = conn
            .query_opt(
                "SELECT d.device_id, d.source_id, d.serial_number, d.device_kind, \
                        d.description, d.asset_id, c.client_id, c.tag_code AS client_tag_code \
                 FROM devices d \
                 JOIN clients c ON c.client_id = d.client_id \
                 WHERE d.source_id = $1",
                &[&source_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(found = row.is_some(), "device lookup");
        Ok(row.as_ref().map(device_from_row))
    }

    #[instrument(skip(self), fields(asset_id = %asset_id))]
    async fn find_asset(&self, asset_id: &str) -> DomainResult<Option<Asset>> {
        let conn = self.conn().await?;

        let row = conn
            .query_opt(
                "SELECT a.asset_id, a.tag_code, a.name, a.description, \
                        l.tag_code AS location_tag_code, \
                        l.description AS location_description, \
                        l.latitude, l.longitude \
                 FROM assets a \
                 JOIN locations l ON l.location_id = a.location_id \
                 WHERE a.asset_id = $1",
                &[&asset_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.as_ref().map(asset_from_row))
    }

    #[instrument(skip(self), fields(kind = %kind))]
    async fn find_sensor_by_kind(
        &self,
        kind: SensorKind,
    ) -> DomainResult<Option<SensorDescriptor>> {
        let conn = self.conn().await?;

        let row = conn
            .query_opt(
                "SELECT sensor_id, kind, type_string, tag_code, description, unit \
                 FROM sensors \
                 WHERE kind = $1",
                &[&kind.code()],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        row.as_ref().map(sensor_from_row).transpose()
    }

    #[instrument(skip(self), fields(source_id = %source_id))]
    async fn update_device_geolocation(
        &self,
        source_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> DomainResult<()> {
        let conn = self.conn().await?;

        let updated = conn
            .execute(
                "UPDATE devices \
                 SET latitude = $2, longitude = $3, updated_at = now() \
                 WHERE source_id = $1",
                &[&source_id, &latitude, &longitude],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        if updated == 0 {
            return Err(DomainError::DeviceNotFound(source_id.to_string()));
        }

        // Keep the bound location's coordinates in step with the device.
        conn.execute(
            "UPDATE locations l \
             SET latitude = $2, longitude = $3, updated_at = now() \
             FROM devices d \
             WHERE d.location_id = l.location_id AND d.source_id = $1",
            &[&source_id, &latitude, &longitude],
        )
        .await
        .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(latitude, longitude, "geolocation updated");
        Ok(())
    }

    #[instrument(skip(self, entry), fields(source_id = %source_id))]
    async fn append_device_reset(
        &self,
        source_id: &str,
        entry: serde_json::Value,
    ) -> DomainResult<()> {
        let conn = self.conn().await?;

        let updated = conn
            .execute(
                "UPDATE devices \
                 SET resets = coalesce(resets, '[]'::jsonb) || $2::jsonb, \
                     updated_at = now() \
                 WHERE source_id = $1",
                &[&source_id, &entry],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        if updated == 0 {
            return Err(DomainError::DeviceNotFound(source_id.to_string()));
        }

        debug!("device reset entry saved");
        Ok(())
    }
}
