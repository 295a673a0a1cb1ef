use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Failed to decode envelope: {0}")]
    Decode(String),

    #[error("Device not found for source {0}")]
    DeviceNotFound(String),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Sensor descriptor not found for kind {0}")]
    SensorNotFound(String),

    #[error("Fragment set missing for key {0}")]
    FragmentGone(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}
