mod metadata_repository;
mod settings;

pub use metadata_repository::*;
pub use settings::*;
