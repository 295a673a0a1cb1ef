mod channel;
mod composer;
mod dispatch;
mod document;
mod envelope;
mod error;
mod fragment;
mod metadata;
mod microtime;
mod producer;
mod service;

pub use channel::*;
pub use composer::*;
pub use dispatch::*;
pub use document::*;
pub use envelope::*;
pub use error::*;
pub use fragment::*;
pub use metadata::*;
pub use microtime::*;
pub use producer::*;
pub use service::*;

// Re-export mocks when the testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use fragment::MockFragmentStore;
#[cfg(any(test, feature = "testing"))]
pub use metadata::MockMetadataRepository;
#[cfg(any(test, feature = "testing"))]
pub use producer::MockDocumentProducer;
