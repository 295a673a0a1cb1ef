mod client;
mod producer;
mod traits;

pub use client::*;
pub use producer::*;
pub use traits::*;

#[cfg(any(test, feature = "testing"))]
pub use traits::MockJetStreamPublisher;
