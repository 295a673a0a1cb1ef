pub mod config;
pub mod decoder;
pub mod subscriber;
pub mod topic;

pub use config::WorkerConfig;
pub use decoder::CborEnvelopeDecoder;
pub use subscriber::run_mqtt_subscriber;
pub use topic::{parse_topic, ParsedTopic};
