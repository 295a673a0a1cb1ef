use crate::config::WorkerConfig;
use crate::topic::parse_topic;
use anyhow::{Context, Result};
use hydrant_domain::{classify, Channel, DomainError, EnvelopeDecoder, IngestService};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Run the MQTT ingest subscriber until cancellation.
///
/// Subscribes to `+/{channel}` for every known logical channel on a shared
/// (broker-side load-balanced) subscription. Returns an error on transport
/// failure: connection loss is fatal to the process and external
/// supervision is expected to restart it.
pub async fn run_mqtt_subscriber(
    config: &WorkerConfig,
    service: Arc<IngestService>,
    decoder: Arc<dyn EnvelopeDecoder>,
    token: CancellationToken,
) -> Result<()> {
    let mut mqtt_options = MqttOptions::new(
        &config.mqtt_client_id,
        &config.mqtt_host,
        config.mqtt_port,
    );
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    mqtt_options.set_clean_session(true);
    if !config.mqtt_username.is_empty() {
        mqtt_options.set_credentials(&config.mqtt_username, &config.mqtt_password);
    }

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 100);

    for channel in Channel::ALL {
        let filter = format!("+/{}", channel.as_str());
        client
            .subscribe(&filter, QoS::AtLeastOnce)
            .await
            .with_context(|| format!("Failed to subscribe to {}", filter))?;
    }

    info!(
        host = %config.mqtt_host,
        port = config.mqtt_port,
        client_id = %config.mqtt_client_id,
        "subscribed to ingest channels"
    );

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                info!("Received shutdown signal, stopping subscriber");
                let _ = client.disconnect().await;
                return Ok(());
            }
            event = eventloop.poll() => {
                match event {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        handle_publish(
                            Arc::clone(&service),
                            Arc::clone(&decoder),
                            &publish.topic,
                            &publish.payload,
                        );
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("connected to MQTT broker");
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        debug!("subscription acknowledged");
                    }
                    Ok(_) => {
                        // Other events (outgoing, pings, etc.)
                    }
                    Err(e) => {
                        // Transport failure is fatal; the process exits and
                        // gets restarted by its supervisor.
                        return Err(anyhow::anyhow!("MQTT event loop error: {}", e));
                    }
                }
            }
        }
    }
}

/// Classify one inbound message and hand it to the pipeline.
///
/// Decode and shape errors drop the message here; everything past
/// classification runs on its own task so a slow enrichment or publish
/// never blocks the event loop, and there is no cap on in-flight records.
fn handle_publish(
    service: Arc<IngestService>,
    decoder: Arc<dyn EnvelopeDecoder>,
    topic: &str,
    payload: &[u8],
) {
    let parsed = match parse_topic(topic) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(topic = %topic, error = %e, "unparseable topic, message dropped");
            return;
        }
    };

    let Some(channel) = Channel::parse(&parsed.channel_label) else {
        debug!(channel = %parsed.channel_label, "unknown channel, message ignored");
        return;
    };

    let envelope = match decoder.decode(payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(
                topic = %topic,
                error = %e,
                "undecodable envelope, message dropped"
            );
            return;
        }
    };

    let record = match classify(channel, &envelope) {
        Ok(record) => record,
        Err(e) => {
            warn!(topic = %topic, error = %e, "malformed payload, message dropped");
            return;
        }
    };

    let source_id = parsed.source_id;
    tokio::spawn(async move {
        if let Err(e) = service.handle_record(&source_id, record).await {
            match e {
                DomainError::DeviceNotFound(_)
                | DomainError::AssetNotFound(_)
                | DomainError::SensorNotFound(_) => {
                    warn!(source_id = %source_id, error = %e, "metadata missing, record aborted");
                }
                DomainError::Publish(_) => {
                    error!(source_id = %source_id, error = %e, "publish failed, buffer left intact");
                }
                other => {
                    error!(source_id = %source_id, error = %other, "record processing failed");
                }
            }
        }
    });
}
