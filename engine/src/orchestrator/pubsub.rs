//! The Pub/Sub Sink: a typed publisher over the four detection topics plus
//! `system/health` (§6). Modeled as a trait so the Orchestrator never depends on a
//! concrete transport; the `lapin` (AMQP) implementation below is the one concrete
//! collaborator this crate ships, matching the broker this codebase already speaks to
//! elsewhere.

use eyre::Result;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use ridsentinel_types::{DetectionEvent, HealthMessage, ThreatLevel};
use serde::Serialize;
use serde_json::json;
use tracing::{trace, warn};

pub const TOPIC_DETECTION: &str = "drone/detection";
pub const TOPIC_POSITION: &str = "drone/position";
pub const TOPIC_CLASSIFICATION: &str = "drone/classification";
pub const TOPIC_ALERT: &str = "drone/alert";
pub const TOPIC_HEALTH: &str = "system/health";

/// Subset of a detection published on `drone/position`.
#[derive(Clone, Debug, Serialize)]
pub struct PositionUpdate {
    pub uas_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_mps: Option<f32>,
    pub threat_level: Option<ThreatLevel>,
}

impl From<&DetectionEvent> for PositionUpdate {
    fn from(event: &DetectionEvent) -> Self {
        let loc = event.record.location_vector.as_ref();
        Self {
            uas_id: event.record.basic_id.as_ref().map(|b| b.uas_id.clone()),
            latitude: loc.and_then(|l| l.latitude),
            longitude: loc.and_then(|l| l.longitude),
            speed_mps: loc.and_then(|l| l.speed_mps),
            threat_level: event.threat.as_ref().map(|t| t.level),
        }
    }
}

/// The four detection topics plus the heartbeat, as an explicit trait so the
/// Orchestrator's Emitter worker never blocks the pipeline on a concrete transport.
#[async_trait::async_trait]
pub trait PubSubSink: Send + Sync {
    async fn publish_detection(&self, event: &DetectionEvent) -> Result<()>;
    async fn publish_position(&self, event: &DetectionEvent) -> Result<()>;
    async fn publish_classification(&self, event: &DetectionEvent) -> Result<()>;
    async fn publish_alert(&self, event: &DetectionEvent) -> Result<()>;
    async fn publish_health(&self, health: &HealthMessage) -> Result<()>;
}

/// Publish a full detection; alerts are gated on threat level here so callers never
/// have to remember the MEDIUM/HIGH rule themselves.
pub async fn emit(sink: &dyn PubSubSink, event: &DetectionEvent) -> Result<()> {
    sink.publish_detection(event).await?;
    sink.publish_position(event).await?;
    sink.publish_classification(event).await?;

    if matches!(event.threat.as_ref().map(|t| t.level), Some(ThreatLevel::Medium) | Some(ThreatLevel::High)) {
        sink.publish_alert(event).await?;
    }
    Ok(())
}

/// AMQP-backed sink. Topics map to routing keys on a single topic exchange; QoS
/// distinctions from §6 (at-least-once / exactly-once / at-most-once) are approximated
/// by publisher-confirms usage at the call site, not modeled in the type system here.
pub struct AmqpSink {
    channel: Channel,
    exchange: String,
}

impl AmqpSink {
    pub async fn connect(amqp_url: &str, exchange: &str) -> Result<Self> {
        trace!("connecting to {amqp_url}");
        let conn = Connection::connect(amqp_url, ConnectionProperties::default()).await?;
        let channel = conn.create_channel().await?;
        channel
            .exchange_declare(exchange, ExchangeKind::Topic, ExchangeDeclareOptions::default(), FieldTable::default())
            .await?;
        Ok(Self { channel, exchange: exchange.to_string() })
    }

    async fn publish_json(&self, routing_key: &str, payload: &impl Serialize) -> Result<()> {
        let body = serde_json::to_vec(&json!(payload))?;
        self.channel
            .basic_publish(&self.exchange, routing_key, BasicPublishOptions::default(), &body, BasicProperties::default())
            .await?
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PubSubSink for AmqpSink {
    async fn publish_detection(&self, event: &DetectionEvent) -> Result<()> {
        self.publish_json(TOPIC_DETECTION, event).await
    }

    async fn publish_position(&self, event: &DetectionEvent) -> Result<()> {
        self.publish_json(TOPIC_POSITION, &PositionUpdate::from(event)).await
    }

    async fn publish_classification(&self, event: &DetectionEvent) -> Result<()> {
        self.publish_json(TOPIC_CLASSIFICATION, event).await
    }

    async fn publish_alert(&self, event: &DetectionEvent) -> Result<()> {
        self.publish_json(TOPIC_ALERT, event).await
    }

    async fn publish_health(&self, health: &HealthMessage) -> Result<()> {
        self.publish_json(TOPIC_HEALTH, health).await
    }
}

/// A publish failure is logged and the pipeline continues (§7): a detection is never
/// blocked by a downstream outage.
pub async fn emit_best_effort(sink: &dyn PubSubSink, event: &DetectionEvent) {
    if let Err(e) = emit(sink, event).await {
        warn!("pub/sub publish failed, continuing: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ridsentinel_types::{Provenance, RemoteIdRecord, Transport};

    fn event() -> DetectionEvent {
        DetectionEvent {
            id: 1,
            record: RemoteIdRecord::new(Provenance {
                source_timestamp: Utc::now(),
                transport: Transport::WifiBeacon,
                source_address: None,
                center_freq_hz: None,
                gain_db: None,
            }),
            threat: None,
            operator_distance_m: None,
            zone_name: None,
        }
    }

    #[test]
    fn test_position_update_from_empty_record_has_no_uas_id() {
        let e = event();
        let p = PositionUpdate::from(&e);
        assert!(p.uas_id.is_none());
    }
}
