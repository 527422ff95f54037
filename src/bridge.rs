//! MQTT bridge wiring.
//!
//! Demonstration glue only: a periodic publish task that flattens
//! [`Snapshot`]s to MQTT topic/payload pairs, plus a thin command channel
//! that turns inbound messages into [`Controller::apply_command`] calls.

use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use embedded_svc::mqtt::client::Publish;
use esp_idf_svc::mqtt::client::QoS;
use log::{info, warn};
use serde_json::Value;

use p1p2_aux_control::command::Command;
use p1p2_aux_control::control::Controller;
use p1p2_aux_control::state::Snapshot;

use crate::idf_mqtt::MqttClientType;

type DataMap = HashMap<String, Value>;

/// Flatten a snapshot into per-field MQTT topic/payload pairs.
pub fn snapshot_to_mqtt(snapshot: &Snapshot, topic_prefix: &str) -> anyhow::Result<Vec<(String, String)>> {
    let json = serde_json::to_string(snapshot)?;
    let fields: DataMap = serde_json::from_str(&json)?;
    Ok(fields
        .into_iter()
        .map(|(key, value)| (format!("{}/{}", topic_prefix, key), value.to_string()))
        .collect())
}

/// Publish-task body: take a snapshot, flatten it, push each field to its
/// own topic. Errors are logged and swallowed rather than propagated —
/// one bad publish shouldn't stop the rest of the fields going out.
pub fn publish_snapshot(
    controller: &Controller,
    client: &mut MqttClientType,
    topic_prefix: &str,
) {
    let snapshot = controller.snapshot_and_clear();
    match snapshot_to_mqtt(&snapshot, topic_prefix) {
        Ok(fields) => {
            for (topic, payload) in fields {
                if let Err(e) = client.publish(&topic, QoS::AtMostOnce, false, payload.as_bytes())
                {
                    warn!("mqtt publish error on {}: {:?}", topic, e);
                }
            }
        }
        Err(e) => warn!("snapshot flatten error: {:?}", e),
    }
}

/// Command-task body: drain inbound commands from `rx` and apply them.
/// Runs on its own thread; `Controller` is `Sync` via its internal
/// mutexes so an `Arc<Controller>` is all callers need to share.
pub fn command_task(controller: Arc<Controller>, rx: Receiver<Command>) {
    for cmd in rx.iter() {
        if let Err(e) = controller.apply_command(cmd) {
            warn!("command rejected: {:?}", e);
        } else {
            info!("command applied: {:?}", cmd);
        }
    }
}
