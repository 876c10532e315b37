/// MQTT subscription feeding raw sensor payloads to the dashboard loop
use log::{debug, info, warn};
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use crate::config::MqttSettings;
use crate::transport::{ConnectionStatus, TransportEvent};

const RECONNECT_DELAY_SECS: u64 = 1;
const SUBSCRIBE_RETRY_SECS: u64 = 2;
const REQUEST_CHANNEL_CAPACITY: usize = 32;

/// Subscribe to the sensor topic and forward every publish until the
/// receiving side goes away.
///
/// Connection loss is reported as `Offline` and followed by a fresh client
/// after a short pause.
pub async fn run_listener(settings: MqttSettings, events: mpsc::Sender<TransportEvent>) {
    loop {
        if !report(&events, ConnectionStatus::Connecting).await {
            return;
        }

        let mut options = MqttOptions::new(
            settings.client_id.clone(),
            settings.host.clone(),
            settings.port,
        );
        options.set_keep_alive(Duration::from_secs(settings.keepalive_secs));
        if let Some(username) = &settings.username {
            options.set_credentials(
                username.clone(),
                settings.password.clone().unwrap_or_default(),
            );
        }

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        if let Err(e) = client.subscribe(settings.topic.clone(), QoS::AtLeastOnce).await {
            warn!("Failed to subscribe to {}: {}; retrying", settings.topic, e);
            sleep(Duration::from_secs(SUBSCRIBE_RETRY_SECS)).await;
            continue;
        }

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!(
                        "Connected to MQTT broker {}:{}, subscribed to {}",
                        settings.host, settings.port, settings.topic
                    );
                    if !report(&events, ConnectionStatus::Connected).await {
                        return;
                    }
                }
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    debug!(
                        "Received {} bytes on {}",
                        publish.payload.len(),
                        publish.topic
                    );
                    if events
                        .send(TransportEvent::Payload(publish.payload.to_vec()))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("MQTT connection dropped: {}; reconnecting", e);
                    if !report(&events, ConnectionStatus::Offline).await {
                        return;
                    }
                    break;
                }
            }
        }

        sleep(Duration::from_secs(RECONNECT_DELAY_SECS)).await;
    }
}

async fn report(events: &mpsc::Sender<TransportEvent>, status: ConnectionStatus) -> bool {
    events.send(TransportEvent::Status(status)).await.is_ok()
}
