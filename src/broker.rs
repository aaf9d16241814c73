//! Broker connection manager.
//!
//! [`Session`] owns the MQTT client and its event loop and pulls events one
//! at a time on the calling task. Each event is fed to [`Link`], a small
//! state machine (`Disconnected -> Connecting -> Subscribed`) that decides
//! what the session does next: subscribe, hand a publish to the ingestor,
//! or wait before reconnecting.
//!
//! The subscription is reissued on every successful CONNACK, so a clean
//! session that reconnects after a network drop keeps receiving readings
//! without manual intervention.

use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, Publish, QoS,
    SubscribeReasonCode,
};
use tracing::{debug, error, info, trace, warn};

use crate::config::{BrokerConfig, SENSOR_TOPIC};
use crate::error::ConnectionError;
use crate::ingest::Ingestor;
use crate::storage::ReadingSink;

/// Capacity of the client's outgoing request channel.
const REQUEST_CAPACITY: usize = 10;

// ---

/// Where the session is in its connect/subscribe lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Subscribed,
}

/// What the session should do after an event.
#[derive(Debug, PartialEq)]
pub enum Step {
    /// Nothing to do; keep polling.
    Idle,
    /// A CONNACK was accepted; (re)issue the topic subscription.
    Subscribe,
    /// A reading arrived on the sensor topic.
    Deliver(Publish),
}

/// Connection state machine, independent of any socket.
#[derive(Debug)]
pub struct Link {
    state: LinkState,
    backoff: Duration,
    reconnect_min: Duration,
    reconnect_max: Duration,
    connects: u64,
}

impl Link {
    // ---
    pub fn new(reconnect_min: Duration, reconnect_max: Duration) -> Self {
        Self {
            state: LinkState::Disconnected,
            backoff: reconnect_min,
            reconnect_min,
            reconnect_max,
            connects: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Number of accepted CONNACKs so far.
    pub fn connects(&self) -> u64 {
        self.connects
    }

    /// Mark the start of a connection attempt; the next poll dials the broker.
    pub fn begin_connect(&mut self) {
        // ---
        if self.state == LinkState::Disconnected {
            debug!("Connecting to MQTT broker");
            self.state = LinkState::Connecting;
        }
    }

    /// Advance the state machine with one client event.
    pub fn on_event(&mut self, event: Event) -> Step {
        // ---
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                if ack.code == ConnectReturnCode::Success {
                    self.connects += 1;
                    self.backoff = self.reconnect_min;
                    self.state = LinkState::Subscribed;
                    info!(
                        "Connected to MQTT broker with code: {:?} (session_present={}, connect #{})",
                        ack.code, ack.session_present, self.connects
                    );
                    Step::Subscribe
                } else {
                    self.state = LinkState::Disconnected;
                    warn!("MQTT broker refused connection with code: {:?}", ack.code);
                    Step::Idle
                }
            }
            Event::Incoming(Packet::SubAck(ack)) => {
                for code in &ack.return_codes {
                    match code {
                        SubscribeReasonCode::Success(qos) => {
                            info!("Subscribed to {} (granted {:?})", SENSOR_TOPIC, qos)
                        }
                        SubscribeReasonCode::Failure => {
                            warn!("Broker rejected subscription to {}", SENSOR_TOPIC)
                        }
                    }
                }
                Step::Idle
            }
            Event::Incoming(Packet::Publish(publish)) => {
                if publish.topic == SENSOR_TOPIC {
                    Step::Deliver(publish)
                } else {
                    debug!("Ignoring publish on unexpected topic: {}", publish.topic);
                    Step::Idle
                }
            }
            Event::Incoming(Packet::Disconnect) => {
                self.state = LinkState::Disconnected;
                warn!("MQTT broker closed the session, will reconnect");
                Step::Idle
            }
            other => {
                trace!("MQTT event: {:?}", other);
                Step::Idle
            }
        }
    }

    /// Record a dropped connection and return how long to wait before the
    /// next attempt. The delay doubles up to the configured ceiling.
    pub fn on_error(&mut self, err: &rumqttc::ConnectionError) -> Duration {
        // ---
        let delay = self.backoff;
        self.state = LinkState::Disconnected;
        self.backoff = (self.backoff * 2).min(self.reconnect_max);
        warn!(
            "MQTT connection error: {} (reconnecting in {}ms)",
            err,
            delay.as_millis()
        );
        delay
    }
}

/// Build client options from configuration.
pub fn mqtt_options(cfg: &BrokerConfig) -> MqttOptions {
    // ---
    let mut options = MqttOptions::new(cfg.client_id.clone(), cfg.host.clone(), cfg.port);
    options.set_keep_alive(cfg.keepalive);
    options.set_clean_session(true);

    if let Some(creds) = &cfg.credentials {
        options.set_credentials(creds.username.clone(), creds.password.clone());
    }

    options
}

/// An established broker session.
pub struct Session {
    client: AsyncClient,
    eventloop: EventLoop,
    link: Link,
    qos: QoS,
}

impl Session {
    // ---
    /// Open a session and wait for the first CONNACK.
    ///
    /// Any failure here is fatal to startup: an unusable address, an
    /// unreachable broker, or a refused CONNECT (e.g. bad credentials).
    pub async fn connect(cfg: &BrokerConfig) -> Result<Self, ConnectionError> {
        // ---
        if cfg.host.is_empty() || cfg.host.contains("://") || cfg.host.contains(char::is_whitespace)
        {
            return Err(ConnectionError::InvalidAddress {
                host: cfg.host.clone(),
                port: cfg.port,
            });
        }

        info!("Attempting to connect to MQTT broker: {}:{}", cfg.host, cfg.port);

        let (client, eventloop) = AsyncClient::new(mqtt_options(cfg), REQUEST_CAPACITY);
        let mut session = Self {
            client,
            eventloop,
            link: Link::new(cfg.reconnect_min, cfg.reconnect_max),
            qos: cfg.qos,
        };

        session.link.begin_connect();
        loop {
            match session.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack)))
                    if ack.code != ConnectReturnCode::Success =>
                {
                    error!("MQTT broker refused connection with code: {:?}", ack.code);
                    return Err(ConnectionError::Refused(ack.code));
                }
                Ok(event) => {
                    if session.link.on_event(event) == Step::Subscribe {
                        session.subscribe();
                        return Ok(session);
                    }
                }
                Err(rumqttc::ConnectionError::ConnectionRefused(code)) => {
                    error!("MQTT broker refused connection with code: {:?}", code);
                    return Err(ConnectionError::Refused(code));
                }
                Err(e) => {
                    error!("Failed to connect to MQTT broker: {}", e);
                    return Err(ConnectionError::Unreachable(e));
                }
            }
        }
    }

    /// Dispatch loop. Does not return under normal operation.
    ///
    /// Each publish is fully ingested, including its database write, before
    /// the next event is pulled from the client.
    pub async fn run<S: ReadingSink>(mut self, ingestor: &mut Ingestor<S>) {
        // ---
        loop {
            self.link.begin_connect();

            match self.eventloop.poll().await {
                Ok(event) => match self.link.on_event(event) {
                    Step::Subscribe => self.subscribe(),
                    Step::Deliver(publish) => {
                        // Diagnostics are emitted inside the ingestor.
                        let _ = ingestor.on_message(&publish.topic, &publish.payload).await;
                    }
                    Step::Idle => {}
                },
                Err(e) => {
                    let delay = self.link.on_error(&e);
                    let stats = ingestor.stats();
                    debug!(
                        "Ingest stats: received={} inserted={} dropped(decode={} validation={} storage={})",
                        stats.received,
                        stats.inserted,
                        stats.decode_errors,
                        stats.validation_errors,
                        stats.storage_errors
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Queue the topic subscription without waiting on the request channel.
    fn subscribe(&self) {
        // ---
        match self.client.try_subscribe(SENSOR_TOPIC, self.qos) {
            Ok(()) => debug!("Subscription to {} requested ({:?})", SENSOR_TOPIC, self.qos),
            Err(e) => error!("Failed to request subscription to {}: {}", SENSOR_TOPIC, e),
        }
    }
}
