// $t@$h
use crate::config::Config;
use crate::error::BridgeError;
use crate::types::*;
use anyhow::Result;
use log::{debug, info, warn};
use rumqttc::QoS;
use std::time::Duration;

/// Process-wide client library state. `init` runs before any session is
/// created and `cleanup` after the last one is destroyed.
pub trait Backend {
    type Session: Session;

    fn init(&mut self) -> Result<()>;
    fn new_session(&mut self, client_id: Option<&str>, clean_session: bool) -> Result<Self::Session>;
    fn destroy(&mut self, session: Self::Session);
    fn cleanup(&mut self);
}

/// One broker session. The network loop runs between `loop_start` and
/// `loop_stop`.
pub trait Session {
    fn set_credentials(&mut self, username: &str, password: Option<&str>) -> Result<()>;
    fn connect(&mut self, host: &str, port: u16, keep_alive: Duration) -> Result<()>;
    fn loop_start(&mut self) -> Result<()>;
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<()>;
    fn loop_stop(&mut self) -> Result<()>;
    fn disconnect(&mut self) -> Result<()>;
}

/// The single live link to the broker. Dropping it tears down whatever was
/// set up, in reverse order.
pub struct Connection<B: Backend> {
    backend: B,
    session: Option<B::Session>,
    topic: String,
    running: bool,
    released: bool,
}

impl<B: Backend> Connection<B> {
    pub fn open(mut backend: B, config: &Config) -> Result<Self, BridgeError> {
        backend.init().map_err(BridgeError::Init)?;

        let mut conn = Connection {
            backend,
            session: None,
            topic: config.topic.clone(),
            running: false,
            released: false,
        };

        let session = conn
            .backend
            .new_session(config.client_id.as_deref(), CLEAN_SESSION)
            .map_err(BridgeError::Session)?;
        let session = conn.session.insert(session);

        if let Some(username) = config.username.as_deref() {
            session
                .set_credentials(username, config.password.as_deref())
                .map_err(BridgeError::Credentials)?;
        }

        session
            .connect(&config.hostname, config.port, KEEP_ALIVE)
            .map_err(|source| BridgeError::Connect {
                endpoint: config.endpoint(),
                source,
            })?;
        info!("connected to {}", config.endpoint());

        session.loop_start().map_err(BridgeError::LoopStart)?;
        conn.running = true;

        Ok(conn)
    }

    pub fn publish(&mut self, payload: &[u8]) -> Result<()> {
        match self.session.as_mut() {
            Some(session) => session.publish(&self.topic, payload, PUBLISH_QOS, PUBLISH_RETAIN),
            None => anyhow::bail!("session already closed"),
        }
    }

    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            if self.running {
                self.running = false;
                if let Err(e) = session.loop_stop() {
                    warn!("failed to stop network loop: {:#}", e);
                }
                let _ = session.disconnect();
            }
            self.backend.destroy(session);
        }
        if !self.released {
            self.released = true;
            self.backend.cleanup();
            debug!("client library released");
        }
    }
}

impl<B: Backend> Drop for Connection<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
