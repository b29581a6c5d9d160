// $t@$h
use crate::connection::{Backend, Session};
use crate::types::*;
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, trace, warn};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// `rumqttc` backend. The library state is a tokio runtime that hosts the
/// event loop for the lifetime of the connection.
#[derive(Default)]
pub struct MqttBackend {
    runtime: Option<Runtime>,
}

impl Backend for MqttBackend {
    type Session = MqttSession;

    fn init(&mut self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("mqtt-network")
            .enable_all()
            .build()
            .context("failed to build network runtime")?;
        self.runtime = Some(runtime);
        Ok(())
    }

    fn new_session(&mut self, client_id: Option<&str>, clean_session: bool) -> Result<MqttSession> {
        let handle = self
            .runtime
            .as_ref()
            .map(|rt| rt.handle().clone())
            .context("client library is not initialized")?;
        let client_id = match client_id {
            Some(id) => {
                validate_client_id(id)?;
                id.to_string()
            }
            None => generate_client_id(),
        };
        debug!("created session for client id {}", client_id);

        Ok(MqttSession {
            handle,
            client_id,
            clean_session,
            credentials: None,
            client: None,
            eventloop: None,
            pump: None,
        })
    }

    fn destroy(&mut self, session: MqttSession) {
        debug!("destroying session for client id {}", session.client_id);
        drop(session);
    }

    fn cleanup(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
        }
    }
}

pub struct MqttSession {
    handle: Handle,
    client_id: String,
    clean_session: bool,
    credentials: Option<(String, String)>,
    client: Option<AsyncClient>,
    /// Held here while the network loop is stopped.
    eventloop: Option<EventLoop>,
    pump: Option<(oneshot::Sender<()>, JoinHandle<EventLoop>)>,
}

impl MqttSession {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl Session for MqttSession {
    fn set_credentials(&mut self, username: &str, password: Option<&str>) -> Result<()> {
        if username.len() > MAX_STRING_LEN {
            bail!("username exceeds {} bytes", MAX_STRING_LEN);
        }
        let password = password.unwrap_or_default();
        if password.len() > MAX_STRING_LEN {
            bail!("password exceeds {} bytes", MAX_STRING_LEN);
        }
        self.credentials = Some((username.to_string(), password.to_string()));
        Ok(())
    }

    fn connect(&mut self, host: &str, port: u16, keep_alive: Duration) -> Result<()> {
        let mut opts = MqttOptions::new(self.client_id.clone(), host, port);
        opts.set_keep_alive(keep_alive);
        opts.set_clean_session(self.clean_session);
        if let Some((username, password)) = &self.credentials {
            opts.set_credentials(username.clone(), password.clone());
        }

        let (client, mut eventloop) = AsyncClient::new(opts, REQUEST_CHANNEL_CAPACITY);
        self.handle.block_on(wait_for_connack(&mut eventloop))?;

        self.client = Some(client);
        self.eventloop = Some(eventloop);
        Ok(())
    }

    fn loop_start(&mut self) -> Result<()> {
        if self.pump.is_some() {
            bail!("network loop already running");
        }
        let mut eventloop = self.eventloop.take().context("session is not connected")?;
        let (stop_tx, mut stop_rx) = oneshot::channel();

        // A `poll` dropped on stop loses nothing: outgoing packets stay in the
        // event loop's write buffer and partial reads in its read buffer until
        // the next `poll`, which `disconnect` makes on this same event loop.
        let task = self.handle.spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    event = eventloop.poll() => match event {
                        Ok(event) => trace!("{:?}", event),
                        Err(e) => {
                            warn!("mqtt connection error: {}", e);
                            tokio::time::sleep(RECONNECT_DELAY).await;
                        }
                    },
                }
            }
            eventloop
        });

        self.pump = Some((stop_tx, task));
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<()> {
        let client = self.client.as_ref().context("session is not connected")?;
        // Never waits for room: a full request queue means the broker is not
        // keeping up or is gone, and that line is dropped.
        client
            .try_publish(topic, qos, retain, payload.to_vec())
            .with_context(|| format!("publish to {:?} rejected", topic))?;
        Ok(())
    }

    fn loop_stop(&mut self) -> Result<()> {
        let (stop_tx, task) = self.pump.take().context("network loop is not running")?;
        // The task may already be gone; the join below reports that.
        let _ = stop_tx.send(());
        let eventloop = self
            .handle
            .block_on(task)
            .context("network loop ended abnormally")?;
        self.eventloop = Some(eventloop);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        let client = self.client.as_ref().context("session is not connected")?;
        let eventloop = self
            .eventloop
            .as_mut()
            .context("network loop must be stopped before disconnecting")?;

        self.handle.block_on(async {
            match tokio::time::timeout(DISCONNECT_TIMEOUT, disconnect_and_flush(client, eventloop)).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!("timed out sending DISCONNECT")),
            }
        })
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<()> {
    loop {
        match eventloop.poll().await? {
            Event::Incoming(Packet::ConnAck(ack)) if ack.code == ConnectReturnCode::Success => {
                return Ok(())
            }
            Event::Incoming(Packet::ConnAck(ack)) => bail!("connection refused: {:?}", ack.code),
            _ => continue,
        }
    }
}

/// Queues DISCONNECT and drives the event loop until it is written. Anything
/// queued ahead of it goes out first. While the request queue is full each
/// `poll` drains one request, after which queueing is retried.
async fn disconnect_and_flush(client: &AsyncClient, eventloop: &mut EventLoop) -> Result<()> {
    let mut queued = false;
    loop {
        if !queued {
            queued = client.try_disconnect().is_ok();
        }
        if let Event::Outgoing(Outgoing::Disconnect) = eventloop.poll().await? {
            return Ok(());
        }
    }
}

fn validate_client_id(id: &str) -> Result<()> {
    if id.is_empty() {
        bail!("client id is empty");
    }
    if id.starts_with(char::is_whitespace) {
        bail!("client id {:?} starts with whitespace", id);
    }
    if id.len() > MAX_STRING_LEN {
        bail!("client id exceeds {} bytes", MAX_STRING_LEN);
    }
    Ok(())
}

fn generate_client_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    format!("{}{}", CLIENT_ID_PREFIX, id)
}
