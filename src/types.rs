// $t@$h
use rumqttc::QoS;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 1883;
pub const KEEP_ALIVE: Duration = Duration::from_secs(60);
pub const CLEAN_SESSION: bool = true;

pub const PUBLISH_QOS: QoS = QoS::AtMostOnce;
pub const PUBLISH_RETAIN: bool = false;

/// Size of the line buffer. One byte is always held back, so a single chunk
/// carries at most `BUFFER_SIZE - 1` bytes including its terminator.
pub const BUFFER_SIZE: usize = 4096;

pub const CLIENT_ID_PREFIX: &str = "mqtt-ppd-";
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

pub const REQUEST_CHANNEL_CAPACITY: usize = 10;
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);
pub const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);
