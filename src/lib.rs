// $t@$h
//! Publishes each line read from standard input as one MQTT message on a
//! fixed topic.

pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod mqtt;
pub mod reader;
pub mod types;

pub use config::{usage, Config};
pub use connection::{Backend, Connection, Session};
pub use error::BridgeError;
pub use handlers::PublishStats;
pub use mqtt::MqttBackend;

use log::info;
use std::ffi::OsString;
use std::io::BufRead;

/// Parses `args` (without the program name), connects through `backend`
/// and publishes `input` line by line. Teardown runs on every path.
pub fn run<I, A, B, R>(args: I, backend: B, input: R) -> Result<PublishStats, BridgeError>
where
    I: IntoIterator<Item = A>,
    A: Into<OsString>,
    B: Backend,
    R: BufRead,
{
    let config = Config::from_os_args(args)?;
    let mut connection = Connection::open(backend, &config)?;
    info!("publishing standard input to {:?}", config.topic);

    let stats = handlers::line_processing_loop(input, &mut connection, config.buffer_size);
    connection.close();
    Ok(stats)
}
