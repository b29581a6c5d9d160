// $t@$h
// Reads lines from stdin and publishes each one to a single MQTT topic.
// Exits 0 at end of input, 1 if the connection could not be set up.
use log::info;
use mqtt_ppd::{run, usage, BridgeError, MqttBackend};
use std::{env, io, process};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut args = env::args_os();
    let progname = args
        .next()
        .map(|arg| arg.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mqtt-ppd".to_string());

    match run(args, MqttBackend::default(), io::stdin().lock()) {
        Ok(stats) => info!(
            "done: {} published, {} empty lines skipped, {} failed",
            stats.published, stats.skipped, stats.failed
        ),
        Err(BridgeError::Usage(reason)) => {
            eprintln!("{}", reason);
            eprintln!("{}", usage(&progname));
            process::exit(1);
        }
        // Printed directly so the diagnostic survives any RUST_LOG filter.
        Err(e) => {
            eprintln!("{}", e.diagnostic());
            process::exit(1);
        }
    }
}
