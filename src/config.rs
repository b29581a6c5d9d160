// $t@$h
use crate::error::BridgeError;
use crate::types::*;
use log::warn;
use std::ffi::OsString;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub hostname: String,
    pub topic: String,
    pub port: u16,
    pub username: Option<String>,
    /// Only sent when `username` is set.
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub buffer_size: usize,
}

impl Config {
    /// Builds a config from the positional arguments that follow the program
    /// name: `<hostname> <topic> [port] [username] [password] [client_id]`.
    pub fn from_args<I>(args: I) -> Result<Self, BridgeError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let (hostname, topic) = match (args.next(), args.next()) {
            (Some(hostname), Some(topic)) => (hostname, topic),
            _ => return Err(BridgeError::Usage("missing hostname or topic".to_string())),
        };

        let port = match args.next() {
            Some(raw) => parse_port(&raw)?,
            None => DEFAULT_PORT,
        };

        Ok(Config {
            hostname,
            topic,
            port,
            username: args.next(),
            password: args.next(),
            client_id: args.next(),
            buffer_size: BUFFER_SIZE,
        })
    }

    /// Same as [`Config::from_args`] for raw process arguments. An argument
    /// that is not valid UTF-8 is a usage error.
    pub fn from_os_args<I, A>(args: I) -> Result<Self, BridgeError>
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        let args = args
            .into_iter()
            .map(|arg| {
                arg.into().into_string().map_err(|raw| {
                    BridgeError::Usage(format!("argument {:?} is not valid UTF-8", raw))
                })
            })
            .collect::<Result<Vec<String>, BridgeError>>()?;
        Self::from_args(args)
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

pub fn usage(progname: &str) -> String {
    format!(
        "usage: {} <hostname> <topic> [port] [username] [password] [client_id]",
        progname
    )
}

/// Reads the leading decimal digits of `raw`. Input without digits becomes
/// port 0 and trailing characters are dropped; both only warn.
fn parse_port(raw: &str) -> Result<u16, BridgeError> {
    let trimmed = raw.trim_start();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = unsigned
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let digits = &unsigned[..end];

    if digits.is_empty() {
        warn!("port {:?} is not a number, using port 0", raw);
        return Ok(0);
    }
    if end < unsigned.len() {
        warn!("ignoring trailing characters in port {:?}", raw);
    }

    let out_of_range = || BridgeError::Usage(format!("port {:?} is out of range", raw));
    let value: u32 = digits.parse().map_err(|_| out_of_range())?;
    if negative && value != 0 {
        return Err(out_of_range());
    }
    u16::try_from(value).map_err(|_| out_of_range())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn requires_hostname_and_topic() {
        assert!(Config::from_args(args(&[])).unwrap_err().is_usage());
        assert!(Config::from_args(args(&["broker"])).unwrap_err().is_usage());
    }

    #[test]
    fn defaults_when_only_required_arguments() {
        let config = Config::from_args(args(&["broker", "sensors/raw"])).unwrap();
        assert_eq!(config.hostname, "broker");
        assert_eq!(config.topic, "sensors/raw");
        assert_eq!(config.port, 1883);
        assert_eq!(config.username, None);
        assert_eq!(config.password, None);
        assert_eq!(config.client_id, None);
        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.endpoint(), "broker:1883");
    }

    #[test]
    fn reads_every_positional_in_order() {
        let config = Config::from_args(args(&[
            "broker", "t", "8883", "alice", "s3cret", "pipe-1", "ignored",
        ]))
        .unwrap();
        assert_eq!(config.port, 8883);
        assert_eq!(config.username.as_deref(), Some("alice"));
        assert_eq!(config.password.as_deref(), Some("s3cret"));
        assert_eq!(config.client_id.as_deref(), Some("pipe-1"));
    }

    #[test]
    fn lenient_port_parsing() {
        assert_eq!(parse_port("abc").unwrap(), 0);
        assert_eq!(parse_port("").unwrap(), 0);
        assert_eq!(parse_port("  1884").unwrap(), 1884);
        assert_eq!(parse_port("+1885").unwrap(), 1885);
        assert_eq!(parse_port("1886xyz").unwrap(), 1886);
        assert_eq!(parse_port("-0").unwrap(), 0);
    }

    #[test]
    fn rejects_ports_outside_u16() {
        assert!(parse_port("65536").unwrap_err().is_usage());
        assert!(parse_port("-1").unwrap_err().is_usage());
        assert!(parse_port("99999999999999999999").unwrap_err().is_usage());
        assert_eq!(parse_port("65535").unwrap(), 65535);
    }

    #[test]
    fn os_args_match_string_args() {
        let config = Config::from_os_args(vec![OsString::from("broker"), OsString::from("t")]).unwrap();
        assert_eq!(config, Config::from_args(args(&["broker", "t"])).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_argument_is_a_usage_error() {
        use std::os::unix::ffi::OsStringExt;

        let password = OsString::from_vec(vec![b'p', 0xff, 0xfe]);
        let err = Config::from_os_args(vec![
            OsString::from("broker"),
            OsString::from("t"),
            OsString::from("1883"),
            OsString::from("alice"),
            password,
        ])
        .unwrap_err();
        assert!(err.is_usage());
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn usage_names_the_program() {
        assert_eq!(
            usage("mqtt-ppd"),
            "usage: mqtt-ppd <hostname> <topic> [port] [username] [password] [client_id]"
        );
    }
}
