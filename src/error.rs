// $t@$h
use thiserror::Error;

/// Startup failures. Every variant ends the process with a non-zero status.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{0}")]
    Usage(String),

    #[error("failed to initialize mqtt client library")]
    Init(#[source] anyhow::Error),

    #[error("failed to create mqtt session")]
    Session(#[source] anyhow::Error),

    #[error("failed to set username and password")]
    Credentials(#[source] anyhow::Error),

    #[error("unable to connect to mqtt broker at {endpoint}")]
    Connect {
        endpoint: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to start network loop")]
    LoopStart(#[source] anyhow::Error),
}

impl BridgeError {
    pub fn is_usage(&self) -> bool {
        matches!(self, BridgeError::Usage(_))
    }

    /// The error and all of its causes on one line.
    pub fn diagnostic(&self) -> String {
        let mut line = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            line.push_str(": ");
            line.push_str(&err.to_string());
            cause = err.source();
        }
        line
    }
}
