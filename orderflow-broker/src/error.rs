//! Broker-level errors, split by whether a reconnect can help.

/// Errors surfaced by the connection manager.
///
/// `Connection` covers everything a fresh connection might fix (socket
/// loss, heartbeat timeouts, a restarting broker). `Rejected` means the
/// broker refused what we asked for (bad credentials, an existing exchange
/// declared with a different type) and retrying the same request would
/// refuse forever.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Broker unavailable: {0}")]
    Connection(String),

    #[error("Broker rejected request: {0}")]
    Rejected(String),
}

impl BrokerError {
    /// Fatal errors should fail startup (or stop a consumer loop) instead
    /// of being retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BrokerError::Rejected(_))
    }
}

impl From<lapin::Error> for BrokerError {
    fn from(err: lapin::Error) -> Self {
        match err {
            lapin::Error::ProtocolError(_) => BrokerError::Rejected(err.to_string()),
            _ => BrokerError::Connection(err.to_string()),
        }
    }
}
