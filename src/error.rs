use std::time::Duration;

use thiserror::Error;

/// Possible errors for the package.
#[derive(Error, Debug)]
pub enum RconError {
    /// Returned before any network activity if the connection parameters are
    /// unusable (for example a zero timeout).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Returned if the host is down, behind a firewall or drops us during the
    /// handshake.
    #[error("cannot connect to host")]
    ConnectionFailed(#[source] std::io::Error),
    /// Returned if you can't remember the password.
    #[error("bad password")]
    AuthenticationFailed,
    /// The stream was established but broke while exchanging packets. The
    /// connection is unusable afterwards.
    #[error("connection to host lost")]
    ConnectionLost(#[source] std::io::Error),
    /// Returned when using a connection that was closed, either explicitly or
    /// because an earlier failure invalidated it.
    #[error("connection is closed")]
    Disconnected,
    /// Returned if the server did not send a complete packet in time.
    #[error("no response within {0:?}")]
    ReadTimeout(Duration),
    /// Returned if a frame violates the wire format (bad length, missing
    /// terminators, embedded nulls, invalid utf-8).
    #[error("malformed packet: {0}")]
    MalformedPacket(String),
    /// Returned if we received a packet that does not have a type known to us.
    #[error("unknown rcon packet type: {0}")]
    UnknownPacketType(i32),
    /// A previous command was abandoned before its response was drained, so
    /// the stream position is unknown.
    #[error("another command is still in flight on this connection")]
    CommandInFlight,
    /// Returned if a listing contains a line that does not match its grammar.
    #[error("unparsable response line: {line:?}")]
    UnparsableResponse { line: String },
}

impl RconError {
    pub(crate) fn unparsable(line: &str) -> Self {
        RconError::UnparsableResponse {
            line: line.to_string(),
        }
    }
}
