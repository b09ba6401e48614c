use std::{io, time::Duration};

use log::{debug, trace, warn};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

use crate::{
    config::ServerConnectionInfo,
    error::RconError,
    packet::{Packet, PacketType, Sender},
};

/// Request id used for the authentication packet.
pub const AUTH_PACKET_ID: i32 = 1;
/// Id the server echoes in its auth response when the password is wrong.
/// This is the value Source-family servers (srcds, Squad) use.
pub const AUTH_FAILED_ID: i32 = -1;

/// One authenticated TCP stream to an rcon server. Sends and receives single
/// [Packet]s; reassembling multi-packet responses is the job of
/// [Client](crate::client::Client).
#[derive(Debug)]
pub struct Connection {
    stream: Option<TcpStream>,
    timeout: Duration,
    address: String,
}

impl Connection {
    /// Opens the stream and authenticates. Every failure in here is fatal to
    /// the connection attempt and is not retried.
    pub async fn connect(info: &ServerConnectionInfo) -> Result<Self, RconError> {
        info.validate()?;
        let address = info.address();

        let stream = timeout(info.timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| {
                RconError::ConnectionFailed(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect to {} timed out", address),
                ))
            })?
            .map_err(RconError::ConnectionFailed)?;

        trace!("opened tcp stream to {}, attempting auth", address);

        let mut connection = Connection {
            stream: Some(stream),
            timeout: info.timeout,
            address,
        };

        if let Err(err) = connection.auth(&info.password).await {
            connection.close().await;
            return Err(handshake_error(err));
        }

        debug!("authenticated with {}", connection.address);
        Ok(connection)
    }

    async fn auth(&mut self, password: &str) -> Result<(), RconError> {
        let auth_packet = Packet::new(AUTH_PACKET_ID, PacketType::Auth, password)?;

        trace!("sending auth packet to server");
        self.send_packet(&auth_packet).await?;

        loop {
            let response = self.receive_packet().await?;
            match response.packet_type() {
                PacketType::AuthResponse if response.id() == AUTH_FAILED_ID => {
                    return Err(RconError::AuthenticationFailed);
                }
                PacketType::AuthResponse if response.id() == auth_packet.id() => {
                    trace!("auth response received");
                    return Ok(());
                }
                PacketType::AuthResponse => {
                    warn!(
                        "ignoring auth response for unexpected packet id {}",
                        response.id()
                    );
                }
                // some servers send an empty response value ahead of the auth
                // response
                _ => trace!(
                    "draining {} byte response for packet id {} during auth",
                    response.body().len(),
                    response.id()
                ),
            }
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub async fn send_packet(&mut self, packet: &Packet) -> Result<(), RconError> {
        let deadline = self.timeout;
        let stream = self.stream.as_mut().ok_or(RconError::Disconnected)?;
        let bytes = packet.pack();

        trace!(
            "send packet id {} ({} byte body)",
            packet.id(),
            packet.body().len()
        );

        timeout(deadline, stream.write_all(&bytes))
            .await
            .map_err(|_| {
                RconError::ConnectionLost(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "write timed out",
                ))
            })?
            .map_err(RconError::ConnectionLost)
    }

    /// Reads exactly one frame. Fails with [RconError::ReadTimeout] if the
    /// whole frame does not arrive within the configured timeout.
    pub async fn receive_packet(&mut self) -> Result<Packet, RconError> {
        let deadline = self.timeout;
        let stream = self.stream.as_mut().ok_or(RconError::Disconnected)?;

        let packet = timeout(deadline, Self::read_from_stream(stream))
            .await
            .map_err(|_| RconError::ReadTimeout(deadline))??;

        trace!(
            "receive packet id {} ({} byte body)",
            packet.id(),
            packet.body().len()
        );
        Ok(packet)
    }

    async fn read_from_stream(stream: &mut TcpStream) -> Result<Packet, RconError> {
        let mut prefix = [0u8; Packet::LENGTH_PREFIX];
        stream
            .read_exact(&mut prefix)
            .await
            .map_err(RconError::ConnectionLost)?;

        let size = Packet::declared_size(&prefix)? as usize;
        let mut frame = vec![0u8; Packet::LENGTH_PREFIX + size];
        frame[..Packet::LENGTH_PREFIX].copy_from_slice(&prefix);
        stream
            .read_exact(&mut frame[Packet::LENGTH_PREFIX..])
            .await
            .map_err(RconError::ConnectionLost)?;

        let (packet, _) = Packet::unpack(&frame, Sender::Server)?;
        Ok(packet)
    }

    /// Releases the socket. Safe to call any number of times.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            debug!("closing connection to {}", self.address);
            if let Err(err) = stream.shutdown().await {
                trace!("shutdown of {} failed: {}", self.address, err);
            }
        }
    }
}

/// Socket trouble during the handshake means we never had a connection.
fn handshake_error(err: RconError) -> RconError {
    match err {
        RconError::ConnectionLost(source) => RconError::ConnectionFailed(source),
        RconError::ReadTimeout(deadline) => RconError::ConnectionFailed(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("no auth response within {:?}", deadline),
        )),
        other => other,
    }
}
