//! Scripted in-process rcon server for integration tests.
#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use log::{error, trace};
use squad_rcon::{
    connection::AUTH_FAILED_ID,
    packet::{Packet, PacketType, Sender},
    RconError, ServerConnectionInfo,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

pub const PASSWORD: &str = "secret";

/// What the server does with one (non-empty) command.
pub enum Reply {
    /// Answer with the text split into packets of at most `chunk` bytes.
    Text { body: String, chunk: usize },
    /// Answer with the text, writing the frames one byte at a time.
    Trickle { body: String },
    /// Send a packet with an unrelated id before the real answer.
    WithStray { stray_id: i32, body: String },
    /// Stop answering anything on this connection.
    Silence,
    /// Close the connection.
    Hangup,
}

impl Reply {
    pub fn text(body: &str) -> Self {
        Reply::Text {
            body: body.to_string(),
            chunk: 4096,
        }
    }

    pub fn chunked(body: &str, chunk: usize) -> Self {
        Reply::Text {
            body: body.to_string(),
            chunk,
        }
    }
}

#[derive(Clone)]
pub struct Options {
    pub password: String,
    /// Some servers send an empty response value ahead of the auth response.
    pub empty_response_before_auth: bool,
    pub timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            password: PASSWORD.to_string(),
            empty_response_before_auth: false,
            timeout: Duration::from_secs(5),
        }
    }
}

pub struct MockServer {
    addr: SocketAddr,
    timeout: Duration,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&str) -> Reply + Send + Sync + 'static,
    {
        Self::start_with(Options::default(), handler).await
    }

    pub async fn start_with<F>(options: Options, handler: F) -> Self
    where
        F: Fn(&str) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");
        let handler = Arc::new(handler);
        let timeout = options.timeout;

        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        trace!("mock server accepted {}", peer);
                        let handler = Arc::clone(&handler);
                        let options = options.clone();
                        tokio::spawn(async move {
                            if let Err(err) = process(stream, options, handler).await {
                                trace!("mock connection ended: {}", err);
                            }
                        });
                    }
                    Err(err) => error!("{:?}", err),
                }
            }
        });

        MockServer {
            addr,
            timeout,
            handle,
        }
    }

    pub fn info(&self) -> ServerConnectionInfo {
        self.info_with_password(PASSWORD)
    }

    pub fn info_with_password(&self, password: &str) -> ServerConnectionInfo {
        ServerConnectionInfo::new(self.addr.ip().to_string(), self.addr.port(), password)
            .with_timeout(self.timeout)
            .expect("valid timeout")
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn process<F>(
    mut stream: TcpStream,
    options: Options,
    handler: Arc<F>,
) -> Result<(), RconError>
where
    F: Fn(&str) -> Reply + Send + Sync + 'static,
{
    let mut silent = false;

    loop {
        let request = read_request(&mut stream).await?;
        if silent {
            continue;
        }

        match request.packet_type() {
            PacketType::Auth => {
                if options.empty_response_before_auth {
                    write(&mut stream, request.id(), PacketType::Response, b"").await?;
                }
                let id = if request.body() == options.password.as_bytes() {
                    request.id()
                } else {
                    AUTH_FAILED_ID
                };
                write(&mut stream, id, PacketType::AuthResponse, b"").await?;
            }
            // the boundary probe
            _ if request.body().is_empty() => {
                write(&mut stream, request.id(), PacketType::Response, b"").await?;
            }
            _ => {
                let command = String::from_utf8_lossy(request.body()).into_owned();
                match (*handler)(&command) {
                    Reply::Text { body, chunk } => {
                        for fragment in body.as_bytes().chunks(chunk.max(1)) {
                            write(&mut stream, request.id(), PacketType::Response, fragment)
                                .await?;
                        }
                    }
                    Reply::Trickle { body } => {
                        let bytes = response(request.id(), body.as_bytes())?.pack();
                        for byte in bytes {
                            stream
                                .write_all(&[byte])
                                .await
                                .map_err(RconError::ConnectionLost)?;
                            stream.flush().await.map_err(RconError::ConnectionLost)?;
                        }
                    }
                    Reply::WithStray { stray_id, body } => {
                        write(&mut stream, stray_id, PacketType::Response, b"stale").await?;
                        write(&mut stream, request.id(), PacketType::Response, body.as_bytes())
                            .await?;
                    }
                    Reply::Silence => silent = true,
                    Reply::Hangup => return Ok(()),
                }
            }
        }
    }
}

fn response(id: i32, body: &[u8]) -> Result<Packet, RconError> {
    Packet::new(id, PacketType::Response, body.to_vec())
}

async fn write(
    stream: &mut TcpStream,
    id: i32,
    packet_type: PacketType,
    body: &[u8],
) -> Result<(), RconError> {
    let packet = Packet::new(id, packet_type, body.to_vec())?;
    stream
        .write_all(&packet.pack())
        .await
        .map_err(RconError::ConnectionLost)
}

async fn read_request(stream: &mut TcpStream) -> Result<Packet, RconError> {
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
    let (packet, _) = Packet::unpack(&frame, Sender::Client)?;
    Ok(packet)
}

pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("read {}: {}", path, err))
}
