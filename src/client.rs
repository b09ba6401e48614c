use log::{trace, warn};

use crate::{
    config::ServerConnectionInfo,
    connection::Connection,
    error::RconError,
    packet::{Packet, PacketType},
};

/// Asynchronous rcon client. Call `connect()` to establish a connection and
/// authenticate. The client should be `mut` as it keeps a counter used for
/// [Packet] IDs, and because only one command may be in flight at a time.
///
/// ## Example
/// ```no_run
/// use squad_rcon::{client::Client, config::ServerConnectionInfo};
/// use std::error::Error;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn Error>> {
///     let info = ServerConnectionInfo::new("127.0.0.1", 21114, "<put rcon password here>");
///     let mut client = Client::connect(&info).await?;
///     let response = client.command("ShowNextMap").await?;
///
///     println!("{}", response.body());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Client {
    next_packet_id: i32,
    in_flight: bool,
    connection: Connection,
}

/// Container struct for a response that can be glued together from multiple [Packet]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    body: String,
}

impl Response {
    pub fn body(&self) -> &str {
        self.body.as_ref()
    }

    pub fn into_body(self) -> String {
        self.body
    }
}

impl Client {
    // IDs 1-99 are reserved for auth (even though we realistically only need one)
    const FIRST_COMMAND_ID: i32 = 100;

    pub async fn connect(info: &ServerConnectionInfo) -> Result<Self, RconError> {
        let connection = Connection::connect(info).await?;
        Ok(Self::from_connection(connection))
    }

    pub fn from_connection(connection: Connection) -> Self {
        Client {
            next_packet_id: Self::FIRST_COMMAND_ID,
            in_flight: false,
            connection,
        }
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_open()
    }

    /// Run a rcon command. In case of a response being split between multiple
    /// packets, they will be joined together afterwards.
    ///
    /// Any transport failure closes the connection; later calls return
    /// [RconError::Disconnected].
    pub async fn command(&mut self, command: &str) -> Result<Response, RconError> {
        if !self.connection.is_open() {
            return Err(RconError::Disconnected);
        }
        if self.in_flight {
            return Err(RconError::CommandInFlight);
        }

        let command_packet = self.create_packet(command)?;
        // the server can split up the response but it won't tell us how many
        // packets to expect, so we send a second packet immediately afterwards
        // with a blank command. Its response can only arrive once every packet
        // for the real command has been sent.
        let tracking_packet = self.create_packet("")?;

        // stays set if this future is dropped mid-exchange
        self.in_flight = true;
        let result = self.exchange(&command_packet, &tracking_packet).await;
        self.in_flight = false;

        match result {
            Ok(body) => Ok(Response { body }),
            Err(err) => {
                self.connection.close().await;
                Err(err)
            }
        }
    }

    async fn exchange(
        &mut self,
        command_packet: &Packet,
        tracking_packet: &Packet,
    ) -> Result<String, RconError> {
        trace!("sending main packet to server");
        self.connection.send_packet(command_packet).await?;
        trace!("sending tracking (blank) packet to server");
        self.connection.send_packet(tracking_packet).await?;

        let mut body = Vec::<u8>::new();

        loop {
            // responses arrive in the order we sent the requests, so collect
            // until we see the ID of the tracking packet
            let response = self.connection.receive_packet().await?;
            let id = response.id();
            if id == tracking_packet.id() {
                trace!("that was the tracking packet, completing response");
                break;
            } else if id == command_packet.id() {
                body.extend_from_slice(response.body());
            } else {
                warn!(
                    "discarding packet id {} while waiting for {} ({} byte body)",
                    id,
                    command_packet.id(),
                    response.body().len()
                );
            }
        }

        // fragments may split a multi-byte character, so decode only once
        // everything is joined
        String::from_utf8(body)
            .map_err(|err| RconError::MalformedPacket(format!("response is not utf-8: {}", err)))
    }

    fn create_packet(&mut self, command: &str) -> Result<Packet, RconError> {
        let id = self.next_packet_id;
        self.next_packet_id = match self.next_packet_id.checked_add(1) {
            Some(next) => next,
            None => Self::FIRST_COMMAND_ID,
        };

        Packet::new(id, PacketType::Exec, command)
    }

    pub async fn close(&mut self) {
        self.in_flight = false;
        self.connection.close().await;
    }
}
