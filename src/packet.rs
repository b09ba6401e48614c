use crate::error::RconError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    // SERVERDATA_AUTH
    Auth,
    // SERVERDATA_EXECCOMMAND
    Exec,
    // SERVERDATA_AUTH_RESPONSE
    AuthResponse,
    // SERVERDATA_RESPONSE_VALUE
    Response,
}

/// Which side of the connection wrote a frame. Needed because `Exec` and
/// `AuthResponse` share the same type code on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    Client,
    Server,
}

impl PacketType {
    pub fn code(&self) -> i32 {
        match self {
            PacketType::Auth => 3,
            PacketType::Exec => 2,
            PacketType::AuthResponse => 2,
            PacketType::Response => 0,
        }
    }

    pub fn to_le_bytes(&self) -> [u8; 4] {
        self.code().to_le_bytes()
    }

    pub fn from_code(code: i32, sender: Sender) -> Result<Self, RconError> {
        match (sender, code) {
            (Sender::Client, 3) => Ok(PacketType::Auth),
            (Sender::Client, 2) => Ok(PacketType::Exec),
            (Sender::Server, 2) => Ok(PacketType::AuthResponse),
            (Sender::Server, 0) => Ok(PacketType::Response),
            _ => Err(RconError::UnknownPacketType(code)),
        }
    }

    pub fn sender(&self) -> Sender {
        match self {
            PacketType::Auth | PacketType::Exec => Sender::Client,
            PacketType::AuthResponse | PacketType::Response => Sender::Server,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    id: i32,
    packet_type: PacketType,
    body: Vec<u8>,
}

impl Packet {
    /// id + type + body terminator + packet terminator
    pub const BASE_PACKET_SIZE: i32 = 10;
    /// Width of the little-endian length prefix.
    pub const LENGTH_PREFIX: usize = 4;
    /// Largest declared size we are willing to buffer. Servers happily exceed
    /// the documented 4096 bytes, so this is only a sanity bound.
    pub const MAX_PACKET_SIZE: i32 = 1024 * 1024;

    /// Builds a packet. The body is null terminated on the wire, so a body
    /// containing a null byte cannot be represented.
    pub fn new(
        id: i32,
        packet_type: PacketType,
        body: impl Into<Vec<u8>>,
    ) -> Result<Self, RconError> {
        let body = body.into();
        if body.contains(&0) {
            return Err(RconError::MalformedPacket(
                "packet body contains a null byte".to_string(),
            ));
        }
        Ok(Packet {
            id,
            packet_type,
            body,
        })
    }

    /// Decodes one frame from the start of `incoming`. Returns the packet and
    /// the number of bytes it occupied, so trailing bytes belong to the next
    /// frame.
    pub fn unpack(incoming: &[u8], sender: Sender) -> Result<(Self, usize), RconError> {
        let size = Self::declared_size(incoming)?;
        let total = Self::LENGTH_PREFIX + size as usize;
        if incoming.len() < total {
            return Err(RconError::MalformedPacket(format!(
                "declared size {} but only {} bytes available",
                size,
                incoming.len() - Self::LENGTH_PREFIX
            )));
        }

        let id = read_i32(&incoming[4..8]);
        let packet_type = PacketType::from_code(read_i32(&incoming[8..12]), sender)?;

        let body_end = total - 2;
        if incoming[body_end..total] != [0, 0] {
            return Err(RconError::MalformedPacket(
                "missing body and packet terminators".to_string(),
            ));
        }
        let body = &incoming[12..body_end];
        if body.contains(&0) {
            return Err(RconError::MalformedPacket(
                "packet body contains a null byte".to_string(),
            ));
        }

        Ok((
            Packet {
                id,
                packet_type,
                body: body.to_vec(),
            },
            total,
        ))
    }

    /// Reads and validates the length prefix at the start of a frame.
    pub fn declared_size(incoming: &[u8]) -> Result<i32, RconError> {
        if incoming.len() < Self::LENGTH_PREFIX {
            return Err(RconError::MalformedPacket(format!(
                "need {} bytes for the length prefix, got {}",
                Self::LENGTH_PREFIX,
                incoming.len()
            )));
        }
        let size = read_i32(&incoming[..4]);
        if size < Self::BASE_PACKET_SIZE {
            return Err(RconError::MalformedPacket(format!(
                "declared size {} is smaller than the {} byte header",
                size,
                Self::BASE_PACKET_SIZE
            )));
        }
        if size > Self::MAX_PACKET_SIZE {
            return Err(RconError::MalformedPacket(format!(
                "declared size {} exceeds {} bytes",
                size,
                Self::MAX_PACKET_SIZE
            )));
        }
        Ok(size)
    }

    // Since the only one of these values that can change in length is the body,
    // an easy way to calculate the size of a packet is to find the byte-length
    // of the packet body, then add 10 to it.
    pub fn size(&self) -> i32 {
        self.body.len() as i32 + Self::BASE_PACKET_SIZE
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    pub fn pack(&self) -> Vec<u8> {
        // Size, ID, Type, Body, Terminator
        let mut payload = Vec::<u8>::with_capacity(Self::LENGTH_PREFIX + self.size() as usize);
        payload.extend_from_slice(&self.size().to_le_bytes());
        payload.extend_from_slice(&self.id().to_le_bytes());
        payload.extend_from_slice(&self.packet_type.to_le_bytes());
        payload.extend_from_slice(&self.body);
        // null terminate the body, then null terminate the entire packet
        payload.extend_from_slice(&[0u8, 0u8]);
        payload
    }
}

fn read_i32(bytes: &[u8]) -> i32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    i32::from_le_bytes(word)
}
