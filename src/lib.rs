//! Async client for the Squad flavour of the [Source RCON protocol](https://developer.valvesoftware.com/wiki/Source_RCON_Protocol),
//! plus parsers that turn the listing commands into a team/squad/player
//! [Population](population::Population).
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod packet;
pub mod parser;
pub mod population;
pub mod server;

pub use client::{Client, Response};
pub use config::ServerConnectionInfo;
pub use error::RconError;
pub use population::{Player, Population, Squad, Team};
pub use server::SquadServer;
