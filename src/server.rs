use log::debug;
use tokio::sync::Mutex;

use crate::{
    client::Client,
    config::ServerConnectionInfo,
    error::RconError,
    parser::{self, DisconnectedPlayer, MapRotation, PlayerRecord, TeamListing},
    population::Population,
};

/// Admin surface of a Squad server. Wraps one [Client] behind a mutex so that
/// it can be shared between tasks; every call holds the lock for its whole
/// request/response exchange.
pub struct SquadServer {
    client: Mutex<Client>,
}

impl SquadServer {
    pub async fn connect(info: &ServerConnectionInfo) -> Result<Self, RconError> {
        Ok(Self::from_client(Client::connect(info).await?))
    }

    pub fn from_client(client: Client) -> Self {
        SquadServer {
            client: Mutex::new(client),
        }
    }

    /// Runs a raw command and returns its text.
    pub async fn command(&self, command: &str) -> Result<String, RconError> {
        let mut client = self.client.lock().await;
        Ok(client.command(command).await?.into_body())
    }

    /// Runs `<verb> <args>` and reports whether the reply starts with
    /// `expected` (case-sensitive). A non-matching reply such as "player not
    /// found" is `Ok(false)`, not an error.
    pub async fn verified_command(
        &self,
        verb: &str,
        args: &str,
        expected: &str,
    ) -> Result<bool, RconError> {
        let response = self.command(&format!("{} {}", verb, args)).await?;
        let accepted = response.starts_with(expected);
        if !accepted {
            debug!("{} not confirmed, server said: {:?}", verb, response);
        }
        Ok(accepted)
    }

    pub async fn list_squads(&self) -> Result<Vec<TeamListing>, RconError> {
        parser::parse_squad_listing(&self.command("ListSquads").await?)
    }

    pub async fn list_players(&self) -> Result<Vec<PlayerRecord>, RconError> {
        parser::parse_player_listing(&self.command("ListPlayers").await?)
    }

    pub async fn list_disconnected_players(&self) -> Result<Vec<DisconnectedPlayer>, RconError> {
        parser::parse_disconnected_listing(&self.command("AdminListDisconnectedPlayers").await?)
    }

    /// Fetches squads, then players, then disconnected players and links them
    /// into one snapshot. Squads go first so players that joined a squad in
    /// between only end up squadless rather than pointing at nothing.
    pub async fn server_population(&self) -> Result<Population, RconError> {
        let teams = self.list_squads().await?;
        let players = self.list_players().await?;
        let disconnected = self.list_disconnected_players().await?;
        Ok(Population::build(teams, players, disconnected))
    }

    pub async fn map_rotation(&self) -> Result<MapRotation, RconError> {
        parser::parse_map_rotation(&self.command("ShowNextMap").await?)
    }

    pub async fn current_map(&self) -> Result<Option<String>, RconError> {
        Ok(self.map_rotation().await?.current)
    }

    pub async fn next_map(&self) -> Result<Option<String>, RconError> {
        Ok(self.map_rotation().await?.next)
    }

    /// Kick a player by name or Steam64 id.
    pub async fn admin_kick(&self, name_or_steam_id: &str, reason: &str) -> Result<bool, RconError> {
        self.verified_command(
            "AdminKick",
            &format!("{} {}", name_or_steam_id, reason),
            "Kicked player ",
        )
        .await
    }

    pub async fn admin_kick_by_id(&self, id: u32, reason: &str) -> Result<bool, RconError> {
        self.verified_command("AdminKickById", &format!("{} {}", id, reason), "Kicked player ")
            .await
    }

    /// `duration` uses the server's format, e.g. `1d`, `2h` or `0` for permanent.
    pub async fn admin_ban(
        &self,
        name_or_steam_id: &str,
        duration: &str,
        reason: &str,
    ) -> Result<bool, RconError> {
        self.verified_command(
            "AdminBan",
            &format!("{} {} {}", name_or_steam_id, duration, reason),
            "Banned player ",
        )
        .await
    }

    pub async fn admin_ban_by_id(
        &self,
        id: u32,
        duration: &str,
        reason: &str,
    ) -> Result<bool, RconError> {
        self.verified_command(
            "AdminBanById",
            &format!("{} {} {}", id, duration, reason),
            "Banned player ",
        )
        .await
    }

    pub async fn admin_broadcast(&self, message: &str) -> Result<bool, RconError> {
        self.verified_command("AdminBroadcast", message, "Message broadcasted")
            .await
    }

    pub async fn admin_restart_match(&self) -> Result<bool, RconError> {
        self.verified_command("AdminRestartMatch", "", "Game restarted")
            .await
    }

    pub async fn admin_end_match(&self) -> Result<bool, RconError> {
        self.verified_command("AdminEndMatch", "", "Match ended").await
    }

    pub async fn admin_set_max_num_players(&self, slots: u32) -> Result<bool, RconError> {
        self.verified_command(
            "AdminSetMaxNumPlayers",
            &slots.to_string(),
            &format!("Set MaxNumPlayers to {}", slots),
        )
        .await
    }

    pub async fn admin_set_server_password(&self, password: &str) -> Result<bool, RconError> {
        self.verified_command(
            "AdminSetServerPassword",
            password,
            &format!("Set server password to {}", password),
        )
        .await
    }

    pub async fn admin_change_map(&self, map: &str) -> Result<bool, RconError> {
        self.verified_command("AdminChangeMap", map, "Changed map to")
            .await
    }

    pub async fn admin_set_next_map(&self, map: &str) -> Result<bool, RconError> {
        self.verified_command("AdminSetNextMap", map, "Set next map to")
            .await
    }

    /// Scales game time; `1.0` is normal speed.
    pub async fn admin_slomo(&self, factor: f32) -> Result<bool, RconError> {
        self.verified_command("AdminSlomo", &factor.to_string(), "Set time dilation to ")
            .await
    }

    pub async fn admin_force_team_change(&self, name_or_steam_id: &str) -> Result<bool, RconError> {
        self.verified_command(
            "AdminForceTeamChange",
            name_or_steam_id,
            "Forced team change for player ",
        )
        .await
    }

    pub async fn admin_force_team_change_by_id(&self, id: u32) -> Result<bool, RconError> {
        self.verified_command(
            "AdminForceTeamChangeById",
            &id.to_string(),
            "Forced team change for player ",
        )
        .await
    }

    pub async fn admin_disband_squad(&self, team_id: u32, squad_id: u32) -> Result<bool, RconError> {
        self.verified_command(
            "AdminDisbandSquad",
            &format!("{} {}", team_id, squad_id),
            "Remote admin disbanded squad ",
        )
        .await
    }

    pub async fn admin_remove_player_from_squad(
        &self,
        name_or_steam_id: &str,
    ) -> Result<bool, RconError> {
        self.verified_command(
            "AdminRemovePlayerFromSquad",
            name_or_steam_id,
            "Removed player ",
        )
        .await
    }

    pub async fn admin_remove_player_from_squad_by_id(&self, id: u32) -> Result<bool, RconError> {
        self.verified_command(
            "AdminRemovePlayerFromSquadById",
            &id.to_string(),
            "Removed player ",
        )
        .await
    }

    /// Shows `message` on the player's screen.
    pub async fn admin_warn(&self, name_or_steam_id: &str, message: &str) -> Result<bool, RconError> {
        self.verified_command(
            "AdminWarn",
            &format!("{} {}", name_or_steam_id, message),
            "Remote admin has warned player ",
        )
        .await
    }

    pub async fn admin_warn_by_id(&self, id: u32, message: &str) -> Result<bool, RconError> {
        self.verified_command(
            "AdminWarnById",
            &format!("{} {}", id, message),
            "Remote admin has warned player ",
        )
        .await
    }

    /// Closes the connection. Calling it again is a no-op.
    pub async fn disconnect(&self) {
        self.client.lock().await.close().await;
    }
}
