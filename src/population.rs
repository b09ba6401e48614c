//! Immutable team → squad → player snapshot built from the squad and player
//! listings.
//!
//! Ownership is a strict tree: a [Team] owns its [Squad]s and its squadless
//! players, a [Squad] owns its members. Links back up the tree are plain ids,
//! resolved through the [Population] that owns everything.

use log::warn;

use crate::parser::{DisconnectedPlayer, PlayerRecord, SquadRecord, TeamListing};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Population {
    teams: Vec<Team>,
    unknown_team: Vec<Player>,
    disconnected: Vec<DisconnectedPlayer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    id: u32,
    name: String,
    squads: Vec<Squad>,
    players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Squad {
    id: u32,
    team_id: u32,
    name: String,
    size: u32,
    locked: bool,
    creator_name: Option<String>,
    creator_steam_id: Option<String>,
    players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    id: u32,
    steam_id: String,
    name: String,
    team_id: Option<u32>,
    squad_id: Option<u32>,
    reported_team_id: Option<u32>,
    reported_squad_id: Option<u32>,
    is_leader: Option<bool>,
    role: Option<String>,
}

impl Population {
    /// Links the listings together. Teams and squads come first and define the
    /// id space; each player then goes to the squad it names, or to its team
    /// if that squad is unknown, or to the unknown-team bucket if the team is
    /// unknown too. The two listings are fetched separately and can disagree
    /// while players move around, so a dangling reference is never an error.
    pub fn build(
        teams: Vec<TeamListing>,
        players: Vec<PlayerRecord>,
        disconnected: Vec<DisconnectedPlayer>,
    ) -> Self {
        let mut population = Population {
            teams: Vec::with_capacity(teams.len()),
            unknown_team: Vec::new(),
            disconnected,
        };

        for listing in teams {
            population.add_team(listing);
        }
        for record in players {
            population.add_player(record);
        }

        population
    }

    fn add_team(&mut self, listing: TeamListing) {
        let TeamListing { id, name, squads } = listing;

        let index = match self.teams.iter().position(|team| team.id == id) {
            Some(index) => {
                warn!("team {} listed twice, merging its squads", id);
                index
            }
            None => {
                self.teams.push(Team {
                    id,
                    name,
                    squads: Vec::new(),
                    players: Vec::new(),
                });
                self.teams.len() - 1
            }
        };

        let team = &mut self.teams[index];
        for record in squads {
            if team.squad(record.id).is_some() {
                warn!("squad {} listed twice in team {}, keeping the first", record.id, id);
                continue;
            }
            team.squads.push(Squad::from_record(id, record));
        }
    }

    fn add_player(&mut self, record: PlayerRecord) {
        let mut player = Player::from_record(record);

        let team_index = player
            .team_id
            .and_then(|team_id| self.teams.iter().position(|team| team.id == team_id));
        let Some(team_index) = team_index else {
            if let Some(team_id) = player.team_id {
                warn!(
                    "player {} ({}) references unknown team {}, leaving unassigned",
                    player.id, player.steam_id, team_id
                );
            }
            player.team_id = None;
            player.squad_id = None;
            self.unknown_team.push(player);
            return;
        };

        let team = &mut self.teams[team_index];
        match player
            .squad_id
            .and_then(|squad_id| team.squads.iter_mut().find(|squad| squad.id == squad_id))
        {
            Some(squad) => squad.players.push(player),
            None => {
                if let Some(squad_id) = player.squad_id {
                    warn!(
                        "player {} ({}) references unknown squad {} in team {}, attaching to team",
                        player.id, player.steam_id, squad_id, team.id
                    );
                }
                player.squad_id = None;
                team.players.push(player);
            }
        }
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn has_teams(&self) -> bool {
        !self.teams.is_empty()
    }

    pub fn team(&self, id: u32) -> Option<&Team> {
        self.teams.iter().find(|team| team.id == id)
    }

    /// Every connected player that is not in a squad of this snapshot: the
    /// squadless players of each team followed by [Self::unknown_team_players].
    pub fn unassigned_players(&self) -> impl Iterator<Item = &Player> {
        self.teams
            .iter()
            .flat_map(|team| team.players.iter())
            .chain(self.unknown_team.iter())
    }

    /// Players whose team could not be resolved.
    pub fn unknown_team_players(&self) -> &[Player] {
        &self.unknown_team
    }

    pub fn disconnected_players(&self) -> &[DisconnectedPlayer] {
        &self.disconnected
    }

    /// Every connected player, in squads, squadless in a team, or unassigned.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.teams
            .iter()
            .flat_map(|team| team.all_players())
            .chain(self.unknown_team.iter())
    }

    pub fn player_by_steam_id(&self, steam_id: &str) -> Option<&Player> {
        self.players().find(|player| player.steam_id == steam_id)
    }

    pub fn player_by_id(&self, id: u32) -> Option<&Player> {
        self.players().find(|player| player.id == id)
    }

    pub fn squad_count(&self) -> usize {
        self.teams.iter().map(|team| team.squads.len()).sum()
    }

    pub fn player_count(&self) -> usize {
        self.teams.iter().map(Team::player_count).sum::<usize>() + self.unknown_team.len()
    }

    pub fn team_of(&self, player: &Player) -> Option<&Team> {
        self.team(player.team_id?)
    }

    pub fn squad_of(&self, player: &Player) -> Option<&Squad> {
        self.team_of(player)?.squad(player.squad_id?)
    }

    pub fn team_of_squad(&self, squad: &Squad) -> Option<&Team> {
        self.team(squad.team_id)
    }
}

impl Team {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn squads(&self) -> &[Squad] {
        &self.squads
    }

    pub fn squad(&self, id: u32) -> Option<&Squad> {
        self.squads.iter().find(|squad| squad.id == id)
    }

    /// Players of this team that are not in any squad.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn all_players(&self) -> impl Iterator<Item = &Player> {
        self.squads
            .iter()
            .flat_map(|squad| squad.players.iter())
            .chain(self.players.iter())
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
            + self
                .squads
                .iter()
                .map(|squad| squad.players.len())
                .sum::<usize>()
    }
}

impl Squad {
    fn from_record(team_id: u32, record: SquadRecord) -> Self {
        Squad {
            id: record.id,
            team_id,
            name: record.name,
            size: record.size,
            locked: record.locked,
            creator_name: record.creator_name,
            creator_steam_id: record.creator_steam_id,
            players: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn team_id(&self) -> u32 {
        self.team_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size reported by the squad listing; can differ from `players().len()`.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn creator_name(&self) -> Option<&str> {
        self.creator_name.as_deref()
    }

    pub fn creator_steam_id(&self) -> Option<&str> {
        self.creator_steam_id.as_deref()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: u32) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }
}

impl Player {
    fn from_record(record: PlayerRecord) -> Self {
        Player {
            id: record.id,
            steam_id: record.steam_id,
            name: record.name,
            team_id: record.team_id,
            squad_id: record.squad_id,
            reported_team_id: record.team_id,
            reported_squad_id: record.squad_id,
            is_leader: record.is_leader,
            role: record.role,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn steam_id(&self) -> &str {
        &self.steam_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Team this player was resolved to, if any.
    pub fn team_id(&self) -> Option<u32> {
        self.team_id
    }

    /// Squad this player was resolved to, if any.
    pub fn squad_id(&self) -> Option<u32> {
        self.squad_id
    }

    /// Team id as the player listing reported it, even if no such team was in
    /// the squad listing.
    pub fn reported_team_id(&self) -> Option<u32> {
        self.reported_team_id
    }

    pub fn reported_squad_id(&self) -> Option<u32> {
        self.reported_squad_id
    }

    pub fn is_leader(&self) -> Option<bool> {
        self.is_leader
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squad(id: u32, name: &str, size: u32) -> SquadRecord {
        SquadRecord {
            id,
            name: name.to_string(),
            size,
            locked: false,
            creator_name: None,
            creator_steam_id: None,
        }
    }

    fn player(id: u32, steam_id: &str, team_id: Option<u32>, squad_id: Option<u32>) -> PlayerRecord {
        PlayerRecord {
            id,
            steam_id: steam_id.to_string(),
            name: format!("player {}", id),
            team_id,
            squad_id,
            is_leader: None,
            role: None,
        }
    }

    fn teams() -> Vec<TeamListing> {
        vec![
            TeamListing {
                id: 1,
                name: "United States Army".to_string(),
                squads: vec![squad(1, "HELI", 1), squad(3, "CMD Squad", 9)],
            },
            TeamListing {
                id: 2,
                name: "Russian Ground Forces".to_string(),
                squads: vec![squad(1, "HELI", 2)],
            },
        ]
    }

    #[test]
    fn attaches_players_to_their_squads() {
        let population = Population::build(
            teams(),
            vec![
                player(53, "76561198202943394", Some(1), Some(3)),
                player(7, "76561198000000007", Some(2), Some(1)),
            ],
            Vec::new(),
        );

        let cmd = population.team(1).unwrap().squad(3).unwrap();
        assert_eq!(cmd.players().len(), 1);
        assert_eq!(cmd.players()[0].id(), 53);

        // squad ids repeat across teams
        let heli = population.team(2).unwrap().squad(1).unwrap();
        assert_eq!(heli.player(7).unwrap().steam_id(), "76561198000000007");
        assert!(population.team(1).unwrap().squad(1).unwrap().players().is_empty());
    }

    #[test]
    fn unknown_squad_falls_back_to_the_team() {
        let population = Population::build(
            teams(),
            vec![player(9, "76561198000000009", Some(1), Some(42))],
            Vec::new(),
        );

        let team = population.team(1).unwrap();
        assert_eq!(team.players().len(), 1);
        assert_eq!(team.players()[0].squad_id(), None);
        assert_eq!(team.players()[0].reported_squad_id(), Some(42));
        assert!(population.unknown_team_players().is_empty());
        assert_eq!(population.player_count(), 1);
    }

    #[test]
    fn player_in_missing_squad_is_in_the_unassigned_bucket() {
        let population = Population::build(
            teams(),
            vec![
                player(9, "76561198000000009", Some(1), Some(42)),
                player(53, "76561198202943394", Some(1), Some(3)),
            ],
            Vec::new(),
        );

        let unassigned: Vec<_> = population.unassigned_players().collect();
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].id(), 9);
        assert_eq!(unassigned[0].squad_id(), None);
        assert!(population.squad_of(unassigned[0]).is_none());
    }

    #[test]
    fn unknown_team_goes_to_its_own_bucket() {
        let population = Population::build(
            teams(),
            vec![
                player(10, "76561198000000010", Some(3), Some(1)),
                player(11, "76561198000000011", None, None),
            ],
            Vec::new(),
        );

        let unknown_team = population.unknown_team_players();
        assert_eq!(unknown_team.len(), 2);
        assert_eq!(unknown_team[0].team_id(), None);
        assert_eq!(unknown_team[0].reported_team_id(), Some(3));
        assert_eq!(unknown_team[0].reported_squad_id(), Some(1));
        assert!(population.team_of(&unknown_team[0]).is_none());
        assert_eq!(population.unassigned_players().count(), 2);
        assert_eq!(population.player_by_id(11).unwrap().id(), 11);
        assert_eq!(population.player_count(), 2);
    }

    #[test]
    fn navigates_back_references() {
        let population = Population::build(
            teams(),
            vec![player(53, "76561198202943394", Some(1), Some(3))],
            Vec::new(),
        );

        let player = population.player_by_steam_id("76561198202943394").unwrap();
        let squad = population.squad_of(player).unwrap();
        assert_eq!(squad.name(), "CMD Squad");
        assert_eq!(population.team_of_squad(squad).unwrap().id(), 1);
        assert_eq!(population.team_of(player).unwrap().name(), "United States Army");
        assert!(population.player_by_steam_id("DoesCertainlyNotExist").is_none());
    }

    #[test]
    fn counts_squads_and_players() {
        let population = Population::build(
            teams(),
            vec![
                player(1, "76561198000000001", Some(1), Some(1)),
                player(2, "76561198000000002", Some(1), None),
                player(3, "76561198000000003", Some(2), Some(1)),
                player(4, "76561198000000004", None, None),
            ],
            Vec::new(),
        );

        assert!(population.has_teams());
        assert_eq!(population.squad_count(), 3);
        assert_eq!(population.player_count(), 4);
        assert_eq!(population.players().count(), 4);
        assert_eq!(population.team(1).unwrap().player_count(), 2);
        assert!(population.team(3).is_none());
    }

    #[test]
    fn keeps_disconnected_players_separate() {
        let disconnected = vec![DisconnectedPlayer {
            id: 88,
            steam_id: "76561198000000088".to_string(),
            name: "Gone".to_string(),
            disconnected_since: 195,
        }];
        let population = Population::build(Vec::new(), Vec::new(), disconnected.clone());

        assert_eq!(population.disconnected_players(), disconnected.as_slice());
        assert_eq!(population.player_count(), 0);
        assert!(population.player_by_id(88).is_none());
        assert!(!population.has_teams());
    }

    #[test]
    fn duplicate_listings_do_not_duplicate_squads() {
        let mut listing = teams();
        listing.push(TeamListing {
            id: 1,
            name: "United States Army".to_string(),
            squads: vec![squad(3, "CMD Squad", 9), squad(4, "MBT", 2)],
        });
        let population = Population::build(listing, Vec::new(), Vec::new());

        assert_eq!(population.teams().len(), 2);
        assert_eq!(population.team(1).unwrap().squads().len(), 3);
    }

    #[test]
    fn population_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Population>();
    }
}
