//! Line grammars for the listing commands. Each parser turns the raw text of
//! one command into flat records; linking them together happens in
//! [population](crate::population).
//!
//! Every non-blank line must match its grammar. A line that doesn't fails the
//! whole listing with [RconError::UnparsableResponse].

use crate::error::RconError;

const FIELD_SEPARATOR: &str = " | ";
const NOT_AVAILABLE: &str = "N/A";
const STEAM_ID_LEN: usize = 17;

const ACTIVE_SQUADS_HEADER: &str = "----- Active Squads -----";
const ACTIVE_PLAYERS_HEADER: &str = "----- Active Players -----";
const DISCONNECTED_HEADER_PREFIX: &str = "----- Recently Disconnected Players";
const NO_SQUADS: &str = "No squads";
const TEAM_HEADER_PREFIX: &str = "Team ID: ";

/// One team block of the squad listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamListing {
    pub id: u32,
    pub name: String,
    pub squads: Vec<SquadRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquadRecord {
    pub id: u32,
    pub name: String,
    /// Size as reported by the server, not the number of players we matched.
    pub size: u32,
    pub locked: bool,
    pub creator_name: Option<String>,
    pub creator_steam_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub id: u32,
    pub steam_id: String,
    pub name: String,
    pub team_id: Option<u32>,
    pub squad_id: Option<u32>,
    pub is_leader: Option<bool>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectedPlayer {
    pub id: u32,
    pub steam_id: String,
    pub name: String,
    /// Seconds since the player left.
    pub disconnected_since: u32,
}

/// Reply of `ShowNextMap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRotation {
    pub current: Option<String>,
    pub next: Option<String>,
}

pub fn parse_squad_listing(text: &str) -> Result<Vec<TeamListing>, RconError> {
    let mut teams = Vec::<TeamListing>::new();

    for line in lines(text) {
        if line == ACTIVE_SQUADS_HEADER {
            continue;
        }

        if let Some(header) = line.strip_prefix(TEAM_HEADER_PREFIX) {
            let (id, name) = header
                .split_once(" (")
                .and_then(|(id, rest)| Some((parse_number(id)?, rest.strip_suffix(')')?)))
                .ok_or_else(|| RconError::unparsable(line))?;
            teams.push(TeamListing {
                id,
                name: name.to_string(),
                squads: Vec::new(),
            });
            continue;
        }

        // squads and the sentinel are only valid inside a team block
        let team = teams.last_mut().ok_or_else(|| RconError::unparsable(line))?;
        if line == NO_SQUADS {
            continue;
        }
        team.squads.push(parse_squad_line(line)?);
    }

    Ok(teams)
}

/// Squad and creator names are chosen by players, so the fixed
/// `| Size: <n> | Locked: <bool>` run is the anchor that separates them.
fn parse_squad_line(line: &str) -> Result<SquadRecord, RconError> {
    let record = (|| {
        let (id, rest) = field(line, "ID")?;
        let id = parse_number(id)?;
        let rest = rest?.strip_prefix("Name: ")?;

        let (rest, creator_steam_id) = match rest.rsplit_once(" | Creator Steam ID: ") {
            Some((before, steam_id)) => (before, Some(parse_steam_id(steam_id)?)),
            None => (rest, None),
        };

        let (name, size, locked, creator_name) =
            rest.match_indices(" | Size: ").find_map(|(pos, _)| {
                let (size, after) = field(&rest[pos + FIELD_SEPARATOR.len()..], "Size")?;
                let (locked, after) = field(after?, "Locked")?;
                let creator_name = match after {
                    Some(after) => Some(after.strip_prefix("Creator Name: ")?),
                    None => None,
                };
                Some((&rest[..pos], parse_number(size)?, parse_bool(locked)?, creator_name))
            })?;

        Some(SquadRecord {
            id,
            name: name.to_string(),
            size,
            locked,
            creator_name: creator_name.map(str::to_string),
            creator_steam_id,
        })
    })();

    record.ok_or_else(|| RconError::unparsable(line))
}

/// Parses `ListPlayers`. The reply may carry a recently-disconnected section;
/// its lines are validated but not returned.
pub fn parse_player_listing(text: &str) -> Result<Vec<PlayerRecord>, RconError> {
    let mut players = Vec::new();
    let mut in_disconnected_section = false;

    for line in lines(text) {
        if line == ACTIVE_PLAYERS_HEADER {
            in_disconnected_section = false;
        } else if line.starts_with(DISCONNECTED_HEADER_PREFIX) {
            in_disconnected_section = true;
        } else if in_disconnected_section {
            parse_disconnected_line(line)?;
        } else {
            players.push(parse_player_line(line)?);
        }
    }

    Ok(players)
}

/// The name sits between fixed fields on both sides. The right-hand side is
/// matched from the end of the line, so a name may contain anything,
/// including text that looks like another field.
fn parse_player_line(line: &str) -> Result<PlayerRecord, RconError> {
    let record = (|| {
        let (id, rest) = field(line, "ID")?;
        let id = parse_number(id)?;
        let (steam_id, rest) = field(rest?, "SteamID")?;
        let steam_id = parse_steam_id(steam_id)?;
        let rest = rest?.strip_prefix("Name: ")?;

        let (name, membership) = rest.rmatch_indices(" | Team ID: ").find_map(|(pos, _)| {
            let membership = parse_membership(&rest[pos + FIELD_SEPARATOR.len()..])?;
            Some((&rest[..pos], membership))
        })?;

        Some(PlayerRecord {
            id,
            steam_id,
            name: name.to_string(),
            team_id: membership.team_id,
            squad_id: membership.squad_id,
            is_leader: membership.is_leader,
            role: membership.role.map(str::to_string),
        })
    })();

    record.ok_or_else(|| RconError::unparsable(line))
}

struct Membership<'a> {
    team_id: Option<u32>,
    squad_id: Option<u32>,
    is_leader: Option<bool>,
    role: Option<&'a str>,
}

/// `Team ID: <n|N/A> | Squad ID: <n|N/A>`, optionally followed by
/// `| Is Leader: <bool>` and `| Role: <role>`, up to the end of the line.
fn parse_membership(text: &str) -> Option<Membership<'_>> {
    let (team_id, rest) = field(text, "Team ID")?;
    let (squad_id, mut rest) = field(rest?, "Squad ID")?;

    let mut is_leader = None;
    if let Some((flag, next)) = rest.and_then(|rest| field(rest, "Is Leader")) {
        is_leader = Some(parse_bool(flag)?);
        rest = next;
    }
    let mut role = None;
    if let Some((value, next)) = rest.and_then(|rest| field(rest, "Role")) {
        role = Some(value);
        rest = next;
    }
    if rest.is_some() {
        return None;
    }

    Some(Membership {
        team_id: parse_optional_number(team_id)?,
        squad_id: parse_optional_number(squad_id)?,
        is_leader,
        role,
    })
}

/// Parses `AdminListDisconnectedPlayers`.
pub fn parse_disconnected_listing(text: &str) -> Result<Vec<DisconnectedPlayer>, RconError> {
    lines(text)
        .filter(|line| !line.starts_with(DISCONNECTED_HEADER_PREFIX))
        .map(parse_disconnected_line)
        .collect()
}

fn parse_disconnected_line(line: &str) -> Result<DisconnectedPlayer, RconError> {
    let record = (|| {
        let (id, rest) = field(line, "ID")?;
        let (steam_id, rest) = field(rest?, "SteamID")?;
        let (since, rest) = field(rest?, "Since Disconnect")?;
        // the name is last and takes the rest of the line
        let name = rest?.strip_prefix("Name: ")?;

        Some(DisconnectedPlayer {
            id: parse_number(id)?,
            steam_id: parse_steam_id(steam_id)?,
            name: name.to_string(),
            disconnected_since: parse_elapsed(since)?,
        })
    })();

    record.ok_or_else(|| RconError::unparsable(line))
}

/// Parses `Current map is <map>, Next map is <map>`. An empty slot (no next
/// map configured) comes back as `None`.
pub fn parse_map_rotation(text: &str) -> Result<MapRotation, RconError> {
    let line = lines(text).next().unwrap_or("");
    let (current, next) = line
        .strip_prefix("Current map is ")
        .and_then(|rest| rest.rsplit_once(", Next map is "))
        .or_else(|| {
            // the server drops the trailing space when nothing is queued
            line.strip_prefix("Current map is ")?
                .strip_suffix(", Next map is")
                .map(|current| (current, ""))
        })
        .ok_or_else(|| RconError::unparsable(line))?;

    Ok(MapRotation {
        current: non_empty(current),
        next: non_empty(next),
    })
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Non-blank lines with line endings stripped.
fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
}

/// Reads `key: value` at the start of `text`. The value runs up to the next
/// ` | `; the text after that separator is returned, or `None` at the end of
/// the line.
fn field<'a>(text: &'a str, key: &str) -> Option<(&'a str, Option<&'a str>)> {
    let value = text.strip_prefix(key)?.strip_prefix(": ")?;
    Some(match value.split_once(FIELD_SEPARATOR) {
        Some((value, rest)) => (value, Some(rest)),
        None => (value, None),
    })
}

fn parse_number(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn parse_optional_number(value: &str) -> Option<Option<u32>> {
    if value == NOT_AVAILABLE {
        Some(None)
    } else {
        parse_number(value).map(Some)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "True" => Some(true),
        "False" => Some(false),
        _ => None,
    }
}

fn parse_steam_id(value: &str) -> Option<String> {
    if value.len() == STEAM_ID_LEN && value.bytes().all(|b| b.is_ascii_digit()) {
        Some(value.to_string())
    } else {
        None
    }
}

/// `03m.15s` -> 195
fn parse_elapsed(value: &str) -> Option<u32> {
    let (minutes, seconds) = value.strip_suffix('s')?.split_once("m.")?;
    let seconds = parse_number(seconds)?;
    if seconds >= 60 {
        return None;
    }
    parse_number(minutes)?.checked_mul(60)?.checked_add(seconds)
}
