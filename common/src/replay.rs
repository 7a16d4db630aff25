use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fully decoded replay: the header and the ordered command stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    pub header: Header,
    pub commands: Vec<Command>,
}

impl Replay {
    pub fn new(header: Header, commands: Vec<Command>) -> Self {
        Self { header, commands }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub engine: String,
    pub version: String,
    pub map_name: String,
    /// Total length of the replay in frames
    pub frames: u32,
    pub start_time: Option<DateTime<Utc>>,
    pub players: Vec<Player>,
}

impl Header {
    /// Roster lookup by command player id. Roster order is not significant.
    pub fn player(&self, player_id: u8) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: u8,
    pub name: String,
    pub race: String,
    pub team: u8,
    pub color: String,
    pub kind: PlayerKind,
}

impl Player {
    pub fn new(id: u8, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            race: String::new(),
            team: 0,
            color: String::new(),
            kind: PlayerKind::Human,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerKind {
    Human,
    Computer,
    Observer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// An identifier together with the display name the decoder resolved for it
/// (unit types, upgrades, techs, orders, hotkey types, command types).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Named {
    pub id: u16,
    pub name: String,
}

impl Named {
    pub fn new(id: u16, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

impl fmt::Display for Named {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "Unknown 0x{:x}", self.id)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// One recorded player action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub frame: u32,
    pub player_id: u8,
    pub kind: CommandKind,
}

impl Command {
    pub fn new(frame: u32, player_id: u8, kind: CommandKind) -> Self {
        Self { frame, player_id, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Build { unit: Named, pos: Position },
    Train { unit: Named },
    BuildingMorph { unit: Named },
    CancelTrain { unit_tag: u16 },
    Upgrade { upgrade: Named },
    Tech { tech: Named },
    TargetedOrder {
        order: Named,
        pos: Position,
        unit_tag: u16,
        unit: Named,
        queued: bool,
    },
    Hotkey { hotkey_type: Named, group: u8 },
    /// Select, Select Add and Select Remove
    Select { unit_tags: Vec<u16> },
    Land { unit: Named, pos: Position },
    LiftOff { pos: Position },
    Chat { message: String },
    /// Every command type the timeline does not classify
    Other { type_id: u16, name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(players: Vec<Player>) -> Header {
        Header {
            engine: String::new(),
            version: "1.16.1".to_string(),
            map_name: "Python".to_string(),
            frames: 0,
            start_time: None,
            players,
        }
    }

    #[test]
    fn test_player_lookup_uses_id() {
        let header = header(vec![Player::new(1, "Bob"), Player::new(0, "Alice")]);
        assert_eq!(header.player(0).map(|p| p.name.as_str()), Some("Alice"));
        assert_eq!(header.player(1).map(|p| p.name.as_str()), Some("Bob"));
    }

    #[test]
    fn test_player_lookup_with_gaps() {
        let header = header(vec![Player::new(0, "Alice"), Player::new(2, "Carol")]);
        assert_eq!(header.player(2).map(|p| p.name.as_str()), Some("Carol"));
        assert!(header.player(1).is_none());
    }

    #[test]
    fn test_named_display() {
        assert_eq!(Named::new(7, "SCV").to_string(), "SCV");
        assert_eq!(Named::new(0xe4, "").to_string(), "Unknown 0xe4");
    }
}
