//! Replay decoding collaborator.
//!
//! Binary `.rep` decoding lives outside this workspace. Decoders hand their
//! result over as a JSON replay dump (optionally gzip compressed) whose shape
//! mirrors the decoder's own structs:
//!
//! ```json
//! {
//!   "Header": { "Engine": {"Name": "Brood War"}, "Version": "1.16.1",
//!               "Frames": 30000, "Map": "Fighting Spirit",
//!               "Players": [{"ID": 0, "Name": "Alice", "Race": {"Name": "Terran"}}] },
//!   "Commands": { "Cmds": [
//!       {"Frame": 0, "PlayerID": 0, "Type": {"ID": 12, "Name": "Build"},
//!        "Pos": {"X": 10, "Y": 20}, "Unit": {"ID": 111, "Name": "Barracks"}} ] }
//! }
//! ```

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::replay::{Command, CommandKind, Header, Named, Player, PlayerKind, Position, Replay};

/// Command type ids as recorded in the replay format. Ids outside this set,
/// including anything that does not fit a byte, decode as `Other`.
pub mod type_id {
    pub const SELECT: u16 = 0x09;
    pub const SELECT_ADD: u16 = 0x0a;
    pub const SELECT_REMOVE: u16 = 0x0b;
    pub const BUILD: u16 = 0x0c;
    pub const HOTKEY: u16 = 0x13;
    pub const TARGETED_ORDER: u16 = 0x15;
    pub const TRAIN: u16 = 0x1f;
    pub const CANCEL_TRAIN: u16 = 0x20;
    pub const UNIT_MORPH: u16 = 0x23;
    pub const LIFT_OFF: u16 = 0x2f;
    pub const TECH: u16 = 0x30;
    pub const UPGRADE: u16 = 0x32;
    pub const BUILDING_MORPH: u16 = 0x35;
    pub const CHAT: u16 = 0x5c;
    pub const TARGETED_ORDER_121: u16 = 0x61;
    pub const SELECT_121: u16 = 0x63;
    pub const SELECT_ADD_121: u16 = 0x64;
    pub const SELECT_REMOVE_121: u16 = 0x65;
}

/// Build commands carrying this order are landings of lifted buildings.
pub const ORDER_BUILDING_LAND: u16 = 0x47;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read replay file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("replay data is empty")]
    Empty,
    #[error("failed to decompress replay data")]
    Decompress(#[source] std::io::Error),
    #[error("malformed replay dump")]
    Json(#[from] serde_json::Error),
    #[error("command {index} ({command}) is missing field {field}")]
    MissingField {
        index: usize,
        command: String,
        field: &'static str,
    },
    #[error("command {index} at frame {frame} precedes frame {previous}")]
    UnorderedCommands { index: usize, frame: u32, previous: u32 },
    #[error("player id {0} appears more than once in the roster")]
    DuplicatePlayer(u8),
}

/// Anything able to turn a staged replay file into a [`Replay`].
pub trait ReplayParser: Send + Sync {
    fn parse_file(&self, path: &Path) -> Result<Replay, ParseError>;
}

/// Parser for JSON replay dumps, plain or gzip compressed.
#[derive(Debug, Default, Clone, Copy)]
pub struct DumpReplayParser;

impl ReplayParser for DumpReplayParser {
    fn parse_file(&self, path: &Path) -> Result<Replay, ParseError> {
        let bytes = fs::read(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_bytes(&bytes)
    }
}

impl DumpReplayParser {
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Replay, ParseError> {
        if bytes.is_empty() {
            return Err(ParseError::Empty);
        }

        let dump: RawDump = if bytes.starts_with(&GZIP_MAGIC) {
            let mut json = Vec::new();
            GzDecoder::new(bytes)
                .read_to_end(&mut json)
                .map_err(ParseError::Decompress)?;
            serde_json::from_slice(&json)?
        } else {
            serde_json::from_slice(bytes)?
        };

        dump.into_replay()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawDump {
    header: RawHeader,
    #[serde(default)]
    commands: Option<RawCommands>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawNamed {
    #[serde(rename = "ID", default)]
    id: u16,
    #[serde(default)]
    name: String,
}

impl From<RawNamed> for Named {
    fn from(raw: RawNamed) -> Self {
        Named::new(raw.id, raw.name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawHeader {
    #[serde(default)]
    engine: Option<RawNamed>,
    #[serde(default)]
    version: String,
    #[serde(default)]
    frames: u32,
    #[serde(default)]
    start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    map: String,
    #[serde(default)]
    players: Vec<RawPlayer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPlayer {
    #[serde(rename = "ID")]
    id: u8,
    name: String,
    #[serde(default)]
    race: Option<RawNamed>,
    #[serde(default)]
    team: u8,
    #[serde(default)]
    color: Option<RawNamed>,
    #[serde(rename = "Type", default)]
    player_type: Option<RawNamed>,
    #[serde(default)]
    observer: bool,
}

impl From<RawPlayer> for Player {
    fn from(raw: RawPlayer) -> Self {
        let type_name = raw.player_type.map(|t| t.name).unwrap_or_default();
        let kind = if raw.observer {
            PlayerKind::Observer
        } else if type_name.starts_with("Computer") {
            PlayerKind::Computer
        } else {
            PlayerKind::Human
        };

        Player {
            id: raw.id,
            name: raw.name,
            race: raw.race.map(|r| r.name).unwrap_or_default(),
            team: raw.team,
            color: raw.color.map(|c| c.name).unwrap_or_default(),
            kind,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCommands {
    #[serde(default)]
    cmds: Vec<RawCommand>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCommand {
    frame: u32,
    #[serde(rename = "PlayerID")]
    player_id: u8,
    #[serde(rename = "Type")]
    command_type: RawNamed,
    order: Option<RawNamed>,
    pos: Option<RawPosition>,
    unit: Option<RawNamed>,
    unit_tag: Option<u16>,
    unit_tags: Option<Vec<u16>>,
    upgrade: Option<RawNamed>,
    tech: Option<RawNamed>,
    hotkey_type: Option<RawNamed>,
    group: Option<u8>,
    message: Option<String>,
    #[serde(default)]
    queued: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPosition {
    x: u16,
    y: u16,
}

impl From<RawPosition> for Position {
    fn from(raw: RawPosition) -> Self {
        Position::new(raw.x, raw.y)
    }
}

impl RawDump {
    fn into_replay(self) -> Result<Replay, ParseError> {
        let raw_header = self.header;

        let mut seen = HashSet::new();
        if let Some(dup) = raw_header.players.iter().find(|p| !seen.insert(p.id)) {
            return Err(ParseError::DuplicatePlayer(dup.id));
        }

        let header = Header {
            engine: raw_header.engine.map(|e| e.name).unwrap_or_default(),
            version: raw_header.version,
            map_name: raw_header.map,
            frames: raw_header.frames,
            start_time: raw_header.start_time,
            players: raw_header.players.into_iter().map(Player::from).collect(),
        };

        let raw_commands = self.commands.map(|c| c.cmds).unwrap_or_default();
        let mut commands = Vec::with_capacity(raw_commands.len());
        let mut previous = 0;

        for (index, raw) in raw_commands.into_iter().enumerate() {
            if raw.frame < previous {
                return Err(ParseError::UnorderedCommands {
                    index,
                    frame: raw.frame,
                    previous,
                });
            }
            previous = raw.frame;
            commands.push(raw.into_command(index)?);
        }

        Ok(Replay::new(header, commands))
    }
}

impl RawCommand {
    fn into_command(self, index: usize) -> Result<Command, ParseError> {
        let frame = self.frame;
        let player_id = self.player_id;
        let command = self.command_type.name.clone();
        let missing = |field: &'static str| ParseError::MissingField {
            index,
            command: command.clone(),
            field,
        };

        let kind = match self.command_type.id {
            type_id::BUILD => {
                let order = self.order.ok_or_else(|| missing("Order"))?;
                let unit = self.unit.ok_or_else(|| missing("Unit"))?.into();
                let pos = self.pos.ok_or_else(|| missing("Pos"))?.into();
                if order.id == ORDER_BUILDING_LAND {
                    CommandKind::Land { unit, pos }
                } else {
                    CommandKind::Build { unit, pos }
                }
            }
            type_id::TRAIN | type_id::UNIT_MORPH => CommandKind::Train {
                unit: self.unit.ok_or_else(|| missing("Unit"))?.into(),
            },
            type_id::BUILDING_MORPH => CommandKind::BuildingMorph {
                unit: self.unit.ok_or_else(|| missing("Unit"))?.into(),
            },
            type_id::CANCEL_TRAIN => CommandKind::CancelTrain {
                unit_tag: self.unit_tag.ok_or_else(|| missing("UnitTag"))?,
            },
            type_id::UPGRADE => CommandKind::Upgrade {
                upgrade: self.upgrade.ok_or_else(|| missing("Upgrade"))?.into(),
            },
            type_id::TECH => CommandKind::Tech {
                tech: self.tech.ok_or_else(|| missing("Tech"))?.into(),
            },
            type_id::TARGETED_ORDER | type_id::TARGETED_ORDER_121 => CommandKind::TargetedOrder {
                order: self.order.ok_or_else(|| missing("Order"))?.into(),
                pos: self.pos.map(Position::from).unwrap_or_default(),
                unit_tag: self.unit_tag.unwrap_or_default(),
                unit: self.unit.map(Named::from).unwrap_or_default(),
                queued: self.queued,
            },
            type_id::HOTKEY => CommandKind::Hotkey {
                hotkey_type: self.hotkey_type.ok_or_else(|| missing("HotkeyType"))?.into(),
                group: self.group.ok_or_else(|| missing("Group"))?,
            },
            type_id::SELECT
            | type_id::SELECT_ADD
            | type_id::SELECT_REMOVE
            | type_id::SELECT_121
            | type_id::SELECT_ADD_121
            | type_id::SELECT_REMOVE_121 => CommandKind::Select {
                unit_tags: self.unit_tags.ok_or_else(|| missing("UnitTags"))?,
            },
            type_id::LIFT_OFF => CommandKind::LiftOff {
                pos: self.pos.ok_or_else(|| missing("Pos"))?.into(),
            },
            type_id::CHAT => CommandKind::Chat {
                message: self.message.ok_or_else(|| missing("Message"))?,
            },
            other => CommandKind::Other {
                type_id: other,
                name: self.command_type.name,
            },
        };

        Ok(Command::new(frame, player_id, kind))
    }
}
