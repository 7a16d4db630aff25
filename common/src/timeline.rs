use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::replay::{Command, CommandKind, Player, Replay};

/// The engine runs at a fixed 25 frames per second.
pub const FRAMES_PER_SECOND: u32 = 25;
pub const FRAMES_PER_MINUTE: u32 = 60 * FRAMES_PER_SECOND;

/// Formats a frame number as `m:ss` game time. Truncates, never rounds.
pub fn format_frame(frame: u32) -> String {
    format!(
        "{}:{:02}",
        frame / FRAMES_PER_MINUTE,
        (frame / FRAMES_PER_SECOND) % 60
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Build,
    Train,
    BuildingMorph,
    CancelTrain,
    Upgrade,
    Tech,
    Order,
    Hotkey,
    Select,
    Land,
    LiftOff,
    Chat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub time: String,
    pub frame: u32,
    pub player: String,
    pub action: String,
    #[serde(rename = "type")]
    pub kind: EventType,
}

/// Describes a command as `(action, type)`, or `None` for kinds the timeline
/// does not report.
pub fn classify(kind: &CommandKind) -> Option<(String, EventType)> {
    let classified = match kind {
        CommandKind::Build { unit, .. } => (format!("Build {}", unit), EventType::Build),
        CommandKind::Train { unit } => (format!("Train {}", unit), EventType::Train),
        CommandKind::BuildingMorph { unit } => (
            format!("Morph Building to {}", unit),
            EventType::BuildingMorph,
        ),
        CommandKind::CancelTrain { unit_tag } => (
            format!("Cancel Train Unit (Tag: {:x})", unit_tag),
            EventType::CancelTrain,
        ),
        CommandKind::Upgrade { upgrade } => {
            (format!("Start Upgrade: {}", upgrade), EventType::Upgrade)
        }
        CommandKind::Tech { tech } => (format!("Research Tech: {}", tech), EventType::Tech),
        CommandKind::TargetedOrder { order, .. } => {
            (format!("Order: {}", order), EventType::Order)
        }
        CommandKind::Hotkey { hotkey_type, group } => (
            format!("Hotkey: {} (Group: {})", hotkey_type, group),
            EventType::Hotkey,
        ),
        CommandKind::Select { unit_tags } => (
            format!("Select {} units", unit_tags.len()),
            EventType::Select,
        ),
        CommandKind::Land { unit, pos } => (
            format!("Land {} at ({}, {})", unit, pos.x, pos.y),
            EventType::Land,
        ),
        CommandKind::LiftOff { pos } => (
            format!("Lift Off at ({}, {})", pos.x, pos.y),
            EventType::LiftOff,
        ),
        CommandKind::Chat { message } => (format!("Chat: {}", message), EventType::Chat),
        CommandKind::Other { .. } => return None,
    };
    Some(classified)
}

/// Which event types a timeline reports, and under which field name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// Every classified command
    #[default]
    Full,
    /// Production and research only
    BuildOrder,
}

impl Profile {
    pub fn includes(self, kind: EventType) -> bool {
        match self {
            Profile::Full => true,
            Profile::BuildOrder => matches!(
                kind,
                EventType::Build
                    | EventType::Train
                    | EventType::BuildingMorph
                    | EventType::CancelTrain
                    | EventType::Upgrade
                    | EventType::Tech
            ),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Full => "full",
            Profile::BuildOrder => "build-order",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown profile '{0}', expected 'full' or 'build-order'")]
pub struct ParseProfileError(pub String);

impl FromStr for Profile {
    type Err = ParseProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" | "events" => Ok(Profile::Full),
            "build-order" | "build_order" | "buildorders" => Ok(Profile::BuildOrder),
            _ => Err(ParseProfileError(s.to_string())),
        }
    }
}

/// What to do with a command whose player id is outside the roster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownPlayerPolicy {
    /// Fail the whole extraction
    #[default]
    Reject,
    /// Drop the command and keep going
    Skip,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown player policy '{0}', expected 'reject' or 'skip'")]
pub struct ParsePolicyError(pub String);

impl FromStr for UnknownPlayerPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(UnknownPlayerPolicy::Reject),
            "skip" => Ok(UnknownPlayerPolicy::Skip),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("command at frame {frame} references unknown player {player_id}")]
    UnknownPlayer { player_id: u8, frame: u32 },
}

/// The event array of an envelope. Serializes as `events` or `buildOrders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Timeline {
    Events(Vec<Event>),
    BuildOrders(Vec<Event>),
}

impl Timeline {
    pub fn for_profile(profile: Profile, events: Vec<Event>) -> Self {
        match profile {
            Profile::Full => Timeline::Events(events),
            Profile::BuildOrder => Timeline::BuildOrders(events),
        }
    }

    pub fn events(&self) -> &[Event] {
        match self {
            Timeline::Events(events) | Timeline::BuildOrders(events) => events,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub game_version: String,
    pub map_name: String,
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    pub profile: Profile,
    pub players: Vec<Player>,
    #[serde(flatten)]
    pub timeline: Timeline,
}

impl ResponseEnvelope {
    pub fn events(&self) -> &[Event] {
        self.timeline.events()
    }
}

/// Turns a decoded replay into its event timeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineExtractor {
    profile: Profile,
    unknown_player: UnknownPlayerPolicy,
}

impl TimelineExtractor {
    pub fn new(profile: Profile, unknown_player: UnknownPlayerPolicy) -> Self {
        Self {
            profile,
            unknown_player,
        }
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Builds one event per reported command, in command order.
    pub fn events(&self, replay: &Replay) -> Result<Vec<Event>, ExtractError> {
        let mut events = Vec::new();
        for command in &replay.commands {
            if let Some(event) = self.event_for(replay, command)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    pub fn extract(&self, replay: &Replay) -> Result<ResponseEnvelope, ExtractError> {
        let events = self.events(replay)?;
        let header = &replay.header;

        Ok(ResponseEnvelope {
            game_version: header.version.clone(),
            map_name: header.map_name.clone(),
            duration: format_frame(header.frames),
            start_time: header.start_time.map(|t| t.to_rfc3339()),
            profile: self.profile,
            players: header.players.clone(),
            timeline: Timeline::for_profile(self.profile, events),
        })
    }

    fn event_for(&self, replay: &Replay, command: &Command) -> Result<Option<Event>, ExtractError> {
        let Some((action, kind)) = classify(&command.kind) else {
            return Ok(None);
        };
        if !self.profile.includes(kind) {
            return Ok(None);
        }

        let Some(player) = replay.header.player(command.player_id) else {
            return match self.unknown_player {
                UnknownPlayerPolicy::Reject => Err(ExtractError::UnknownPlayer {
                    player_id: command.player_id,
                    frame: command.frame,
                }),
                UnknownPlayerPolicy::Skip => {
                    log::warn!(
                        "Skipping {:?} command at frame {} from unknown player {}",
                        kind,
                        command.frame,
                        command.player_id
                    );
                    Ok(None)
                }
            };
        };

        Ok(Some(Event {
            time: format_frame(command.frame),
            frame: command.frame,
            player: player.name.clone(),
            action,
            kind,
        }))
    }
}
