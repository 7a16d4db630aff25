pub mod parser;
pub mod replay;
pub mod timeline;

pub use parser::{DumpReplayParser, ParseError, ReplayParser};
pub use replay::{Command, CommandKind, Header, Named, Player, PlayerKind, Position, Replay};
pub use timeline::{
    format_frame, Event, EventType, ExtractError, ParsePolicyError, ParseProfileError, Profile,
    ResponseEnvelope, Timeline, TimelineExtractor, UnknownPlayerPolicy,
};
