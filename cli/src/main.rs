use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use common::{
    DumpReplayParser, Profile, ReplayParser, ResponseEnvelope, TimelineExtractor,
    UnknownPlayerPolicy,
};
use std::fmt::{self, Write as _};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "replay-cli",
    about = "Print the event timeline of a decoded replay dump"
)]
struct Args {
    /// Replay dump to analyze (JSON, optionally gzip compressed)
    file: PathBuf,

    /// Event profile: full | build-order
    #[arg(long, default_value = "full")]
    profile: Profile,

    /// Drop commands from players missing in the roster instead of failing
    #[arg(long)]
    skip_unknown_players: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let policy = if args.skip_unknown_players {
        UnknownPlayerPolicy::Skip
    } else {
        UnknownPlayerPolicy::Reject
    };

    let replay = DumpReplayParser
        .parse_file(&args.file)
        .with_context(|| format!("Failed to parse replay {:?}", args.file))?;
    info!(
        "Parsed {:?}: {} commands, {} players",
        args.file,
        replay.commands.len(),
        replay.header.players.len()
    );

    let envelope = TimelineExtractor::new(args.profile, policy)
        .extract(&replay)
        .context("Failed to extract timeline")?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&envelope)?),
        OutputFormat::Table => print!("{}", render_table(&envelope)?),
    }

    Ok(())
}

fn render_table(envelope: &ResponseEnvelope) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let players: Vec<&str> = envelope.players.iter().map(|p| p.name.as_str()).collect();

    writeln!(out, "Map:      {}", envelope.map_name)?;
    writeln!(out, "Version:  {}", envelope.game_version)?;
    writeln!(out, "Duration: {}", envelope.duration)?;
    writeln!(out, "Players:  {}", players.join(", "))?;
    writeln!(out, "Profile:  {}", envelope.profile)?;
    out.push('\n');

    let events = envelope.events();
    let tw = events.iter().map(|e| e.time.len()).max().unwrap_or(0).max(4);
    let pw = events.iter().map(|e| e.player.len()).max().unwrap_or(0).max(6);

    writeln!(out, "{:>tw$}  {:<pw$}  ACTION", "TIME", "PLAYER")?;
    for event in events {
        writeln!(out, "{:>tw$}  {:<pw$}  {}", event.time, event.player, event.action)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Command, CommandKind, Header, Named, Player, Replay};

    #[test]
    fn test_render_table() {
        let replay = Replay::new(
            Header {
                engine: "Brood War".to_string(),
                version: "1.16.1".to_string(),
                map_name: "Circuit Breaker".to_string(),
                frames: 1500,
                start_time: None,
                players: vec![Player::new(0, "Alice"), Player::new(1, "Bartholomew")],
            },
            vec![
                Command::new(0, 0, CommandKind::Train { unit: Named::new(7, "SCV") }),
                Command::new(15000, 1, CommandKind::Chat { message: "gg".to_string() }),
            ],
        );
        let envelope = TimelineExtractor::default().extract(&replay).unwrap();

        let table = render_table(&envelope).unwrap();
        assert!(table.contains("Map:      Circuit Breaker"));
        assert!(table.contains("Duration: 1:00"));
        assert!(table.contains("Players:  Alice, Bartholomew"));
        assert!(table.contains(" TIME  PLAYER       ACTION"));
        assert!(table.contains(" 0:00  Alice        Train SCV"));
        assert!(table.contains("10:00  Bartholomew  Chat: gg"));
    }

    #[test]
    fn test_args() {
        let args = Args::parse_from([
            "replay-cli",
            "game.json",
            "--profile",
            "build-order",
            "--format",
            "json",
        ]);
        assert_eq!(args.profile, Profile::BuildOrder);
        assert_eq!(args.format, OutputFormat::Json);
        assert!(!args.skip_unknown_players);
        assert!(Args::try_parse_from(["replay-cli", "game.json", "--profile", "all"]).is_err());
    }
}
