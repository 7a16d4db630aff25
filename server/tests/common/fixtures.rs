use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use std::io::Write;

/// Replay dump with the given players and raw command objects
pub fn replay_dump(players: &[&str], commands: Vec<Value>) -> Value {
    let players: Vec<Value> = players
        .iter()
        .enumerate()
        .map(|(id, name)| {
            json!({
                "ID": id,
                "Name": name,
                "Race": {"ID": 1, "Name": "Terran"},
                "Team": id + 1,
                "Color": {"ID": id, "Name": "Red"},
                "Type": {"ID": 2, "Name": "Human"},
            })
        })
        .collect();

    json!({
        "Header": {
            "Engine": {"ID": 1, "Name": "Brood War"},
            "Version": "1.16.1",
            "Frames": 37499,
            "StartTime": "2024-03-01T18:30:00Z",
            "Map": "Fighting Spirit",
            "Players": players,
        },
        "Commands": {"Cmds": commands},
    })
}

pub fn build(frame: u32, player_id: u8, unit: &str) -> Value {
    json!({
        "Frame": frame, "PlayerID": player_id,
        "Type": {"ID": 0x0c, "Name": "Build"},
        "Order": {"ID": 0x1e, "Name": "PlaceBuilding"},
        "Pos": {"X": 12, "Y": 34},
        "Unit": {"ID": 111, "Name": unit},
    })
}

pub fn train(frame: u32, player_id: u8, unit: &str) -> Value {
    json!({
        "Frame": frame, "PlayerID": player_id,
        "Type": {"ID": 0x1f, "Name": "Train"},
        "Unit": {"ID": 7, "Name": unit},
    })
}

pub fn cancel_train(frame: u32, player_id: u8, unit_tag: u16) -> Value {
    json!({
        "Frame": frame, "PlayerID": player_id,
        "Type": {"ID": 0x20, "Name": "Cancel Train"},
        "UnitTag": unit_tag,
    })
}

pub fn chat(frame: u32, player_id: u8, message: &str) -> Value {
    json!({
        "Frame": frame, "PlayerID": player_id,
        "Type": {"ID": 0x5c, "Name": "Chat"},
        "SenderSlotID": player_id,
        "Message": message,
    })
}

pub fn select(frame: u32, player_id: u8, unit_tags: &[u16]) -> Value {
    json!({
        "Frame": frame, "PlayerID": player_id,
        "Type": {"ID": 0x63, "Name": "Select121"},
        "UnitTags": unit_tags,
    })
}

pub fn right_click(frame: u32, player_id: u8) -> Value {
    json!({
        "Frame": frame, "PlayerID": player_id,
        "Type": {"ID": 0x60, "Name": "Right Click121"},
        "Pos": {"X": 1, "Y": 2},
    })
}

pub fn to_bytes(dump: &Value) -> Vec<u8> {
    serde_json::to_vec(dump).expect("fixture serializes")
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("gzip write");
    encoder.finish().expect("gzip finish")
}
