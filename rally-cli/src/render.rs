//! Plain-text rendering for the terminal.

use rally_api::MemberProfile;
use rally_core::{MatchGroup, MemberStatus, RoomDetail, RoomMember, RoomSummary, GROUP_SIZE};
use std::fmt::Write;

pub fn room_list(rooms: &[RoomSummary]) -> String {
    if rooms.is_empty() {
        return "No rooms yet.\n".to_string();
    }
    let mut out = String::new();
    for room in rooms {
        let _ = writeln!(out, "{:>6}  {}  ({} joined)", room.id, room.name, room.member_count);
    }
    out
}

pub fn profile(profile: &MemberProfile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", profile.name, profile.login_id);
    if !profile.level.is_empty() {
        let _ = writeln!(out, "  level: {}", profile.level);
    }
    if !profile.phone_number.is_empty() {
        let _ = writeln!(out, "  phone: {}", profile.phone_number);
    }
    out
}

fn member_line(member: &RoomMember) -> String {
    let status = match member.status {
        MemberStatus::Waiting => "",
        MemberStatus::MatchingInactive => " [sitting out]",
        MemberStatus::LeftRoom => " [left]",
        MemberStatus::Playing => " [playing]",
        MemberStatus::Unknown => " [?]",
    };
    format!("#{} {} ({}){status}", member.member_id, member.name, member.level)
}

fn group_block(out: &mut String, group: &MatchGroup) {
    let court = group
        .court_number
        .map_or_else(|| "no court".to_string(), |c| format!("court {c}"));
    let short = if group.is_full() {
        String::new()
    } else {
        format!(" · {}/{GROUP_SIZE} players", group.members.len())
    };
    let _ = writeln!(out, "  group {} · {court} · {:?}{short}", group.id, group.status);
    for member in &group.members {
        let _ = writeln!(out, "    {}", member_line(member));
    }
}

/// Full room view.
pub fn room(room: &RoomDetail) -> String {
    let mut out = String::new();
    let role = if room.is_manager { " (manager)" } else { "" };
    let _ = writeln!(out, "Room {} · {}{role}", room.id, room.name);
    if let Some(code) = &room.entry_code {
        let _ = writeln!(out, "Entry code: {code}");
    }

    let _ = writeln!(out, "Waiting ({}):", room.waiting.len());
    for member in &room.waiting {
        let _ = writeln!(out, "  {}", member_line(member));
    }

    let _ = writeln!(
        out,
        "Groups ({}, {} on court):",
        room.groups.len(),
        room.active_groups().count()
    );
    for group in &room.groups {
        group_block(&mut out, group);
    }
    out
}
