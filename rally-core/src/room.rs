//! Matching-room domain model.
//!
//! Field names follow the backend's JSON, including its `enterMebmerList`
//! spelling for the waiting list. The corrected `enterMemberList` is accepted
//! as an alias on input.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Players per doubles group.
pub const GROUP_SIZE: usize = 4;

/// Status a member can put themselves into within a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomMemberStatus {
    /// Waiting to be matched
    Waiting,
    /// In the room but sitting out of matching
    MatchingInactive,
    /// Left the room
    LeftRoom,
}

/// Member status as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    #[default]
    Waiting,
    MatchingInactive,
    LeftRoom,
    Playing,
    #[serde(other)]
    Unknown,
}

impl From<RoomMemberStatus> for MemberStatus {
    fn from(status: RoomMemberStatus) -> Self {
        match status {
            RoomMemberStatus::Waiting => Self::Waiting,
            RoomMemberStatus::MatchingInactive => Self::MatchingInactive,
            RoomMemberStatus::LeftRoom => Self::LeftRoom,
        }
    }
}

/// Status of a matched group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupStatus {
    #[default]
    Playing,
    Completed,
    #[serde(other)]
    Unknown,
}

/// Server-side grouping strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchingType {
    Random,
    Balanced,
}

/// Entry in the room list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomSummary {
    pub id: u64,
    pub name: String,
    pub member_count: u32,
}

/// A player inside a room, either waiting or in a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomMember {
    pub member_id: u64,
    pub name: String,
    pub level: String,
    pub status: MemberStatus,
}

/// A doubles pairing assigned to a court.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchGroup {
    pub id: u64,
    /// `None` until the server assigns a court
    pub court_number: Option<u32>,
    #[serde(rename = "memberList")]
    pub members: Vec<RoomMember>,
    pub status: GroupStatus,
}

impl MatchGroup {
    pub fn is_full(&self) -> bool {
        self.members.len() >= GROUP_SIZE
    }
}

/// Full room state as returned by `GET /matching-room/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomDetail {
    pub id: u64,
    pub name: String,
    pub is_manager: bool,
    #[serde(rename = "enterMebmerList", alias = "enterMemberList")]
    pub waiting: Vec<RoomMember>,
    #[serde(rename = "groupList")]
    pub groups: Vec<MatchGroup>,
    pub entry_code: Option<String>,
}

impl RoomDetail {
    /// Merge a pushed partial snapshot.
    ///
    /// Present fields replace the current value and absent ones are kept.
    /// Updates addressed to another room are ignored. Returns whether
    /// anything changed.
    pub fn apply_update(&mut self, update: RoomUpdate) -> bool {
        if let Some(id) = update.id {
            if self.id != 0 && id != self.id {
                log::debug!("Ignoring update for room {id} while tracking room {}", self.id);
                return false;
            }
        }

        let mut changed = false;
        if let Some(name) = update.name {
            changed |= replace(&mut self.name, name);
        }
        if let Some(waiting) = update.waiting {
            changed |= replace(&mut self.waiting, waiting);
        }
        if let Some(groups) = update.groups {
            changed |= replace(&mut self.groups, groups);
        }
        if let Some(code) = update.entry_code {
            changed |= replace(&mut self.entry_code, Some(code));
        }
        changed
    }

    /// Groups still on court.
    pub fn active_groups(&self) -> impl Iterator<Item = &MatchGroup> {
        self.groups.iter().filter(|g| g.status == GroupStatus::Playing)
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Partial room snapshot carried by a `roomUpdate` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomUpdate {
    #[serde(alias = "roomId", skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "enterMebmerList",
        alias = "enterMemberList",
        skip_serializing_if = "Option::is_none"
    )]
    pub waiting: Option<Vec<RoomMember>>,
    #[serde(rename = "groupList", skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<MatchGroup>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_code: Option<String>,
}

impl RoomUpdate {
    /// Decode an event payload.
    pub fn from_payload(payload: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn member(id: u64, name: &str) -> RoomMember {
        RoomMember {
            member_id: id,
            name: name.into(),
            level: "중급자".into(),
            status: MemberStatus::Waiting,
        }
    }

    #[test]
    fn test_room_detail_wire_names() {
        let room: RoomDetail = serde_json::from_value(json!({
            "id": 7,
            "name": "Tuesday club",
            "isManager": true,
            "enterMebmerList": [
                {"memberId": 1, "name": "Kim", "level": "초보자", "status": "WAITING"}
            ],
            "groupList": [
                {"id": 3, "courtNumber": 2, "memberList": [], "status": "PLAYING"}
            ],
            "entryCode": "AB12CD"
        }))
        .unwrap();

        assert_eq!(room.id, 7);
        assert!(room.is_manager);
        assert_eq!(room.waiting.len(), 1);
        assert_eq!(room.waiting[0].name, "Kim");
        assert_eq!(room.groups[0].court_number, Some(2));
        assert_eq!(room.entry_code.as_deref(), Some("AB12CD"));
    }

    #[test]
    fn test_room_detail_defaults_missing_fields() {
        let room: RoomDetail = serde_json::from_value(json!({"id": 9})).unwrap();
        assert!(!room.is_manager);
        assert!(room.waiting.is_empty());
        assert!(room.groups.is_empty());
        assert!(room.entry_code.is_none());
    }

    #[test]
    fn test_corrected_waiting_list_alias() {
        let room: RoomDetail = serde_json::from_value(json!({
            "enterMemberList": [{"memberId": 4}]
        }))
        .unwrap();
        assert_eq!(room.waiting[0].member_id, 4);
    }

    #[test]
    fn test_unknown_statuses_decode() {
        let m: RoomMember =
            serde_json::from_value(json!({"memberId": 1, "status": "RESTING"})).unwrap();
        assert_eq!(m.status, MemberStatus::Unknown);

        let g: MatchGroup = serde_json::from_value(json!({"status": "CANCELLED"})).unwrap();
        assert_eq!(g.status, GroupStatus::Unknown);
    }

    #[test]
    fn test_status_wire_values() {
        assert_eq!(
            serde_json::to_value(RoomMemberStatus::MatchingInactive).unwrap(),
            json!("MATCHING_INACTIVE")
        );
        assert_eq!(serde_json::to_value(MatchingType::Balanced).unwrap(), json!("BALANCED"));
        assert_eq!(serde_json::to_value(GroupStatus::Completed).unwrap(), json!("COMPLETED"));
        assert_eq!(MemberStatus::from(RoomMemberStatus::LeftRoom), MemberStatus::LeftRoom);
    }

    #[test]
    fn test_apply_partial_update_keeps_absent_fields() {
        let mut room = RoomDetail {
            id: 42,
            name: "Court A".into(),
            waiting: vec![member(1, "Kim"), member(2, "Lee")],
            ..RoomDetail::default()
        };

        let update = RoomUpdate::from_payload(&json!({
            "groupList": [{"id": 1, "memberList": [{"memberId": 1, "name": "Kim"}]}]
        }))
        .unwrap();

        assert!(room.apply_update(update));
        assert_eq!(room.name, "Court A");
        assert_eq!(room.waiting.len(), 2);
        assert_eq!(room.groups.len(), 1);
        assert!(room.groups[0].contains(1));
    }

    #[test]
    fn test_apply_update_reports_no_change() {
        let mut room = RoomDetail {
            id: 42,
            name: "Court A".into(),
            ..RoomDetail::default()
        };
        let update = RoomUpdate {
            name: Some("Court A".into()),
            ..RoomUpdate::default()
        };
        assert!(!room.apply_update(update));
        assert!(!room.apply_update(RoomUpdate::default()));
    }

    #[test]
    fn test_apply_update_for_other_room_ignored() {
        let mut room = RoomDetail {
            id: 42,
            ..RoomDetail::default()
        };
        let update = RoomUpdate::from_payload(&json!({"roomId": 43, "name": "Other"})).unwrap();
        assert!(!room.apply_update(update));
        assert!(room.name.is_empty());
    }

    #[test]
    fn test_apply_update_replaces_waiting_list() {
        let mut room = RoomDetail {
            id: 1,
            waiting: vec![member(1, "Kim")],
            ..RoomDetail::default()
        };
        let update = RoomUpdate {
            id: Some(1),
            waiting: Some(Vec::new()),
            ..RoomUpdate::default()
        };
        assert!(room.apply_update(update));
        assert!(room.waiting.is_empty());
    }

    #[test]
    fn test_active_groups_and_full_groups() {
        let room = RoomDetail {
            groups: vec![
                MatchGroup {
                    id: 5,
                    members: vec![member(2, "Lee"), member(3, "Park")],
                    ..MatchGroup::default()
                },
                MatchGroup {
                    id: 6,
                    members: (10..14).map(|id| member(id, "P")).collect(),
                    status: GroupStatus::Completed,
                    ..MatchGroup::default()
                },
            ],
            ..RoomDetail::default()
        };

        let active: Vec<u64> = room.active_groups().map(|g| g.id).collect();
        assert_eq!(active, vec![5]);
        assert!(!room.groups[0].is_full());
        assert!(room.groups[1].is_full());
    }

    #[test]
    fn test_update_payload_must_be_an_object() {
        assert_eq!(
            RoomUpdate::from_payload(&json!({"roomId": 3})).unwrap(),
            RoomUpdate {
                id: Some(3),
                ..RoomUpdate::default()
            }
        );
        assert!(RoomUpdate::from_payload(&json!("not an object")).is_err());
    }
}
