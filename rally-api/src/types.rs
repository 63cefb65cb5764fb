//! Request and response bodies for the member and auth endpoints.
//!
//! Room types are shared with the channel and live in `rally-core`.

use rally_core::{GroupStatus, MatchingType, RoomMemberStatus};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Korean mobile numbers, optionally `+82` prefixed, dashes optional.
static PHONE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(\+82-?)?(010|011|016|017|018|019)-?\d{3,4}-?\d{4}$").ok()
});

/// Club skill tier chosen at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    Master,
    GroupA,
    GroupB,
    GroupC,
    GroupD,
    #[default]
    Beginner,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Master,
        Level::GroupA,
        Level::GroupB,
        Level::GroupC,
        Level::GroupD,
        Level::Beginner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Master => "MASTER",
            Level::GroupA => "GROUP_A",
            Level::GroupB => "GROUP_B",
            Level::GroupC => "GROUP_C",
            Level::GroupD => "GROUP_D",
            Level::Beginner => "BEGINNER",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Level::ALL
            .into_iter()
            .find(|level| level.as_str() == wanted)
            .ok_or_else(|| format!("Unknown level: {s}"))
    }
}

/// Whether `phone` looks like a mobile number the backend accepts.
pub fn is_valid_phone_number(phone: &str) -> bool {
    PHONE_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(phone))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginRequest<'a> {
    pub login_id: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
}

/// Registration form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    pub login_id: String,
    pub password: String,
    pub username: String,
    pub phone_number: String,
    pub level: Level,
}

impl NewMember {
    /// Checks done before the form is sent.
    pub fn validate(&self) -> Result<(), String> {
        if self.login_id.trim().is_empty() {
            return Err("Login id is required".into());
        }
        if self.password.is_empty() {
            return Err("Password is required".into());
        }
        if self.username.trim().is_empty() {
            return Err("Name is required".into());
        }
        if !is_valid_phone_number(&self.phone_number) {
            return Err(format!("Invalid phone number: {}", self.phone_number));
        }
        Ok(())
    }
}

/// The logged-in member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MemberProfile {
    #[serde(alias = "memberId", skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub login_id: String,
    #[serde(alias = "username")]
    pub name: String,
    pub phone_number: String,
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub level: Level,
}

#[derive(Debug, Serialize)]
pub(crate) struct PasswordBody<'a> {
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateRoomBody<'a> {
    pub room_name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RoomStatusBody {
    pub status: RoomMemberStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MatchingBody {
    pub matching_type: MatchingType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CustomMatchingBody<'a> {
    pub member_ids: &'a [u64],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReplaceMemberBody {
    pub old_member_id: u64,
    pub new_member_id: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct GroupStatusBody {
    pub status: GroupStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form() -> NewMember {
        NewMember {
            login_id: "shuttle".into(),
            password: "pw".into(),
            username: "Kim".into(),
            phone_number: "010-1234-5678".into(),
            level: Level::GroupB,
        }
    }

    #[test]
    fn test_phone_numbers() {
        assert!(is_valid_phone_number("010-1234-5678"));
        assert!(is_valid_phone_number("01012345678"));
        assert!(is_valid_phone_number("+82-010-1234-5678"));
        assert!(is_valid_phone_number("016-123-4567"));
        assert!(!is_valid_phone_number("012-1234-5678"));
        assert!(!is_valid_phone_number("010-12-5678"));
        assert!(!is_valid_phone_number(""));
    }

    #[test]
    fn test_new_member_wire_shape() {
        let value = serde_json::to_value(form()).unwrap();
        assert_eq!(
            value,
            json!({
                "loginId": "shuttle",
                "password": "pw",
                "username": "Kim",
                "phoneNumber": "010-1234-5678",
                "level": "GROUP_B",
            })
        );
    }

    #[test]
    fn test_new_member_validation() {
        assert!(form().validate().is_ok());
        let bad_phone = NewMember {
            phone_number: "12345".into(),
            ..form()
        };
        assert!(bad_phone.validate().unwrap_err().contains("phone"));
        let no_name = NewMember {
            username: " ".into(),
            ..form()
        };
        assert!(no_name.validate().is_err());
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("group_a".parse::<Level>().unwrap(), Level::GroupA);
        assert_eq!("GROUP-D".parse::<Level>().unwrap(), Level::GroupD);
        assert_eq!("master".parse::<Level>().unwrap(), Level::Master);
        assert!("pro".parse::<Level>().is_err());
        assert_eq!(Level::default(), Level::Beginner);
    }

    #[test]
    fn test_profile_accepts_username_alias() {
        let profile: MemberProfile = serde_json::from_value(json!({
            "memberId": 5,
            "loginId": "shuttle",
            "username": "Kim",
            "level": "GROUP_B"
        }))
        .unwrap();
        assert_eq!(profile.id, Some(5));
        assert_eq!(profile.name, "Kim");
        assert_eq!(profile.phone_number, "");
    }
}
