//! Command-line definitions.

use clap::{Args, Parser, Subcommand};
use rally_api::{Level, DEFAULT_BASE_URL};
use rally_core::{GroupStatus, MatchingType, RoomMemberStatus, GROUP_SIZE};
use serde::de::DeserializeOwned;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rally", version, about = "Badminton matching room client")]
pub struct Cli {
    /// REST API base URL
    #[arg(long, global = true, env = "RALLY_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Realtime WebSocket endpoint
    #[arg(
        long,
        global = true,
        env = "RALLY_WEBSOCKET_URL",
        default_value = "ws://localhost:8080/ws"
    )]
    pub ws_url: String,

    /// Where the auth token is kept [default: {config_dir}/rally/token]
    #[arg(long, global = true, env = "RALLY_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "RALLY_TIMEOUT", default_value_t = 10)]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the session token
    Login {
        login_id: String,
        #[arg(long, env = "RALLY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored token
    Logout,
    /// Create an account
    Register(RegisterArgs),
    /// Show your profile
    Profile,
    /// Change your name or level
    UpdateProfile {
        #[arg(long)]
        name: String,
        #[arg(long)]
        level: Level,
    },
    /// Delete your account
    DeleteAccount {
        #[arg(long, env = "RALLY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// List matching rooms
    Rooms,
    /// Create a matching room
    CreateRoom { name: String },
    /// Join a room by id, entry code or QR link
    Join(JoinArgs),
    /// Show a room
    Room { room_id: u64 },
    /// Set your status in a room (waiting, matching-inactive, left-room)
    Status {
        room_id: u64,
        #[arg(value_parser = parse_wire_enum::<RoomMemberStatus>)]
        status: RoomMemberStatus,
    },
    /// Grant or revoke room manager rights
    #[command(subcommand)]
    Manager(ManagerCommand),
    /// Start matching and edit groups
    #[command(subcommand)]
    Match(MatchCommand),
    /// Follow a room live until Ctrl-C
    Watch {
        /// Room id or QR link
        room: String,
        /// Reconnect attempts before giving up
        #[arg(long, env = "RALLY_MAX_RETRIES", default_value_t = 5)]
        max_retries: u32,
    },
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    pub login_id: String,
    #[arg(long, env = "RALLY_PASSWORD", hide_env_values = true)]
    pub password: String,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long, default_value = "BEGINNER")]
    pub level: Level,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct JoinArgs {
    pub room_id: Option<u64>,
    #[arg(long)]
    pub code: Option<String>,
    /// Text scanned from a room QR code
    #[arg(long)]
    pub link: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ManagerCommand {
    Grant { room_id: u64, member_id: u64 },
    Revoke { room_id: u64, member_id: u64 },
}

#[derive(Subcommand, Debug)]
pub enum MatchCommand {
    /// Group the waiting list
    Start {
        room_id: u64,
        #[arg(long = "type", default_value = "random", value_parser = parse_wire_enum::<MatchingType>)]
        matching_type: MatchingType,
    },
    /// Form one group from hand-picked members
    Custom {
        room_id: u64,
        #[arg(num_args = GROUP_SIZE, required = true)]
        member_ids: Vec<u64>,
    },
    /// Swap a member out of a group
    Replace {
        room_id: u64,
        group_id: u64,
        old_member_id: u64,
        new_member_id: u64,
    },
    /// Mark a group playing or completed
    GroupStatus {
        room_id: u64,
        group_id: u64,
        #[arg(value_parser = parse_group_status)]
        status: GroupStatus,
    },
}

/// Parse a wire enum from its `SCREAMING_SNAKE_CASE` name, case and dash
/// insensitive.
pub fn parse_wire_enum<T: DeserializeOwned>(s: &str) -> Result<T, String> {
    let wire = s.trim().to_ascii_uppercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(wire))
        .map_err(|_| format!("Unrecognized value: {s}"))
}

fn parse_group_status(s: &str) -> Result<GroupStatus, String> {
    match parse_wire_enum(s)? {
        GroupStatus::Unknown => Err(format!("Unrecognized group status: {s}")),
        status => Ok(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_wire_enum_parsing() {
        assert_eq!(
            parse_wire_enum::<RoomMemberStatus>("matching-inactive").unwrap(),
            RoomMemberStatus::MatchingInactive
        );
        assert_eq!(
            parse_wire_enum::<MatchingType>("Balanced").unwrap(),
            MatchingType::Balanced
        );
        assert!(parse_wire_enum::<MatchingType>("fair").is_err());
        assert!(parse_group_status("done").is_err());
        assert_eq!(parse_group_status("completed").unwrap(), GroupStatus::Completed);
    }

    #[test]
    fn test_join_needs_exactly_one_target() {
        assert!(Cli::try_parse_from(["rally", "join"]).is_err());
        assert!(Cli::try_parse_from(["rally", "join", "3", "--code", "AB12"]).is_err());

        let cli = Cli::try_parse_from(["rally", "join", "--code", "AB12"]).unwrap();
        match cli.command {
            Command::Join(args) => assert_eq!(args.code.as_deref(), Some("AB12")),
            other => panic!("Expected join, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_match_takes_a_full_group() {
        assert!(Cli::try_parse_from(["rally", "match", "custom", "1", "2", "3", "4"]).is_err());
        let cli = Cli::try_parse_from(["rally", "match", "custom", "1", "2", "3", "4", "5"]).unwrap();
        match cli.command {
            Command::Match(MatchCommand::Custom { room_id, member_ids }) => {
                assert_eq!(room_id, 1);
                assert_eq!(member_ids, vec![2, 3, 4, 5]);
            }
            other => panic!("Expected custom match, got {other:?}"),
        }
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::try_parse_from([
            "rally",
            "rooms",
            "--api-url",
            "https://rally.example/api/v1",
            "--timeout",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.api_url, "https://rally.example/api/v1");
        assert_eq!(cli.timeout, 3);
        assert!(matches!(cli.command, Command::Rooms));
    }
}
