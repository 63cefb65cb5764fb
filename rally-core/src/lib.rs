//! # rally-core — Matching-room domain types
//!
//! Shared by the realtime channel, the REST client and the CLI.
//!
//! ## Modules
//!
//! - [`room`] — Rooms, members, groups and the `roomUpdate` merge
//! - [`link`] — QR / deep-link parsing into a room id or entry code

pub mod link;
pub mod room;

pub use link::{LinkError, RoomLink};
pub use room::{
    GroupStatus, MatchGroup, MatchingType, MemberStatus, RoomDetail, RoomMember,
    RoomMemberStatus, RoomSummary, RoomUpdate, GROUP_SIZE,
};
