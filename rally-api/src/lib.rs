//! # rally-api — REST client for the matching service
//!
//! Typed calls for auth, members, matching rooms, managers and matching.
//! Every request carries the stored bearer token; a 401 from any endpoint
//! clears it and broadcasts [`SessionEvent::Expired`].
//!
//! ## Modules
//!
//! - [`client`] — `ApiClient` and its endpoints
//! - [`config`] — Base URL and timeout
//! - [`error`] — `ApiError`
//! - [`token`] — Token persistence (memory, file)
//! - [`types`] — Member and auth request/response bodies

pub mod client;
pub mod config;
pub mod error;
pub mod token;
pub mod types;

// Re-exports for convenience
pub use client::{ApiClient, SessionEvent};
pub use config::{ApiConfig, DEFAULT_BASE_URL};
pub use error::{ApiError, ApiResult};
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore, TokenStoreError};
pub use types::{is_valid_phone_number, Level, MemberProfile, NewMember, ProfileUpdate};
