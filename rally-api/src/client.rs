//! Matching-service HTTP client.

use rally_core::{GroupStatus, MatchingType, RoomDetail, RoomMemberStatus, RoomSummary, GROUP_SIZE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use url::Url;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::token::TokenStore;
use crate::types::*;

const SESSION_EVENT_CAPACITY: usize = 16;

/// Authentication lifecycle, broadcast to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    LoggedOut,
    /// The backend answered 401 and the token was dropped. Send the user
    /// back to login.
    Expired,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Message to show for a failed response.
///
/// Prefers the body's `message` field, then the raw body, then the status
/// text.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorBody { message: Some(message) }) = serde_json::from_str::<ErrorBody>(body) {
        if !message.is_empty() {
            return message;
        }
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

/// Client for the matching service REST API.
///
/// Attaches the stored bearer token to every request. A 401 from any
/// endpoint clears the token and broadcasts [`SessionEvent::Expired`].
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
    sessions: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    pub fn new(config: ApiConfig, tokens: Arc<dyn TokenStore>) -> ApiResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidBaseUrl(config.base_url));
        }

        let http = Client::builder().timeout(config.timeout).build()?;
        let (sessions, _) = broadcast::channel(SESSION_EVENT_CAPACITY);

        Ok(Self {
            http,
            base_url,
            tokens,
            sessions,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Listen for login, logout and expiry.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sessions.subscribe()
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.tokens.get(), Ok(Some(_)))
    }

    /// `base_url` + percent-encoded `segments`.
    pub fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ApiResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        log::debug!("{method} {}", url.path());

        let mut request = self.http.request(method, url);
        match self.tokens.get() {
            Ok(Some(token)) => request = request.bearer_auth(token),
            Ok(None) => {}
            Err(e) => log::warn!("Cannot read stored token: {e}"),
        }
        Ok(request)
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = request.send().await.inspect_err(|e| {
            log::warn!("Request failed: {e}");
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            log::warn!("{} returned 401, session expired", response.url().path());
            self.expire();
            return Err(ApiError::Unauthorized);
        }

        let path = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        log::warn!("{path} returned {status}: {message}");
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        Ok(self.send(request).await?.json().await?)
    }

    /// Decode the body if there is one.
    async fn optional_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> ApiResult<Option<T>> {
        let text = self.send(request).await?.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                log::debug!("Ignoring unexpected response body: {e}");
                Ok(None)
            }
        }
    }

    async fn empty(&self, request: RequestBuilder) -> ApiResult<()> {
        self.send(request).await?;
        Ok(())
    }

    fn expire(&self) {
        if let Err(e) = self.tokens.clear() {
            log::warn!("Failed to clear stored token: {e}");
        }
        let _ = self.sessions.send(SessionEvent::Expired);
    }

    // ── Auth & member ──────────────────────────────────────────────

    /// Log in and store the returned token.
    pub async fn login(&self, login_id: &str, password: &str) -> ApiResult<()> {
        let request = self
            .request(Method::POST, &["auth", "login"])?
            .json(&LoginRequest { login_id, password });
        let response: LoginResponse = self.json(request).await?;

        self.tokens.set(&response.token)?;
        log::info!("Logged in as {login_id}");
        let _ = self.sessions.send(SessionEvent::LoggedIn);
        Ok(())
    }

    /// Forget the stored token. Nothing is sent to the backend.
    pub fn logout(&self) -> ApiResult<()> {
        self.tokens.clear()?;
        log::info!("Logged out");
        let _ = self.sessions.send(SessionEvent::LoggedOut);
        Ok(())
    }

    pub async fn register(&self, member: &NewMember) -> ApiResult<()> {
        member.validate().map_err(ApiError::Invalid)?;
        let request = self.request(Method::POST, &["member"])?.json(member);
        self.empty(request).await?;
        log::info!("Registered {}", member.login_id);
        Ok(())
    }

    pub async fn profile(&self) -> ApiResult<MemberProfile> {
        let request = self.request(Method::GET, &["member"])?;
        self.json(request).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<MemberProfile> {
        if update.name.trim().is_empty() {
            return Err(ApiError::Invalid("Name is required".into()));
        }
        let request = self.request(Method::PUT, &["member"])?.json(update);
        self.json(request).await
    }

    /// Delete the account. The stored token is dropped on success.
    pub async fn delete_member(&self, password: &str) -> ApiResult<()> {
        let request = self
            .request(Method::DELETE, &["member"])?
            .json(&PasswordBody { password });
        self.empty(request).await?;
        self.logout()
    }

    // ── Rooms ──────────────────────────────────────────────────────

    pub async fn rooms(&self) -> ApiResult<Vec<RoomSummary>> {
        let request = self.request(Method::GET, &["matching-room"])?;
        self.json(request).await
    }

    pub async fn create_room(&self, name: &str) -> ApiResult<RoomDetail> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Invalid("Room name is required".into()));
        }
        let request = self
            .request(Method::POST, &["matching-room"])?
            .json(&CreateRoomBody { room_name: name });
        let room: RoomDetail = self.json(request).await?;
        log::info!("Created room {} ({})", room.id, room.name);
        Ok(room)
    }

    /// Full room state. `isManager` defaults to false when absent.
    pub async fn room(&self, room_id: u64) -> ApiResult<RoomDetail> {
        let id = room_id.to_string();
        let request = self.request(Method::GET, &["matching-room", id.as_str()])?;
        self.json(request).await
    }

    /// Join by id. Returns the room if the backend sends it back.
    pub async fn join_room(&self, room_id: u64) -> ApiResult<Option<RoomDetail>> {
        let id = room_id.to_string();
        let request = self.request(Method::POST, &["matching-room", id.as_str()])?;
        self.optional_json(request).await
    }

    /// Join with the code shown on a room's QR card.
    pub async fn join_by_entry_code(&self, code: &str) -> ApiResult<Option<RoomDetail>> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ApiError::Invalid("Entry code is required".into()));
        }
        let request = self.request(Method::POST, &["matching-room", "entry", code])?;
        self.optional_json(request).await
    }

    /// Set the caller's own status in a room.
    pub async fn update_room_status(&self, room_id: u64, status: RoomMemberStatus) -> ApiResult<()> {
        let id = room_id.to_string();
        let request = self
            .request(Method::PATCH, &["matching-room", id.as_str(), "status"])?
            .json(&RoomStatusBody { status });
        self.empty(request).await
    }

    // ── Managers ───────────────────────────────────────────────────

    pub async fn grant_manager(&self, room_id: u64, member_id: u64) -> ApiResult<()> {
        let (room, member) = (room_id.to_string(), member_id.to_string());
        let request = self.request(
            Method::PATCH,
            &["manager", "rooms", room.as_str(), "managers", member.as_str()],
        )?;
        self.empty(request).await
    }

    pub async fn revoke_manager(&self, room_id: u64, member_id: u64) -> ApiResult<()> {
        let (room, member) = (room_id.to_string(), member_id.to_string());
        let request = self.request(
            Method::DELETE,
            &["manager", "rooms", room.as_str(), "managers", member.as_str()],
        )?;
        self.empty(request).await
    }

    // ── Matching ───────────────────────────────────────────────────

    /// Ask the backend to group the waiting list.
    pub async fn start_matching(&self, room_id: u64, matching_type: MatchingType) -> ApiResult<()> {
        let id = room_id.to_string();
        let request = self
            .request(Method::POST, &["matching-room", id.as_str(), "matching"])?
            .json(&MatchingBody { matching_type });
        self.empty(request).await
    }

    /// Form one group from exactly four distinct members.
    pub async fn start_custom_matching(&self, room_id: u64, member_ids: &[u64]) -> ApiResult<()> {
        let distinct: HashSet<_> = member_ids.iter().collect();
        if member_ids.len() != GROUP_SIZE || distinct.len() != GROUP_SIZE {
            return Err(ApiError::Invalid(format!(
                "A group needs {GROUP_SIZE} distinct members, got {member_ids:?}"
            )));
        }
        let id = room_id.to_string();
        let request = self
            .request(Method::POST, &["matching-room", id.as_str(), "matching", "custom"])?
            .json(&CustomMatchingBody { member_ids });
        self.empty(request).await
    }

    /// Swap `old_member_id` out of a group for `new_member_id`.
    pub async fn replace_group_member(
        &self,
        room_id: u64,
        group_id: u64,
        old_member_id: u64,
        new_member_id: u64,
    ) -> ApiResult<()> {
        if old_member_id == new_member_id {
            return Err(ApiError::Invalid("Replacement must be a different member".into()));
        }
        let (room, group) = (room_id.to_string(), group_id.to_string());
        let request = self
            .request(
                Method::PUT,
                &["matching-room", room.as_str(), "groups", group.as_str(), "members"],
            )?
            .json(&ReplaceMemberBody {
                old_member_id,
                new_member_id,
            });
        self.empty(request).await
    }

    pub async fn update_group_status(
        &self,
        room_id: u64,
        group_id: u64,
        status: GroupStatus,
    ) -> ApiResult<()> {
        if status == GroupStatus::Unknown {
            return Err(ApiError::Invalid("Unknown group status".into()));
        }
        let (room, group) = (room_id.to_string(), group_id.to_string());
        let request = self
            .request(
                Method::PATCH,
                &["matching-room", room.as_str(), "groups", group.as_str(), "status"],
            )?
            .json(&GroupStatusBody { status });
        self.empty(request).await
    }
}
