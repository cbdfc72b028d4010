//! HTTP routes
//!
//! Resolves room and directory addresses to their actors and sequences the
//! operations that span both (room creation).

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::directory::DirectoryHandle;
use crate::error::{AppError, AppResult};
use crate::handler::handle_socket;
use crate::registry::RoomRegistry;
use crate::room::RoomMetadata;
use crate::store::Store;
use crate::types::{RoomId, UserId};

/// Display name used when a client does not send one
const DEFAULT_DISPLAY_NAME: &str = "Anonymous";

/// Name of a group room created without one
const DEFAULT_GROUP_NAME: &str = "Group";

/// Name of a direct room created without one
const DEFAULT_DIRECT_NAME: &str = "DM";

/// Shared handles passed to every route
#[derive(Debug, Clone)]
pub struct AppState {
    pub rooms: Arc<RoomRegistry>,
    pub directory: DirectoryHandle,
    pub connection_buffer: usize,
}

impl AppState {
    /// Spawn the directory and set up the room registry over `store`
    pub fn new(store: Store, config: &Config) -> Self {
        Self {
            directory: DirectoryHandle::spawn(&store, config.command_buffer),
            rooms: Arc::new(RoomRegistry::new(store, config.command_buffer)),
            connection_buffer: config.connection_buffer,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: Option<String>,
    pub members: Vec<UserId>,
    pub creator: UserId,
}

#[derive(Debug, Deserialize)]
pub struct CreateDirectRequest {
    pub creator: UserId,
    pub other: UserId,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRoomRequest {
    pub room_id: RoomId,
    pub members: Vec<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct SetMetadataRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub members: Vec<UserId>,
    pub creator: UserId,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub ok: bool,
    pub room_id: RoomId,
}

#[derive(Debug, Serialize)]
pub struct RoomsResponse {
    pub rooms: Vec<RoomId>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    pub room: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub room: Option<String>,
    pub user: Option<String>,
    pub display: Option<String>,
}

/// Decode a JSON body, reporting any problem as a bad request
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> AppResult<T> {
    serde_json::from_slice(body).map_err(|e| AppError::InvalidRequest(e.to_string()))
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    value.ok_or_else(|| AppError::InvalidRequest(format!("missing {field}")))
}

/// Create a group room: write its metadata, then register it for every member
///
/// The two steps are not atomic. If registration fails the room still exists
/// and the error carries its id.
pub async fn create_room(state: &AppState, req: CreateRoomRequest) -> AppResult<RoomId> {
    let room_id = RoomId::generate();
    let name = req.name.unwrap_or_else(|| DEFAULT_GROUP_NAME.to_string());
    let meta = RoomMetadata::new(name, req.members.clone(), &req.creator);

    state.rooms.get(&room_id).set_metadata(meta).await?;
    register_created(state, &room_id, req.members).await?;

    info!(room = %room_id, creator = %req.creator, "Room created");
    Ok(room_id)
}

/// Create (or re-resolve) the direct room between two users
pub async fn create_direct_room(state: &AppState, req: CreateDirectRequest) -> AppResult<RoomId> {
    let room_id = RoomId::direct(&req.creator, &req.other);
    let mut members = vec![req.creator.clone(), req.other.clone()];
    members.sort();
    members.dedup();

    let name = req.name.unwrap_or_else(|| DEFAULT_DIRECT_NAME.to_string());
    let meta = RoomMetadata::new(name, members.clone(), &req.creator);

    if state.rooms.get(&room_id).init_metadata(meta).await? {
        info!(room = %room_id, creator = %req.creator, "Direct room created");
    }
    register_created(state, &room_id, members).await?;

    Ok(room_id)
}

async fn register_created(state: &AppState, room_id: &RoomId, members: Vec<UserId>) -> AppResult<()> {
    state
        .directory
        .register_room(room_id.clone(), members)
        .await
        .map_err(|e| {
            warn!(room = %room_id, "Room left unregistered: {}", e);
            AppError::PartialCreate {
                room_id: room_id.clone(),
                source: Box::new(e),
            }
        })
}

/// Rooms the user belongs to, straight from the directory
pub async fn list_my_rooms(state: &AppState, user_id: UserId) -> AppResult<Vec<RoomId>> {
    state.directory.list_rooms(user_id).await
}

/// Build the full axum Router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/create-room", post(create_room_handler))
        .route("/create-direct", post(create_direct_handler))
        .route("/my-rooms", get(my_rooms_handler))
        .route("/ws", get(ws_handler))
        .route("/meta", post(set_meta_handler))
        .route("/register-room", post(register_room_handler))
        .route("/rooms", get(my_rooms_handler))
        .with_state(state)
}

/// POST /create-room
async fn create_room_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<CreatedResponse>> {
    let req = parse_body::<CreateRoomRequest>(&body)?;
    let room_id = create_room(&state, req).await?;
    Ok(Json(CreatedResponse { ok: true, room_id }))
}

/// POST /create-direct
async fn create_direct_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<CreatedResponse>> {
    let req = parse_body::<CreateDirectRequest>(&body)?;
    let room_id = create_direct_room(&state, req).await?;
    Ok(Json(CreatedResponse { ok: true, room_id }))
}

/// GET /my-rooms?user= and GET /rooms?user=
async fn my_rooms_handler(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> AppResult<Json<RoomsResponse>> {
    let user_id = UserId::new(required(q.user, "user")?)?;
    let rooms = list_my_rooms(&state, user_id).await?;
    Ok(Json(RoomsResponse { rooms }))
}

/// POST /register-room
async fn register_room_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<OkResponse>> {
    let req = parse_body::<RegisterRoomRequest>(&body)?;
    state.directory.register_room(req.room_id, req.members).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// POST /meta?room=
async fn set_meta_handler(
    State(state): State<AppState>,
    Query(q): Query<RoomQuery>,
    body: Bytes,
) -> AppResult<Json<OkResponse>> {
    let room_id = RoomId::new(required(q.room, "room")?)?;
    let req = parse_body::<SetMetadataRequest>(&body)?;
    let meta = RoomMetadata::new(req.name, req.members, &req.creator);
    state.rooms.get(&room_id).set_metadata(meta).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// GET /ws?room=&user=&display=
async fn ws_handler(
    State(state): State<AppState>,
    Query(q): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let room_id = RoomId::new(required(q.room, "room")?)?;
    let user_id = UserId::new(required(q.user, "user")?)?;
    let display_name = q
        .display
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());

    let room = state.rooms.get(&room_id);
    let buffer = state.connection_buffer;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, room, user_id, display_name, buffer)))
}
