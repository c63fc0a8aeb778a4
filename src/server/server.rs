use anyhow::{Context, Result};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use super::session::Session;
use super::validation::{
    AddTrackBody, AuthProfileBody, CreatePlaylistBody, JsonBody, LoginBody, RegisterBody,
    RegisterTrackBody, SearchQuery, UpdatePlaylistBody, UserProfileBody, Validate,
};
use super::{log_requests, state::*, ServerConfig};
use crate::catalog::TrackCatalog;
use crate::error::ServiceResult;
use crate::playlist::PlaylistManager;
use crate::store::FullStore;
use crate::user::{TokenIssuer, UserManager};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub user_id: Option<String>,
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    timestamp: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        user_id: session.map(|s| s.user.id),
    };
    Json(stats)
}

async fn health() -> impl IntoResponse {
    Json(HealthStatus {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
    })
}

// Auth

async fn register(
    State(user_manager): State<GuardedUserManager>,
    JsonBody(body): JsonBody<RegisterBody>,
) -> ServiceResult<impl IntoResponse> {
    let registration = body.validate()?;
    let authenticated = user_manager.register(
        &registration.email,
        &registration.password,
        &registration.name,
    )?;
    Ok((StatusCode::CREATED, Json(authenticated)))
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    JsonBody(body): JsonBody<LoginBody>,
) -> ServiceResult<impl IntoResponse> {
    debug!("login() called with {:?}", body);
    let login = body.validate()?;
    Ok(Json(user_manager.login(&login.email, &login.password)?))
}

async fn get_auth_profile(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> ServiceResult<impl IntoResponse> {
    Ok(Json(user_manager.get_profile(session.user_id())?))
}

async fn put_auth_profile(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    JsonBody(body): JsonBody<AuthProfileBody>,
) -> ServiceResult<impl IntoResponse> {
    let update = body.validate()?;
    Ok(Json(user_manager.update_profile(session.user_id(), update)?))
}

// Users

async fn get_own_user_profile(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> ServiceResult<impl IntoResponse> {
    Ok(Json(user_manager.get_user_profile(session.user_id())?))
}

async fn put_user_profile(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    JsonBody(body): JsonBody<UserProfileBody>,
) -> ServiceResult<impl IntoResponse> {
    let changes = body.validate()?;
    Ok(Json(user_manager.update_user(session.user_id(), changes)?))
}

async fn search_users(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Query(query): Query<SearchQuery>,
) -> ServiceResult<impl IntoResponse> {
    let query = query.validate()?;
    Ok(Json(user_manager.search_users(&query, session.user_id())?))
}

async fn get_top_users(
    _session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> ServiceResult<impl IntoResponse> {
    Ok(Json(user_manager.get_top_users()?))
}

async fn get_user_profile(
    _session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(id): Path<String>,
) -> ServiceResult<impl IntoResponse> {
    Ok(Json(user_manager.get_user_profile(&id)?))
}

// Playlists

async fn post_playlist(
    session: Session,
    State(playlist_manager): State<GuardedPlaylistManager>,
    JsonBody(body): JsonBody<CreatePlaylistBody>,
) -> ServiceResult<impl IntoResponse> {
    let playlist = body.validate()?;
    let created = playlist_manager.create(session.user_id(), playlist)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_own_playlists(
    session: Session,
    State(playlist_manager): State<GuardedPlaylistManager>,
) -> ServiceResult<impl IntoResponse> {
    Ok(Json(playlist_manager.list_owned(session.user_id())?))
}

async fn search_playlists(
    _session: Option<Session>,
    State(playlist_manager): State<GuardedPlaylistManager>,
    Query(query): Query<SearchQuery>,
) -> ServiceResult<impl IntoResponse> {
    let query = query.validate()?;
    Ok(Json(playlist_manager.search(&query)?))
}

async fn get_playlist(
    _session: Option<Session>,
    State(playlist_manager): State<GuardedPlaylistManager>,
    Path(id): Path<String>,
) -> ServiceResult<impl IntoResponse> {
    Ok(Json(playlist_manager.get(&id)?))
}

async fn put_playlist(
    session: Session,
    State(playlist_manager): State<GuardedPlaylistManager>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdatePlaylistBody>,
) -> ServiceResult<impl IntoResponse> {
    debug!("Updating playlist with id {}", id);
    let changes = body.validate()?;
    Ok(Json(playlist_manager.update(&id, session.user_id(), changes)?))
}

async fn delete_playlist(
    session: Session,
    State(playlist_manager): State<GuardedPlaylistManager>,
    Path(id): Path<String>,
) -> ServiceResult<impl IntoResponse> {
    Ok(Json(playlist_manager.delete(&id, session.user_id())?))
}

async fn add_playlist_track(
    session: Session,
    State(playlist_manager): State<GuardedPlaylistManager>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<AddTrackBody>,
) -> ServiceResult<impl IntoResponse> {
    let track_id = body.validate()?;
    Ok(Json(playlist_manager.add_track(
        &id,
        &track_id,
        session.user_id(),
    )?))
}

async fn remove_playlist_track(
    session: Session,
    State(playlist_manager): State<GuardedPlaylistManager>,
    Path((id, track_id)): Path<(String, String)>,
) -> ServiceResult<impl IntoResponse> {
    Ok(Json(playlist_manager.remove_track(
        &id,
        &track_id,
        session.user_id(),
    )?))
}

// Tracks

async fn post_track(
    session: Session,
    State(track_catalog): State<GuardedTrackCatalog>,
    JsonBody(body): JsonBody<RegisterTrackBody>,
) -> ServiceResult<impl IntoResponse> {
    let track = body.validate()?;
    let registered = track_catalog.register_track(session.user_id(), track)?;
    Ok((StatusCode::CREATED, Json(registered)))
}

async fn get_track(
    _session: Option<Session>,
    State(track_catalog): State<GuardedTrackCatalog>,
    Path(id): Path<String>,
) -> ServiceResult<impl IntoResponse> {
    Ok(Json(track_catalog.get_track(&id)?))
}

impl ServerState {
    fn new(config: ServerConfig, store: Arc<dyn FullStore>, token_issuer: TokenIssuer) -> Self {
        let token_issuer = Arc::new(token_issuer);
        ServerState {
            config,
            start_time: Instant::now(),
            hash: env!("GIT_HASH").to_owned(),
            user_manager: Arc::new(UserManager::new(store.clone(), token_issuer.clone())),
            playlist_manager: Arc::new(PlaylistManager::new(store.clone())),
            track_catalog: Arc::new(TrackCatalog::new(store)),
            token_issuer,
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    store: Arc<dyn FullStore>,
    token_issuer: TokenIssuer,
) -> Router {
    let state = ServerState::new(config, store, token_issuer);

    let auth_routes: Router = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(get_auth_profile).put(put_auth_profile))
        .with_state(state.clone());

    let user_routes: Router = Router::new()
        .route("/profile", get(get_own_user_profile).put(put_user_profile))
        .route("/search", get(search_users))
        .route("/top", get(get_top_users))
        .route("/{id}", get(get_user_profile))
        .with_state(state.clone());

    let playlist_routes: Router = Router::new()
        .route("/", post(post_playlist))
        .route("/me", get(get_own_playlists))
        .route("/search", get(search_playlists))
        .route(
            "/{id}",
            get(get_playlist).put(put_playlist).delete(delete_playlist),
        )
        .route("/{id}/tracks", post(add_playlist_track))
        .route("/{id}/tracks/{track_id}", delete(remove_playlist_track))
        .with_state(state.clone());

    let track_routes: Router = Router::new()
        .route("/", post(post_track))
        .route("/{id}", get(get_track))
        .with_state(state.clone());

    let home_router: Router = Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .with_state(state.clone());

    home_router
        .nest("/v1/auth", auth_routes)
        .nest("/v1/users", user_routes)
        .nest("/v1/playlists", playlist_routes)
        .nest("/v1/tracks", track_routes)
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(
    store: Arc<dyn FullStore>,
    token_issuer: TokenIssuer,
    config: ServerConfig,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, store, token_issuer);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", listener.local_addr()?);

    Ok(axum::serve(listener, app).await?)
}
