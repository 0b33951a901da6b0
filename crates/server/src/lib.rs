use axum::{
    extract::{rejection::FormRejection, FromRequest, State},
    http::{header, HeaderMap},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use shardhaven_engine::{Engine, EngineError, ObstacleClass};
use shardhaven_protocol::{
    paths, AsciiMap, HavenForm, HavenId, HavenLayout, HavenList, MonsterList, ObstacleList,
    PuzzleList, RoomEdit, RoomTarget, SESSION_COOKIE,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub mod config;
mod error;

pub use config::ServerConfig;
pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub staff_token_sha256: Option<String>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            staff_token_sha256: None,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            engine: Engine::new(config.db_path.clone()),
            staff_token_sha256: config.staff_token_sha256.clone(),
        }
    }
}

type Shared = State<Arc<AppState>>;

/// API routes, relative to the base path.
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(paths::LIST, get(list_havens).post(list_havens))
        .route(paths::HAVEN, post(get_haven))
        .route(paths::OBSTACLES, post(list_obstacles))
        .route(paths::MONSTERS, post(list_monsters))
        .route(paths::PUZZLES, post(list_puzzles))
        .route(paths::ROOM_CREATE, post(create_room))
        .route(paths::ROOM_EDIT, post(edit_room))
        .route(paths::ROOM_DELETE, post(delete_room))
        .route(paths::ASCII, post(ascii_map))
}

pub fn build_router(state: AppState, base_path: &str) -> Router {
    let state = Arc::new(state);
    let api = api_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_staff,
    ));
    let base = config::normalize_base_path(base_path);
    let app = if base.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&base, api)
    };

    app.route("/health", get(health))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

async fn health() -> &'static str {
    "ok"
}

/// `Form` whose rejection is the JSON error body instead of axum's plain text.
pub struct ApiForm<T>(pub T);

impl<T, S> FromRequest<S> for ApiForm<T>
where
    Form<T>: FromRequest<S, Rejection = FormRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state).await?;
        Ok(ApiForm(value))
    }
}

fn parse_haven_id(raw: &str) -> Result<HavenId, ApiError> {
    match raw.trim().parse::<HavenId>() {
        Ok(id) if id != 0 => Ok(id),
        _ => Err(EngineError::MissingHaven.into()),
    }
}

fn parse_coord(raw: &str) -> Result<i64, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ApiError::bad_param("Missing a required parameter."));
    }
    raw.parse()
        .map_err(|_| ApiError::bad_param("Invalid parameter."))
}

/// Haven id plus coordinates, validated in the order the store reports problems.
fn parse_target(haven_id: &str, x: &str, y: &str) -> Result<(HavenId, i64, i64), ApiError> {
    let haven_id = parse_haven_id(haven_id)?;
    let (x_raw, y_raw) = (x.trim(), y.trim());
    if x_raw.is_empty() || y_raw.is_empty() {
        return Err(ApiError::bad_param("Missing a required parameter."));
    }
    Ok((haven_id, parse_coord(x_raw)?, parse_coord(y_raw)?))
}

#[derive(Debug, Serialize)]
struct Done {}

async fn list_havens(State(state): Shared) -> Result<Json<HavenList>, ApiError> {
    let havens = state.engine.list_havens()?;
    Ok(Json(HavenList { havens }))
}

async fn get_haven(
    State(state): Shared,
    ApiForm(form): ApiForm<HavenForm>,
) -> Result<Json<HavenLayout>, ApiError> {
    let haven_id = parse_haven_id(&form.haven_id)?;
    tracing::debug!(haven_id, "fetch haven");
    Ok(Json(state.engine.haven_layout(haven_id)?))
}

async fn list_obstacles(
    State(state): Shared,
    ApiForm(form): ApiForm<HavenForm>,
) -> Result<Json<ObstacleList>, ApiError> {
    let haven_id = parse_haven_id(&form.haven_id)?;
    let obstacles = state.engine.obstacles_for(haven_id)?;
    Ok(Json(ObstacleList { obstacles }))
}

async fn list_monsters(
    State(state): Shared,
    ApiForm(form): ApiForm<HavenForm>,
) -> Result<Json<MonsterList>, ApiError> {
    let haven_id = parse_haven_id(&form.haven_id)?;
    let monsters = state.engine.monsters_for(haven_id)?;
    Ok(Json(MonsterList { monsters }))
}

async fn list_puzzles(
    State(state): Shared,
    ApiForm(form): ApiForm<HavenForm>,
) -> Result<Json<PuzzleList>, ApiError> {
    let haven_id = parse_haven_id(&form.haven_id)?;
    let puzzles = state.engine.puzzles_for(haven_id)?;
    Ok(Json(PuzzleList { puzzles }))
}

async fn create_room(
    State(state): Shared,
    ApiForm(form): ApiForm<RoomTarget>,
) -> Result<Json<Done>, ApiError> {
    let (haven_id, x, y) = parse_target(&form.haven_id, &form.x, &form.y)?;
    state.engine.create_room(haven_id, x, y)?;
    Ok(Json(Done {}))
}

async fn delete_room(
    State(state): Shared,
    ApiForm(form): ApiForm<RoomTarget>,
) -> Result<Json<Done>, ApiError> {
    let (haven_id, x, y) = parse_target(&form.haven_id, &form.x, &form.y)?;
    state.engine.delete_room(haven_id, x, y)?;
    Ok(Json(Done {}))
}

async fn edit_room(
    State(state): Shared,
    ApiForm(edit): ApiForm<RoomEdit>,
) -> Result<Json<Done>, ApiError> {
    let (haven_id, x, y) = parse_target(&edit.haven_id, &edit.x, &edit.y)?;
    state.engine.edit_room(haven_id, x, y, &edit)?;
    Ok(Json(Done {}))
}

async fn ascii_map(
    State(state): Shared,
    ApiForm(form): ApiForm<HavenForm>,
) -> Result<Json<AsciiMap>, ApiError> {
    let haven_id = parse_haven_id(&form.haven_id)?;
    let ascii = state.engine.ascii_map(haven_id)?;
    Ok(Json(AsciiMap { ascii }))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

fn is_staff(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = state.staff_token_sha256.as_deref() else {
        return true;
    };
    session_token(headers).is_some_and(|token| sha256_hex(token.as_bytes()) == expected)
}

async fn require_staff(
    State(state): Shared,
    req: axum::extract::Request,
    next: middleware::Next,
) -> Response {
    if is_staff(&state, req.headers()) {
        return next.run(req).await;
    }
    tracing::warn!(path = %req.uri().path(), "rejected request without staff session");
    ApiError::unauthorized().into_response()
}

/// Seeds a small cave haven with catalog entries; returns its id.
pub fn seed_demo(engine: &Engine) -> anyhow::Result<HavenId> {
    let haven = engine.create_haven("Ashen Hollow", "cave")?;
    engine.create_layout(haven, 9, 9, (4, 8))?;

    engine.add_obstacle("cave", ObstacleClass::Exit, "A rusted iron portcullis")?;
    engine.add_obstacle("cave", ObstacleClass::Exit, "A collapsed tunnel choked with rubble")?;
    engine.add_obstacle("cave", ObstacleClass::Puzzle, "A sealed reliquary")?;
    engine.add_monster("Shardling", "cave")?;
    engine.add_monster("Bone Crawler", "cave")?;
    engine.add_puzzle("Riddle of Ash", "cave")?;

    for (x, y) in [(4, 7), (4, 6), (3, 6), (5, 6), (5, 5)] {
        engine.create_room(haven, x, y)?;
    }
    Ok(haven)
}

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    serve_listener(listener, config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;
    Ok(())
}

pub async fn serve_listener(
    listener: tokio::net::TcpListener,
    config: ServerConfig,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<SocketAddr> {
    let state = AppState::from_config(&config);
    // Fail fast if sqlite is unavailable.
    state.engine.open()?;
    let db = state.engine.db_path().display().to_string();
    let app = build_router(state, &config.base_path);
    let addr = listener.local_addr()?;
    tracing::info!(
        %addr,
        base_path = %config.base_path,
        %db,
        "shardhaven server listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(addr)
}
