//! Request/response layer over the layout API.
//!
//! Every call posts a form to a fixed path under the base path and expects a
//! JSON body; status 200 is success, anything else is an application error
//! carrying the body's `error` message. There is no retry and no timeout.

use crate::grid;
use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shardhaven_protocol::{
    paths, AsciiMap, Choice, ErrorBody, HavenForm, HavenId, HavenLayout, HavenList,
    HavenSummary, MonsterList, ObstacleList, PuzzleList, RoomEdit, RoomTarget, SESSION_COOKIE,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("{message}")]
    Application {
        status: u16,
        message: String,
        code: Option<i64>,
    },
    #[error("malformed response from {path}: {reason}")]
    Decode { path: String, reason: String },
}

impl SyncError {
    fn decode(path: &str, reason: impl ToString) -> Self {
        SyncError::Decode {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Raw HTTP answer, before status handling.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Moves one request to the server. Paths are relative to the API base.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str) -> Result<RawResponse, SyncError>;

    async fn post_form(
        &self,
        path: &str,
        form: &[(&'static str, &str)],
    ) -> Result<RawResponse, SyncError>;
}

/// reqwest transport. The session cookie rides on every call.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    session: Option<String>,
}

impl HttpTransport {
    /// `origin` like `http://127.0.0.1:39444`; `base_path` like `/api/shardhaven`.
    pub fn new(origin: &str, base_path: &str, session: Option<String>) -> Self {
        let base_path = base_path.trim().trim_matches('/');
        let origin = origin.trim_end_matches('/');
        let base_url = if base_path.is_empty() {
            origin.to_string()
        } else {
            format!("{origin}/{base_path}")
        };
        Self {
            client: Client::new(),
            base_url,
            session: session.filter(|s| !s.is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn with_session(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.session {
            Some(token) => req.header(COOKIE, format!("{SESSION_COOKIE}={token}")),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<RawResponse, SyncError> {
        let res = self
            .with_session(req)
            .send()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        let status = res.status().as_u16();
        let body = res
            .bytes()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<RawResponse, SyncError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "GET");
        self.send(self.client.get(url)).await
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&'static str, &str)],
    ) -> Result<RawResponse, SyncError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "POST");
        self.send(self.client.post(url).form(form)).await
    }
}

/// One editor request, as queued by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ListHavens,
    FetchHaven(HavenId),
    Obstacles(HavenId),
    Monsters(HavenId),
    Puzzles(HavenId),
    CreateRoom(RoomTarget),
    EditRoom(RoomEdit),
    DeleteRoom(RoomTarget),
}

/// Decoded answer to a [`Request`].
#[derive(Debug, Clone)]
pub enum Reply {
    Havens(Vec<HavenSummary>),
    Haven(HavenLayout),
    Obstacles(Vec<Choice>),
    Monsters(Vec<Choice>),
    Puzzles(Vec<Choice>),
    Done,
}

fn decode<R: DeserializeOwned>(path: &str, raw: RawResponse) -> Result<R, SyncError> {
    if raw.status != 200 {
        let (message, code) = match serde_json::from_slice::<ErrorBody>(&raw.body) {
            Ok(body) => (body.error, body.code),
            Err(_) => (format!("HTTP {}", raw.status), None),
        };
        return Err(SyncError::Application {
            status: raw.status,
            message,
            code,
        });
    }
    serde_json::from_slice(&raw.body).map_err(|e| SyncError::decode(path, e))
}

fn haven_pairs(form: &HavenForm) -> [(&'static str, &str); 1] {
    [("haven_id", form.haven_id.as_str())]
}

fn target_pairs(form: &RoomTarget) -> [(&'static str, &str); 3] {
    [
        ("haven_id", form.haven_id.as_str()),
        ("x", form.x.as_str()),
        ("y", form.y.as_str()),
    ]
}

/// Checks that a layout body is complete and its matrix matches its dimensions.
pub fn validate_layout(layout: &HavenLayout) -> Result<(), String> {
    if !layout.has_layout {
        return Ok(());
    }
    let (Some(w), Some(h), Some(matrix)) = (layout.x_dim, layout.y_dim, layout.matrix.as_ref())
    else {
        return Err("layout is missing x_dim, y_dim or matrix".to_string());
    };
    grid::check_shape(w, h, matrix).map_err(|e| e.to_string())
}

pub struct SyncClient<T> {
    transport: T,
}

impl<T: Transport> SyncClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn post<R: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&'static str, &str)],
    ) -> Result<R, SyncError> {
        let raw = self.transport.post_form(path, form).await?;
        decode(path, raw)
    }

    async fn post_done(&self, path: &str, form: &[(&'static str, &str)]) -> Result<(), SyncError> {
        let _: serde_json::Value = self.post(path, form).await?;
        Ok(())
    }

    pub async fn list_havens(&self) -> Result<Vec<HavenSummary>, SyncError> {
        let raw = self.transport.get(paths::LIST).await?;
        let list: HavenList = decode(paths::LIST, raw)?;
        Ok(list.havens)
    }

    pub async fn fetch_haven(&self, haven_id: HavenId) -> Result<HavenLayout, SyncError> {
        let form = HavenForm::new(haven_id);
        let layout: HavenLayout = self.post(paths::HAVEN, &haven_pairs(&form)).await?;
        validate_layout(&layout).map_err(|reason| SyncError::decode(paths::HAVEN, reason))?;
        Ok(layout)
    }

    pub async fn obstacles(&self, haven_id: HavenId) -> Result<Vec<Choice>, SyncError> {
        let form = HavenForm::new(haven_id);
        let list: ObstacleList = self.post(paths::OBSTACLES, &haven_pairs(&form)).await?;
        Ok(list.obstacles)
    }

    pub async fn monsters(&self, haven_id: HavenId) -> Result<Vec<Choice>, SyncError> {
        let form = HavenForm::new(haven_id);
        let list: MonsterList = self.post(paths::MONSTERS, &haven_pairs(&form)).await?;
        Ok(list.monsters)
    }

    pub async fn puzzles(&self, haven_id: HavenId) -> Result<Vec<Choice>, SyncError> {
        let form = HavenForm::new(haven_id);
        let list: PuzzleList = self.post(paths::PUZZLES, &haven_pairs(&form)).await?;
        Ok(list.puzzles)
    }

    pub async fn create_room(&self, target: &RoomTarget) -> Result<(), SyncError> {
        self.post_done(paths::ROOM_CREATE, &target_pairs(target)).await
    }

    pub async fn edit_room(&self, edit: &RoomEdit) -> Result<(), SyncError> {
        self.post_done(paths::ROOM_EDIT, &edit.pairs()).await
    }

    pub async fn delete_room(&self, target: &RoomTarget) -> Result<(), SyncError> {
        self.post_done(paths::ROOM_DELETE, &target_pairs(target)).await
    }

    pub async fn ascii_map(&self, haven_id: HavenId) -> Result<String, SyncError> {
        let form = HavenForm::new(haven_id);
        let map: AsciiMap = self.post(paths::ASCII, &haven_pairs(&form)).await?;
        Ok(map.ascii)
    }

    pub async fn execute(&self, request: &Request) -> Result<Reply, SyncError> {
        match request {
            Request::ListHavens => self.list_havens().await.map(Reply::Havens),
            Request::FetchHaven(id) => self.fetch_haven(*id).await.map(Reply::Haven),
            Request::Obstacles(id) => self.obstacles(*id).await.map(Reply::Obstacles),
            Request::Monsters(id) => self.monsters(*id).await.map(Reply::Monsters),
            Request::Puzzles(id) => self.puzzles(*id).await.map(Reply::Puzzles),
            Request::CreateRoom(target) => self.create_room(target).await.map(|_| Reply::Done),
            Request::EditRoom(edit) => self.edit_room(edit).await.map(|_| Reply::Done),
            Request::DeleteRoom(target) => self.delete_room(target).await.map(|_| Reply::Done),
        }
    }
}
