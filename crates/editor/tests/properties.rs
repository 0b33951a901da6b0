//! Editor behaviour against a scripted transport that records every call.

use async_trait::async_trait;
use image::RgbaImage;
use serde_json::json;
use shardhaven_editor::{
    Editor, Mode, Palette, RawResponse, Renderer, SyncClient, SyncError, Transport, CELL_PITCH,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Call {
    method: &'static str,
    path: String,
    form: Vec<(String, String)>,
}

#[derive(Clone, Default)]
struct Recording {
    calls: Arc<Mutex<Vec<Call>>>,
    replies: Arc<Mutex<HashMap<String, (u16, serde_json::Value)>>>,
}

impl Recording {
    fn reply(&self, path: &str, status: u16, body: serde_json::Value) {
        self.replies
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body));
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn answer(&self, path: &str) -> Result<RawResponse, SyncError> {
        let replies = self.replies.lock().unwrap();
        let (status, body) = replies
            .get(path)
            .cloned()
            .unwrap_or((200, json!({})));
        Ok(RawResponse {
            status,
            body: serde_json::to_vec(&body).unwrap(),
        })
    }
}

#[async_trait]
impl Transport for Recording {
    async fn get(&self, path: &str) -> Result<RawResponse, SyncError> {
        self.calls.lock().unwrap().push(Call {
            method: "GET",
            path: path.to_string(),
            form: Vec::new(),
        });
        self.answer(path)
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&'static str, &str)],
    ) -> Result<RawResponse, SyncError> {
        self.calls.lock().unwrap().push(Call {
            method: "POST",
            path: path.to_string(),
            form: form
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self.answer(path)
    }
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// `matrix[x][y]` JSON with plain rooms at the given coordinates.
fn matrix(width: usize, height: usize, rooms: &[(usize, usize)]) -> serde_json::Value {
    let mut columns = vec![vec![json!({}); height]; width];
    for &(x, y) in rooms {
        columns[x][y] = json!({ "is_room": true });
    }
    json!(columns)
}

fn scripted(width: usize, height: usize, rooms: &[(usize, usize)]) -> Recording {
    let t = Recording::default();
    t.reply(
        "/list",
        200,
        json!({ "havens": [{ "id": 7, "name": "Ashen Hollow" }] }),
    );
    t.reply(
        "/haven",
        200,
        json!({
            "has_layout": true,
            "x_dim": width,
            "y_dim": height,
            "matrix": matrix(width, height, rooms),
        }),
    );
    t.reply(
        "/haven/obstacles",
        200,
        json!({ "obstacles": [{ "id": 1, "name": "A rusted iron door" }] }),
    );
    t.reply(
        "/haven/monsters",
        200,
        json!({ "monsters": [{ "id": 2, "name": "Shardling" }] }),
    );
    t.reply(
        "/haven/puzzles",
        200,
        json!({ "puzzles": [{ "id": 3, "name": "Riddle of Ash" }] }),
    );
    t
}

async fn editor_on(t: &Recording) -> Editor<Recording> {
    let mut editor = Editor::new(SyncClient::new(t.clone()));
    editor.start().await;
    editor.select_haven(Some(7)).await;
    assert_eq!(editor.take_alert(), None);
    t.clear_calls();
    editor
}

#[tokio::test]
async fn clicking_empty_cell_issues_one_create_request() {
    let t = scripted(5, 5, &[(2, 2)]);
    let mut editor = editor_on(&t).await;

    editor.click_cell(3, 2).await;

    let creates: Vec<Call> = t
        .calls()
        .into_iter()
        .filter(|c| c.path == "/haven/room/create")
        .collect();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].method, "POST");
    assert_eq!(
        creates[0].form,
        pairs(&[("haven_id", "7"), ("x", "3"), ("y", "2")])
    );
    // The create is followed by a full refresh.
    assert_eq!(t.calls().last().unwrap().path, "/haven");
}

#[tokio::test]
async fn name_only_save_sends_exactly_name_and_coordinates() {
    let t = scripted(5, 5, &[(2, 2)]);
    let mut editor = editor_on(&t).await;

    editor.click_cell(2, 2).await;
    assert_eq!(editor.controller().mode(), Mode::EditingRoom { x: 2, y: 2 });
    editor.form_mut().name = "Glass Gallery".to_string();
    editor.save().await;

    let calls = t.calls();
    let edit = calls
        .iter()
        .find(|c| c.path == "/haven/room/edit")
        .expect("edit sent");
    let mut keys: Vec<&str> = edit.form.iter().map(|(k, _)| k.as_str()).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["haven_id", "name", "x", "y"]);
    assert_eq!(
        edit.form,
        pairs(&[
            ("haven_id", "7"),
            ("x", "2"),
            ("y", "2"),
            ("name", "Glass Gallery")
        ])
    );
    assert_eq!(calls.last().unwrap().path, "/haven");
}

#[tokio::test]
async fn delete_clears_selection_before_server_answers() {
    let t = scripted(5, 5, &[(2, 2)]);
    let mut editor = editor_on(&t).await;
    editor.click_cell(2, 2).await;

    // Drive the controller by hand to look between request and reply.
    let mut controller = editor.controller().clone();
    let out = controller.delete();
    assert_eq!(out.len(), 1);
    assert_eq!(controller.grid().selected(), None);
    assert_eq!(controller.mode(), Mode::NoSelection);
    assert!(!controller.view().form.enabled);
    assert!(t.calls().is_empty());
}

#[tokio::test]
async fn delete_refreshes_even_when_rejected() {
    let t = scripted(5, 5, &[(2, 2)]);
    t.reply(
        "/haven/room/delete",
        500,
        json!({ "error": "You cannot delete the entrance.", "code": -2 }),
    );
    let mut editor = editor_on(&t).await;
    editor.click_cell(2, 2).await;
    editor.delete().await;

    let paths: Vec<String> = t.calls().into_iter().map(|c| c.path).collect();
    assert_eq!(paths, vec!["/haven/room/delete", "/haven"]);
    assert_eq!(
        editor.take_alert().as_deref(),
        Some("You cannot delete the entrance.")
    );
    assert_eq!(editor.controller().mode(), Mode::NoSelection);
}

#[tokio::test]
async fn none_haven_disables_form_and_makes_no_calls() {
    let t = scripted(5, 5, &[(2, 2)]);
    let mut editor = editor_on(&t).await;
    editor.click_cell(2, 2).await;
    assert!(editor.controller().view().form.enabled);

    editor.select_haven(None).await;

    assert!(t.calls().is_empty());
    let view = editor.controller().view();
    assert!(!view.form.enabled);
    assert!(!view.save_enabled);
    assert!(!view.delete_enabled);
    assert_eq!(view.canvas_size(), (0, 0));
}

#[tokio::test]
async fn obstacle_on_north_edge_renders_in_obstacle_colour() {
    let t = Recording::default();
    t.reply(
        "/haven",
        200,
        json!({
            "has_layout": true,
            "x_dim": 2,
            "y_dim": 2,
            "matrix": [
                [{}, {}],
                [{}, { "is_room": true, "obstacle_north": "Wall" }],
            ],
        }),
    );
    t.reply("/haven/obstacles", 200, json!({ "obstacles": [] }));
    t.reply("/haven/monsters", 200, json!({ "monsters": [] }));
    t.reply("/haven/puzzles", 200, json!({ "puzzles": [] }));
    let mut editor = Editor::new(SyncClient::new(t.clone()));
    editor.select_haven(Some(1)).await;
    assert_eq!(editor.take_alert(), None);

    let view = editor.controller().view();
    let img = &view.canvas;
    let palette = Palette::default();
    assert_eq!(img.dimensions(), (2 * CELL_PITCH, 2 * CELL_PITCH));

    let (x0, y0) = (CELL_PITCH, CELL_PITCH);
    let last = CELL_PITCH - 1;
    // Skip corners, where two edges meet.
    for i in 1..last {
        assert_eq!(img.get_pixel(x0 + i, y0).0, palette.obstacle_edge, "top");
        assert_eq!(img.get_pixel(x0 + i, y0 + last).0, palette.open_edge, "bottom");
        assert_eq!(img.get_pixel(x0, y0 + i).0, palette.open_edge, "left");
        assert_eq!(img.get_pixel(x0 + last, y0 + i).0, palette.open_edge, "right");
    }
}

#[tokio::test]
async fn selection_highlights_exactly_one_cell() {
    let rooms: Vec<(usize, usize)> = (1..4).flat_map(|x| (1..4).map(move |y| (x, y))).collect();
    let t = scripted(4, 4, &rooms);
    let mut editor = editor_on(&t).await;
    let palette = Palette::default();
    let centre = CELL_PITCH / 2;

    for &(sx, sy) in &rooms {
        editor.click_cell(sx as u32, sy as u32).await;
        let img = &editor.controller().view().canvas;
        for &(x, y) in &rooms {
            let px = img.get_pixel(x as u32 * CELL_PITCH + centre, y as u32 * CELL_PITCH + centre);
            let expected = if (x, y) == (sx, sy) {
                palette.selected
            } else {
                palette.room
            };
            assert_eq!(px.0, expected, "cell ({x},{y}) with ({sx},{sy}) selected");
        }
    }
}

#[tokio::test]
async fn rendering_is_idempotent() {
    let t = scripted(4, 4, &[(1, 1), (2, 1)]);
    let mut editor = editor_on(&t).await;
    editor.click_cell(2, 1).await;

    let controller = editor.controller();
    let renderer = Renderer::default();
    let mut img = RgbaImage::new(1, 1);
    renderer.render(controller.grid(), &mut img);
    let first = img.clone();
    renderer.render(controller.grid(), &mut img);
    assert_eq!(first, img);
    assert_eq!(&first, &controller.view().canvas);
}

#[tokio::test]
async fn transport_failure_alerts_without_touching_state() {
    struct Down;

    #[async_trait]
    impl Transport for Down {
        async fn get(&self, _path: &str) -> Result<RawResponse, SyncError> {
            Err(SyncError::Transport("connection refused".to_string()))
        }

        async fn post_form(
            &self,
            _path: &str,
            _form: &[(&'static str, &str)],
        ) -> Result<RawResponse, SyncError> {
            Err(SyncError::Transport("connection refused".to_string()))
        }
    }

    let mut editor = Editor::new(SyncClient::new(Down));
    editor.select_haven(Some(3)).await;
    assert_eq!(
        editor.take_alert().as_deref(),
        Some("transport error: connection refused")
    );
    assert_eq!(editor.controller().grid().width(), 0);
    assert_eq!(editor.controller().mode(), Mode::NoSelection);
}
