//! Interaction state machine.
//!
//! The controller performs no I/O. Each user event returns the requests to
//! send, tagged with a ticket; the caller feeds every answer back through
//! [`Controller::on_reply`], in whatever order they arrive. Fetch replies
//! that were overtaken by a newer fetch of the same kind, or that belong to a
//! haven no longer selected, are dropped.

use crate::form::RoomForm;
use crate::grid::GridModel;
use crate::render::CELL_PITCH;
use crate::sync::{Reply, Request, SyncError};
use crate::view::EditorView;
use shardhaven_protocol::{HavenId, HavenLayout, RoomTarget};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub ticket: Ticket,
    pub request: Request,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    NoSelection,
    EditingRoom { x: u32, y: u32 },
    PendingCreation { x: u32, y: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FetchKind {
    Havens,
    Haven,
    Obstacles,
    Monsters,
    Puzzles,
}

impl Request {
    fn fetch_kind(&self) -> Option<FetchKind> {
        match self {
            Request::ListHavens => Some(FetchKind::Havens),
            Request::FetchHaven(_) => Some(FetchKind::Haven),
            Request::Obstacles(_) => Some(FetchKind::Obstacles),
            Request::Monsters(_) => Some(FetchKind::Monsters),
            Request::Puzzles(_) => Some(FetchKind::Puzzles),
            Request::CreateRoom(_) | Request::EditRoom(_) | Request::DeleteRoom(_) => None,
        }
    }

    /// Haven the request is about; `None` for the haven list.
    fn haven_id(&self) -> Option<HavenId> {
        match self {
            Request::ListHavens => None,
            Request::FetchHaven(id)
            | Request::Obstacles(id)
            | Request::Monsters(id)
            | Request::Puzzles(id) => Some(*id),
            Request::CreateRoom(t) | Request::DeleteRoom(t) => t.haven_id.parse().ok(),
            Request::EditRoom(e) => e.haven_id.parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Controller {
    mode: Mode,
    grid: GridModel,
    view: EditorView,
    haven: Option<HavenId>,
    next_ticket: u64,
    in_flight: HashMap<Ticket, Request>,
    latest: HashMap<FetchKind, Ticket>,
}

impl Controller {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    pub fn view(&self) -> &EditorView {
        &self.view
    }

    /// Form fields, for the user to edit before [`Controller::save`].
    pub fn form_mut(&mut self) -> &mut RoomForm {
        &mut self.view.form
    }

    pub fn dismiss_alert(&mut self) -> Option<String> {
        self.view.dismiss_alert()
    }

    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    fn issue(&mut self, request: Request) -> Outgoing {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        if let Some(kind) = request.fetch_kind() {
            self.latest.insert(kind, ticket);
        }
        self.in_flight.insert(ticket, request.clone());
        Outgoing { ticket, request }
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            tracing::debug!(from = ?self.mode, to = ?mode, "mode change");
        }
        self.mode = mode;
    }

    fn enter_no_selection(&mut self) {
        self.grid.clear_selection();
        self.view.clear_form();
        self.set_mode(Mode::NoSelection);
    }

    /// Loads the grid's selected room into the form.
    fn enter_editing(&mut self) {
        let form = self.grid.selected_cell().map(RoomForm::load);
        match (self.grid.selected(), form) {
            (Some((x, y)), Some(form)) => {
                self.view.show_form(form);
                self.set_mode(Mode::EditingRoom { x, y });
            }
            _ => self.enter_no_selection(),
        }
    }

    fn refresh(&mut self) -> Vec<Outgoing> {
        match self.haven {
            Some(id) => vec![self.issue(Request::FetchHaven(id))],
            None => Vec::new(),
        }
    }

    /// Initial load of the haven picker.
    pub fn start(&mut self) -> Vec<Outgoing> {
        vec![self.issue(Request::ListHavens)]
    }

    /// Haven picker changed. `None` is the "----" entry.
    pub fn select_haven(&mut self, haven: Option<HavenId>) -> Vec<Outgoing> {
        self.haven = haven;
        self.view.haven = haven;
        self.enter_no_selection();
        self.grid.clear();
        self.view.reset_references();
        self.view.redraw(&self.grid);

        let Some(id) = haven else {
            return Vec::new();
        };
        tracing::info!(haven_id = id, "haven selected");
        vec![
            self.issue(Request::FetchHaven(id)),
            self.issue(Request::Obstacles(id)),
            self.issue(Request::Monsters(id)),
            self.issue(Request::Puzzles(id)),
        ]
    }

    /// Pointer pressed at canvas pixel `(px, py)`.
    pub fn pointer_down(&mut self, px: u32, py: u32) -> Vec<Outgoing> {
        let Some(haven) = self.haven else {
            return Vec::new();
        };
        let (x, y) = (px / CELL_PITCH, py / CELL_PITCH);
        // Row and column 0 are reserved border cells.
        if x < 1 || y < 1 || !self.grid.contains(x, y) {
            tracing::debug!(x, y, "click outside editable area");
            return Vec::new();
        }

        if self.grid.select(x, y) {
            self.enter_editing();
            self.view.redraw(&self.grid);
            return Vec::new();
        }

        self.grid.clear_selection();
        self.view.clear_form();
        self.set_mode(Mode::PendingCreation { x, y });
        self.view.redraw(&self.grid);
        vec![self.issue(Request::CreateRoom(RoomTarget::new(haven, x, y)))]
    }

    /// Sends the form of the room being edited.
    pub fn save(&mut self) -> Vec<Outgoing> {
        let (Mode::EditingRoom { x, y }, Some(haven)) = (self.mode, self.haven) else {
            return Vec::new();
        };
        let edit = self.view.form.to_edit(haven, x, y);
        vec![self.issue(Request::EditRoom(edit))]
    }

    /// Deletes the selected room. The selection is gone before the server
    /// answers.
    pub fn delete(&mut self) -> Vec<Outgoing> {
        let (Mode::EditingRoom { x, y }, Some(haven)) = (self.mode, self.haven) else {
            return Vec::new();
        };
        self.enter_no_selection();
        self.view.redraw(&self.grid);
        vec![self.issue(Request::DeleteRoom(RoomTarget::new(haven, x, y)))]
    }

    /// Applies the answer to `ticket` and returns follow-up requests.
    pub fn on_reply(&mut self, ticket: Ticket, result: Result<Reply, SyncError>) -> Vec<Outgoing> {
        let Some(request) = self.in_flight.remove(&ticket) else {
            tracing::warn!(?ticket, "reply for unknown ticket");
            return Vec::new();
        };
        if let Some(kind) = request.fetch_kind() {
            if self.latest.get(&kind) != Some(&ticket) {
                tracing::debug!(?ticket, ?kind, "dropping stale reply");
                return Vec::new();
            }
        }
        if request != Request::ListHavens && request.haven_id() != self.haven {
            tracing::debug!(?ticket, "dropping reply for deselected haven");
            return Vec::new();
        }

        match result {
            Ok(reply) => self.apply(request, reply),
            Err(err) => self.fail(request, err),
        }
    }

    fn fail(&mut self, request: Request, err: SyncError) -> Vec<Outgoing> {
        self.view.alert(err.to_string());
        match request {
            Request::CreateRoom(_) => {
                if matches!(self.mode, Mode::PendingCreation { .. }) {
                    self.enter_no_selection();
                }
                Vec::new()
            }
            Request::DeleteRoom(_) => self.refresh(),
            // A create whose refresh failed leaves nothing to edit.
            Request::FetchHaven(_) if matches!(self.mode, Mode::PendingCreation { .. }) => {
                self.enter_no_selection();
                self.view.redraw(&self.grid);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn apply(&mut self, request: Request, reply: Reply) -> Vec<Outgoing> {
        match (request, reply) {
            (Request::ListHavens, Reply::Havens(havens)) => {
                self.view.set_havens(&havens);
                Vec::new()
            }
            (Request::FetchHaven(_), Reply::Haven(layout)) => {
                self.load_layout(layout);
                Vec::new()
            }
            (Request::Obstacles(_), Reply::Obstacles(list)) => {
                self.view.obstacles.replace(list);
                Vec::new()
            }
            (Request::Monsters(_), Reply::Monsters(list)) => {
                self.view.monsters.replace(list);
                Vec::new()
            }
            (Request::Puzzles(_), Reply::Puzzles(list)) => {
                self.view.puzzles.replace(list);
                Vec::new()
            }
            (Request::CreateRoom(_), Reply::Done)
            | (Request::EditRoom(_), Reply::Done)
            | (Request::DeleteRoom(_), Reply::Done) => self.refresh(),
            (request, reply) => {
                tracing::warn!(?request, ?reply, "reply does not match request");
                self.view.alert("Unexpected response from server.");
                Vec::new()
            }
        }
    }

    fn load_layout(&mut self, layout: HavenLayout) {
        let loaded = match (layout.has_layout, layout.x_dim, layout.y_dim, layout.matrix) {
            (true, Some(w), Some(h), Some(matrix)) => self.grid.set_matrix(w, h, matrix),
            _ => {
                self.grid.clear();
                Ok(())
            }
        };
        if let Err(err) = loaded {
            self.view.alert(format!("malformed haven layout: {err}"));
            return;
        }

        match self.mode {
            Mode::PendingCreation { x, y } | Mode::EditingRoom { x, y } => {
                if self.grid.select(x, y) {
                    self.enter_editing();
                } else {
                    self.enter_no_selection();
                }
            }
            Mode::NoSelection => {}
        }
        self.view.redraw(&self.grid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::matrix_with_rooms;
    use shardhaven_protocol::{Choice, RefId};

    fn layout(w: u32, h: u32, rooms: &[(u32, u32)]) -> HavenLayout {
        HavenLayout::new(w, h, matrix_with_rooms(w, h, rooms))
    }

    fn only(out: Vec<Outgoing>) -> Outgoing {
        assert_eq!(out.len(), 1, "expected one request, got {out:?}");
        out.into_iter().next().unwrap()
    }

    /// Haven 7 selected and its 4x4 layout loaded with rooms at (1,1) and (2,1).
    fn loaded() -> Controller {
        let mut c = Controller::default();
        for o in c.select_haven(Some(7)) {
            let reply = match o.request {
                Request::FetchHaven(_) => Reply::Haven(layout(4, 4, &[(1, 1), (2, 1)])),
                Request::Obstacles(_) => Reply::Obstacles(Vec::new()),
                Request::Monsters(_) => Reply::Monsters(Vec::new()),
                _ => Reply::Puzzles(Vec::new()),
            };
            assert!(c.on_reply(o.ticket, Ok(reply)).is_empty());
        }
        assert!(c.view().alert.is_none());
        c
    }

    #[test]
    fn start_requests_haven_list() {
        let mut c = Controller::default();
        let out = only(c.start());
        assert_eq!(out.request, Request::ListHavens);
        c.on_reply(
            out.ticket,
            Ok(Reply::Havens(vec![shardhaven_protocol::HavenSummary {
                id: 7,
                name: "Ashen Hollow".to_string(),
            }])),
        );
        assert_eq!(c.view().havens.options().len(), 2);
    }

    #[test]
    fn selecting_haven_fetches_layout_and_references() {
        let mut c = Controller::default();
        let requests: Vec<Request> = c
            .select_haven(Some(7))
            .into_iter()
            .map(|o| o.request)
            .collect();
        assert_eq!(
            requests,
            vec![
                Request::FetchHaven(7),
                Request::Obstacles(7),
                Request::Monsters(7),
                Request::Puzzles(7),
            ]
        );
    }

    #[test]
    fn none_haven_disables_form_without_requests() {
        let mut c = loaded();
        c.pointer_down(25, 25);
        assert!(c.view().form.enabled);

        assert!(c.select_haven(None).is_empty());
        assert!(!c.view().form.enabled);
        assert!(!c.view().save_enabled);
        assert_eq!(c.view().canvas_size(), (0, 0));
        assert_eq!(c.mode(), Mode::NoSelection);
    }

    #[test]
    fn clicking_room_enters_editing_with_loaded_form() {
        let mut c = loaded();
        assert!(c.pointer_down(45, 30).is_empty());
        assert_eq!(c.mode(), Mode::EditingRoom { x: 2, y: 1 });
        assert_eq!(c.grid().selected(), Some((2, 1)));
        assert!(c.grid().selected_cell().is_some_and(|cell| cell.is_room));
        assert!(c.view().delete_enabled);
    }

    #[test]
    fn border_and_outside_clicks_are_ignored() {
        let mut c = loaded();
        c.pointer_down(25, 25);
        for (px, py) in [(5, 25), (25, 5), (85, 25), (25, 200)] {
            assert!(c.pointer_down(px, py).is_empty());
            assert_eq!(c.mode(), Mode::EditingRoom { x: 1, y: 1 });
        }
    }

    #[test]
    fn clicking_empty_cell_requests_creation_then_selects_it() {
        let mut c = loaded();
        let out = only(c.pointer_down(60, 45));
        assert_eq!(out.request, Request::CreateRoom(RoomTarget::new(7, 3, 2)));
        assert_eq!(c.mode(), Mode::PendingCreation { x: 3, y: 2 });
        assert!(!c.view().form.enabled);

        let refresh = only(c.on_reply(out.ticket, Ok(Reply::Done)));
        assert_eq!(refresh.request, Request::FetchHaven(7));
        c.on_reply(
            refresh.ticket,
            Ok(Reply::Haven(layout(4, 4, &[(1, 1), (2, 1), (3, 2)]))),
        );
        assert_eq!(c.mode(), Mode::EditingRoom { x: 3, y: 2 });
        assert!(c.view().form.enabled);
    }

    #[test]
    fn failed_creation_alerts_and_returns_to_no_selection() {
        let mut c = loaded();
        let out = only(c.pointer_down(60, 45));
        let follow = c.on_reply(
            out.ticket,
            Err(SyncError::Application {
                status: 500,
                message: "You cannot add or remove rooms while a haven is instanced.".to_string(),
                code: Some(-2),
            }),
        );
        assert!(follow.is_empty());
        assert_eq!(c.mode(), Mode::NoSelection);
        assert_eq!(
            c.dismiss_alert().as_deref(),
            Some("You cannot add or remove rooms while a haven is instanced.")
        );
    }

    #[test]
    fn failed_refresh_after_creation_returns_to_no_selection() {
        let mut c = loaded();
        let out = only(c.pointer_down(60, 45));
        let refresh = only(c.on_reply(out.ticket, Ok(Reply::Done)));
        assert_eq!(c.mode(), Mode::PendingCreation { x: 3, y: 2 });

        let err = SyncError::Transport("connection reset".to_string());
        assert!(c.on_reply(refresh.ticket, Err(err)).is_empty());
        assert_eq!(c.mode(), Mode::NoSelection);
        assert!(!c.view().form.enabled);
        assert_eq!(
            c.dismiss_alert().as_deref(),
            Some("transport error: connection reset")
        );

        // The next click on the still-empty cell tries again.
        let retry = only(c.pointer_down(60, 45));
        assert_eq!(retry.request, Request::CreateRoom(RoomTarget::new(7, 3, 2)));
    }

    #[test]
    fn save_sends_only_set_fields_then_refreshes() {
        let mut c = loaded();
        c.pointer_down(25, 25);
        c.form_mut().name = "Glass Gallery".to_string();
        let out = only(c.save());
        let Request::EditRoom(edit) = &out.request else {
            panic!("expected edit, got {:?}", out.request);
        };
        assert_eq!(
            edit.pairs(),
            vec![
                ("haven_id", "7"),
                ("x", "1"),
                ("y", "1"),
                ("name", "Glass Gallery"),
            ]
        );
        let refresh = only(c.on_reply(out.ticket, Ok(Reply::Done)));
        assert_eq!(refresh.request, Request::FetchHaven(7));
    }

    #[test]
    fn save_and_delete_need_a_selected_room() {
        let mut c = loaded();
        assert!(c.save().is_empty());
        assert!(c.delete().is_empty());
    }

    #[test]
    fn delete_is_optimistic_and_always_refreshes() {
        let mut c = loaded();
        c.pointer_down(25, 25);
        let out = only(c.delete());
        assert_eq!(out.request, Request::DeleteRoom(RoomTarget::new(7, 1, 1)));
        assert_eq!(c.grid().selected(), None);
        assert_eq!(c.mode(), Mode::NoSelection);
        assert!(!c.view().form.enabled);

        let err = SyncError::Transport("connection refused".to_string());
        let refresh = only(c.on_reply(out.ticket, Err(err)));
        assert_eq!(refresh.request, Request::FetchHaven(7));
        assert!(c.view().alert.is_some());
    }

    #[test]
    fn stale_haven_reply_is_discarded() {
        let mut c = loaded();
        let old = only(c.refresh());
        let new = only(c.refresh());

        c.on_reply(new.ticket, Ok(Reply::Haven(layout(5, 5, &[(1, 1)]))));
        c.on_reply(old.ticket, Ok(Reply::Haven(layout(3, 3, &[]))));
        assert_eq!(c.grid().width(), 5);
        assert_eq!(c.pending(), 0);
    }

    #[test]
    fn replies_for_previous_haven_are_discarded() {
        let mut c = Controller::default();
        let first = c.select_haven(Some(1));
        c.select_haven(Some(2));
        let monsters = first
            .iter()
            .find(|o| o.request == Request::Monsters(1))
            .unwrap();
        c.on_reply(
            monsters.ticket,
            Ok(Reply::Monsters(vec![Choice {
                id: RefId::from(3),
                name: "Shardling".to_string(),
            }])),
        );
        assert!(c.view().monsters.choices().is_empty());
    }

    #[test]
    fn refresh_dropping_selected_room_clears_selection() {
        let mut c = loaded();
        c.pointer_down(25, 25);
        let out = only(c.refresh());
        c.on_reply(out.ticket, Ok(Reply::Haven(layout(4, 4, &[(2, 1)]))));
        assert_eq!(c.mode(), Mode::NoSelection);
        assert!(!c.view().form.enabled);
    }

    #[test]
    fn malformed_layout_alerts_and_keeps_grid() {
        let mut c = loaded();
        let out = only(c.refresh());
        let bad = HavenLayout::new(3, 3, matrix_with_rooms(2, 2, &[]));
        c.on_reply(out.ticket, Ok(Reply::Haven(bad)));
        assert_eq!(c.grid().width(), 4);
        assert!(c.view().alert.is_some());
    }

    #[test]
    fn layout_with_one_empty_axis_alerts_instead_of_drawing() {
        let mut c = loaded();
        let out = only(c.refresh());
        let bad = HavenLayout::new(0, 300_000_000, Vec::new());
        c.on_reply(out.ticket, Ok(Reply::Haven(bad)));
        assert_eq!(c.grid().width(), 4);
        assert_eq!(c.view().canvas_size(), (4 * CELL_PITCH, 4 * CELL_PITCH));
        assert!(c
            .dismiss_alert()
            .is_some_and(|m| m.starts_with("malformed haven layout")));
    }
}
