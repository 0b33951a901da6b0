use crate::controller::{Controller, Outgoing};
use crate::form::RoomForm;
use crate::render::CELL_PITCH;
use crate::sync::{SyncClient, Transport};
use shardhaven_protocol::HavenId;
use std::collections::VecDeque;

/// Runs a [`Controller`] against a live transport: every request it emits is
/// sent in order and its reply fed back, follow-ups included.
pub struct Editor<T> {
    controller: Controller,
    client: SyncClient<T>,
}

impl<T: Transport> Editor<T> {
    pub fn new(client: SyncClient<T>) -> Self {
        Self {
            controller: Controller::default(),
            client,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn client(&self) -> &SyncClient<T> {
        &self.client
    }

    pub fn form_mut(&mut self) -> &mut RoomForm {
        self.controller.form_mut()
    }

    pub async fn dispatch(&mut self, outgoing: Vec<Outgoing>) {
        let mut queue: VecDeque<Outgoing> = outgoing.into();
        while let Some(Outgoing { ticket, request }) = queue.pop_front() {
            let result = self.client.execute(&request).await;
            if let Err(err) = &result {
                tracing::debug!(?request, %err, "request failed");
            }
            queue.extend(self.controller.on_reply(ticket, result));
        }
    }

    pub async fn start(&mut self) {
        let out = self.controller.start();
        self.dispatch(out).await;
    }

    pub async fn select_haven(&mut self, haven: Option<HavenId>) {
        let out = self.controller.select_haven(haven);
        self.dispatch(out).await;
    }

    pub async fn pointer_down(&mut self, px: u32, py: u32) {
        let out = self.controller.pointer_down(px, py);
        self.dispatch(out).await;
    }

    /// Clicks the centre of grid cell `(x, y)`.
    pub async fn click_cell(&mut self, x: u32, y: u32) {
        let half = CELL_PITCH / 2;
        self.pointer_down(x * CELL_PITCH + half, y * CELL_PITCH + half).await;
    }

    pub async fn save(&mut self) {
        let out = self.controller.save();
        self.dispatch(out).await;
    }

    pub async fn delete(&mut self) {
        let out = self.controller.delete();
        self.dispatch(out).await;
    }

    pub fn take_alert(&mut self) -> Option<String> {
        self.controller.dismiss_alert()
    }
}
