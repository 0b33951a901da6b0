//! Everything the editor shows: canvas, room form, selectors, buttons, alert.

use crate::form::{ChoiceList, RoomForm};
use crate::grid::GridModel;
use crate::render::Renderer;
use image::RgbaImage;
use shardhaven_protocol::{Choice, HavenId, HavenSummary, RefId};

#[derive(Debug, Clone)]
pub struct EditorView {
    pub canvas: RgbaImage,
    pub form: RoomForm,
    pub havens: ChoiceList,
    pub haven: Option<HavenId>,
    pub obstacles: ChoiceList,
    pub monsters: ChoiceList,
    pub puzzles: ChoiceList,
    pub save_enabled: bool,
    pub delete_enabled: bool,
    /// Last error shown to the user.
    pub alert: Option<String>,
    renderer: Renderer,
}

impl Default for EditorView {
    fn default() -> Self {
        Self {
            canvas: RgbaImage::new(0, 0),
            form: RoomForm::cleared(),
            havens: ChoiceList::default(),
            haven: None,
            obstacles: ChoiceList::default(),
            monsters: ChoiceList::default(),
            puzzles: ChoiceList::default(),
            save_enabled: false,
            delete_enabled: false,
            alert: None,
            renderer: Renderer::default(),
        }
    }
}

impl EditorView {
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    pub fn redraw(&mut self, grid: &GridModel) {
        self.renderer.render(grid, &mut self.canvas);
    }

    pub fn show_form(&mut self, form: RoomForm) {
        let enabled = form.enabled;
        self.form = form;
        self.save_enabled = enabled;
        self.delete_enabled = enabled;
    }

    pub fn clear_form(&mut self) {
        self.show_form(RoomForm::cleared());
    }

    pub fn set_havens(&mut self, havens: &[HavenSummary]) {
        self.havens.replace(havens.iter().map(|h| Choice {
            id: RefId::from(h.id),
            name: h.name.clone(),
        }));
    }

    pub fn reset_references(&mut self) {
        self.obstacles.reset();
        self.monsters.reset();
        self.puzzles.reset();
    }

    pub fn alert(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "editor alert");
        self.alert = Some(message);
    }

    pub fn dismiss_alert(&mut self) -> Option<String> {
        self.alert.take()
    }
}
