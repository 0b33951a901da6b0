//! Rasterises a [`GridModel`] onto a [`Surface`].

use crate::grid::GridModel;
use image::{Rgba, RgbaImage};
use shardhaven_protocol::{Cell, Direction};
use std::path::Path;

/// Side of one grid cell in pixels.
pub const CELL_PITCH: u32 = 20;

const MARKER_RADIUS: u32 = 2;

pub type Color = [u8; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub room: Color,
    pub selected: Color,
    pub open_edge: Color,
    pub obstacle_edge: Color,
    pub monster: Color,
    pub puzzle: Color,
    pub entrance: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: [0x1a, 0x1a, 0x1a, 0xff],
            room: [0xc8, 0xc0, 0xa8, 0xff],
            selected: [0xf0, 0xd0, 0x60, 0xff],
            open_edge: [0x70, 0x68, 0x58, 0xff],
            obstacle_edge: [0xd0, 0x30, 0x30, 0xff],
            monster: [0x90, 0x10, 0x10, 0xff],
            puzzle: [0x20, 0x50, 0xc0, 0xff],
            entrance: [0x20, 0xa0, 0x40, 0xff],
        }
    }
}

/// Minimal raster target.
pub trait Surface {
    fn resize(&mut self, width: u32, height: u32);
    fn dimensions(&self) -> (u32, u32);
    fn put(&mut self, x: u32, y: u32, color: Color);

    fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Color) {
        let (sw, sh) = self.dimensions();
        for py in y..(y + h).min(sh) {
            for px in x..(x + w).min(sw) {
                self.put(px, py, color);
            }
        }
    }
}

impl Surface for RgbaImage {
    fn resize(&mut self, width: u32, height: u32) {
        if self.dimensions() != (width, height) {
            *self = RgbaImage::new(width, height);
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn put(&mut self, x: u32, y: u32, color: Color) {
        self.put_pixel(x, y, Rgba(color));
    }
}

/// Pixel-space outline of one cell edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

pub fn edge_rect(cell_x: u32, cell_y: u32, dir: Direction) -> EdgeRect {
    let (x0, y0) = (cell_x * CELL_PITCH, cell_y * CELL_PITCH);
    let last = CELL_PITCH - 1;
    let (x, y, w, h) = match dir {
        Direction::North => (x0, y0, CELL_PITCH, 1),
        Direction::South => (x0, y0 + last, CELL_PITCH, 1),
        Direction::West => (x0, y0, 1, CELL_PITCH),
        Direction::East => (x0 + last, y0, 1, CELL_PITCH),
    };
    EdgeRect { x, y, w, h }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Monster,
    Puzzle,
    Entrance,
}

impl Marker {
    /// Dot centre inside the cell: monster top-left, puzzle top-right,
    /// entrance bottom-left.
    pub fn offset(self) -> (u32, u32) {
        let q = CELL_PITCH / 4;
        let q3 = 3 * CELL_PITCH / 4;
        match self {
            Marker::Monster => (q, q),
            Marker::Puzzle => (q3, q),
            Marker::Entrance => (q, q3),
        }
    }

    fn color(self, palette: &Palette) -> Color {
        match self {
            Marker::Monster => palette.monster,
            Marker::Puzzle => palette.puzzle,
            Marker::Entrance => palette.entrance,
        }
    }
}

fn markers(cell: &Cell) -> impl Iterator<Item = Marker> {
    [
        (cell.monster.is_some(), Marker::Monster),
        (cell.puzzle.is_some(), Marker::Puzzle),
        (cell.entrance, Marker::Entrance),
    ]
    .into_iter()
    .filter_map(|(on, marker)| on.then_some(marker))
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    pub palette: Palette,
}

impl Renderer {
    pub fn canvas_size(grid: &GridModel) -> (u32, u32) {
        (
            grid.width().saturating_mul(CELL_PITCH),
            grid.height().saturating_mul(CELL_PITCH),
        )
    }

    pub fn render<S: Surface>(&self, grid: &GridModel, surface: &mut S) {
        let (w, h) = Self::canvas_size(grid);
        surface.resize(w, h);
        surface.fill_rect(0, 0, w, h, self.palette.background);

        for (x, y, cell) in grid.rooms() {
            self.draw_room(surface, x, y, cell, grid.is_selected(x, y));
        }
    }

    fn draw_room<S: Surface>(&self, surface: &mut S, x: u32, y: u32, cell: &Cell, selected: bool) {
        let (x0, y0) = (x * CELL_PITCH, y * CELL_PITCH);
        let fill = if selected {
            self.palette.selected
        } else {
            self.palette.room
        };
        surface.fill_rect(x0, y0, CELL_PITCH, CELL_PITCH, fill);

        for dir in Direction::ALL {
            let color = if cell.obstacle(dir).is_some() {
                self.palette.obstacle_edge
            } else {
                self.palette.open_edge
            };
            let r = edge_rect(x, y, dir);
            surface.fill_rect(r.x, r.y, r.w, r.h, color);
        }

        let side = 2 * MARKER_RADIUS;
        for marker in markers(cell) {
            let (cx, cy) = marker.offset();
            surface.fill_rect(
                x0 + cx - MARKER_RADIUS,
                y0 + cy - MARKER_RADIUS,
                side,
                side,
                marker.color(&self.palette),
            );
        }
    }

    pub fn to_image(&self, grid: &GridModel) -> RgbaImage {
        let mut img = RgbaImage::new(0, 0);
        self.render(grid, &mut img);
        img
    }

    pub fn save_png(&self, grid: &GridModel, path: &Path) -> image::ImageResult<()> {
        self.to_image(grid).save_with_format(path, image::ImageFormat::Png)
    }
}
