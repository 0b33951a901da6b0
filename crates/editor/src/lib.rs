//! Grid editor for shardhaven layouts.
//!
//! [`GridModel`] holds the active haven, [`Renderer`] draws it, [`Controller`]
//! turns user input into API requests and [`SyncClient`] carries them.
//! [`Editor`] wires the controller to a transport.

pub mod controller;
mod editor;
pub mod form;
pub mod grid;
pub mod render;
pub mod sync;
pub mod view;

pub use controller::{Controller, Mode, Outgoing, Ticket};
pub use editor::Editor;
pub use form::{ChoiceList, RoomForm};
pub use grid::{GridError, GridModel};
pub use render::{Palette, Renderer, Surface, CELL_PITCH};
pub use sync::{HttpTransport, RawResponse, Reply, Request, SyncClient, SyncError, Transport};
pub use view::EditorView;
