//! Umbrella crate for the shardhaven layout editor.
//!
//! This crate is intentionally small: it re-exports the protocol, engine and editor
//! crates so downstream code can depend on a single crate name (`shardhaven`).

pub use shardhaven_editor as editor;
pub use shardhaven_engine as engine;
pub use shardhaven_protocol as protocol;
