//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the scanned library, the
//! list cursors and the playback handle.

mod model;

pub use model::*;
