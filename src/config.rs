//! Settings for the scanner, the playback controller, the UI and logging.
//!
//! Values come from `config.toml`, overridden by `QUAVER__SECTION__KEY`
//! environment variables, with struct defaults for anything unset.

mod load;
mod schema;

pub use schema::*;
