//! Audio discovery: walks the configured roots and groups what it finds by
//! folder name.

mod model;
mod scan;

pub use model::{AudioFileRef, FolderGrouping};
pub use scan::{ScanSummary, discover};
