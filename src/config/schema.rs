use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/quaver/config.toml` or `~/.config/quaver/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `QUAVER__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub library: LibrarySettings,
    pub playback: PlaybackSettings,
    pub ui: UiSettings,
    pub controls: ControlsSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Root directories scanned for audio, in order.
    ///
    /// Files from different roots whose parent folders share a name end up in
    /// the same folder group, in root order.
    pub roots: Vec<PathBuf>,
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Directory names that are never descended into.
    pub skip_dirs: Vec<String>,
    /// Whether directories starting with `.` are pruned.
    pub skip_hidden: bool,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Cap on directory recursion depth (the root is depth 0).
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            extensions: vec!["mp3".into(), "aac".into(), "wav".into(), "m4a".into()],
            skip_dirs: vec!["Android".into()],
            skip_hidden: true,
            follow_links: false,
            max_depth: Some(32),
        }
    }
}

/// The well-known shared-storage folders, relative to the home directory.
fn default_roots() -> Vec<PathBuf> {
    let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    ["Music", "Downloads", "Download", "DCIM"]
        .iter()
        .map(|d| base.join(d))
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// How often the playing track's position is polled (milliseconds).
    pub poll_interval_ms: u64,
    /// A track counts as finished once its position is within this many
    /// milliseconds of the reported duration.
    pub end_tolerance_ms: Option<u64>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            end_tolerance_ms: None,
        }
    }
}

const DEFAULT_END_TOLERANCE_MS: u64 = 100;

impl PlaybackSettings {
    pub fn end_tolerance_ms(&self) -> u64 {
        self.end_tolerance_ms.unwrap_or(DEFAULT_END_TOLERANCE_MS)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,

    /// Which time fields to show for the status line, and in what order.
    ///
    /// Example: ["elapsed", "total", "remaining"]
    pub time_fields: Vec<TimeField>,

    /// Separator used to join `time_fields`.
    pub time_separator: String,

    /// How many trailing path segments to show under each track name.
    pub path_segments: usize,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ quaver ~ ".to_string(),
            time_fields: vec![TimeField::Elapsed, TimeField::Total],
            time_separator: " / ".to_string(),
            path_segments: 3,
        }
    }
}

#[derive(Debug, Copy, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeField {
    Elapsed,
    Total,
    Remaining,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Number of seconds to seek when pressing `H` / `L`.
    pub seek_step_seconds: u64,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            seek_step_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Directory for the daily rolling log file. `None` disables file logging.
    pub directory: Option<PathBuf>,
    /// `tracing_subscriber::EnvFilter` directives; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            directory: dirs::cache_dir().map(|d| d.join("quaver")),
            filter: "info,quaver=debug".to_string(),
        }
    }
}
