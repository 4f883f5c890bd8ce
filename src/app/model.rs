//! Application model types: `App`, `View` and the track-adjacency helpers.
//!
//! The `App` struct holds the last scan result, the two list cursors and the
//! handle used to read the playback snapshot.

use crate::audio::{PlaybackHandle, PlaybackInfo};
use crate::library::{AudioFileRef, FolderGrouping, ScanSummary};

/// Which list the user is looking at.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Folders,
    Tracks,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// The track before or after `current` in `tracks`.
///
/// Does not wrap. When `current` is not in the list, `Next` yields the first
/// track and `Previous` yields nothing.
pub fn adjacent<'a>(
    tracks: &'a [AudioFileRef],
    current: Option<&AudioFileRef>,
    direction: Direction,
) -> Option<&'a AudioFileRef> {
    let pos = current.and_then(|c| tracks.iter().position(|t| t == c));
    match (pos, direction) {
        (Some(p), Direction::Next) => tracks.get(p + 1),
        (Some(p), Direction::Previous) => p.checked_sub(1).and_then(|p| tracks.get(p)),
        (None, Direction::Next) => tracks.first(),
        (None, Direction::Previous) => None,
    }
}

/// Format seconds as `m:ss`. Negative and non-finite input shows as `0:00`.
pub fn format_time(seconds: f64) -> String {
    let secs = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// The main application model.
#[derive(Default)]
pub struct App {
    pub library: FolderGrouping,
    pub summary: Option<ScanSummary>,
    pub scanning: bool,
    pub view: View,
    pub folder_selected: usize,
    pub track_selected: usize,
    /// Folder whose tracks are shown in `View::Tracks`.
    pub open_folder: Option<String>,
    pub playback_handle: Option<PlaybackHandle>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a `PlaybackHandle` used to observe playback progress.
    pub fn set_playback_handle(&mut self, h: PlaybackHandle) {
        self.playback_handle = Some(h);
    }

    /// Copy of the latest playback snapshot (default when detached).
    pub fn playback(&self) -> PlaybackInfo {
        self.playback_handle
            .as_ref()
            .and_then(|h| h.lock().ok().map(|info| info.clone()))
            .unwrap_or_default()
    }

    pub fn begin_scan(&mut self) -> bool {
        if self.scanning {
            return false;
        }
        self.scanning = true;
        true
    }

    /// Replace the library with a fresh scan result.
    ///
    /// The open folder stays open if it still exists; cursors are clamped to
    /// the new lists.
    pub fn set_library(&mut self, library: FolderGrouping, summary: ScanSummary) {
        let selected_name = self.selected_folder().map(str::to_owned);
        self.library = library;
        self.summary = Some(summary);
        self.scanning = false;

        if let Some(name) = selected_name {
            if let Some(idx) = self.library.folders().position(|f| f == name) {
                self.folder_selected = idx;
            }
        }
        self.folder_selected = clamp_index(self.folder_selected, self.library.len());

        if let Some(open) = &self.open_folder {
            if self.library.tracks(open).is_empty() {
                self.open_folder = None;
                self.view = View::Folders;
            }
        }
        self.track_selected = clamp_index(self.track_selected, self.visible_tracks().len());
    }

    pub fn has_tracks(&self) -> bool {
        !self.library.is_empty()
    }

    pub fn selected_folder(&self) -> Option<&str> {
        self.library.folders().nth(self.folder_selected)
    }

    /// Tracks of the open folder, or an empty slice in the folder view.
    pub fn visible_tracks(&self) -> &[AudioFileRef] {
        match (&self.view, &self.open_folder) {
            (View::Tracks, Some(name)) => self.library.tracks(name),
            _ => &[],
        }
    }

    pub fn selected_track(&self) -> Option<&AudioFileRef> {
        self.visible_tracks().get(self.track_selected)
    }

    /// Move the cursor of the current view down one row.
    pub fn next(&mut self) {
        let len = self.current_len();
        let cursor = self.cursor_mut();
        if *cursor + 1 < len {
            *cursor += 1;
        }
    }

    /// Move the cursor of the current view up one row.
    pub fn prev(&mut self) {
        let cursor = self.cursor_mut();
        *cursor = cursor.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        *self.cursor_mut() = 0;
    }

    pub fn select_last(&mut self) {
        let len = self.current_len();
        *self.cursor_mut() = len.saturating_sub(1);
    }

    pub fn open_selected_folder(&mut self) {
        let Some(name) = self.selected_folder().map(str::to_owned) else {
            return;
        };
        if self.open_folder.as_deref() != Some(name.as_str()) {
            self.track_selected = 0;
        }
        self.open_folder = Some(name);
        self.view = View::Tracks;
    }

    pub fn back(&mut self) {
        self.view = View::Folders;
    }

    /// The list next/previous operate on: the open folder, or the folder of
    /// the current track while browsing folders.
    pub fn playlist_for(&self, current: Option<&AudioFileRef>) -> &[AudioFileRef] {
        match (self.view, current) {
            (View::Tracks, _) => self.visible_tracks(),
            (View::Folders, Some(c)) => self.library.tracks(&c.folder),
            (View::Folders, None) => &[],
        }
    }

    /// The track to play for a next/previous request, given the current one.
    pub fn adjacent_track(
        &self,
        current: Option<&AudioFileRef>,
        direction: Direction,
    ) -> Option<AudioFileRef> {
        adjacent(self.playlist_for(current), current, direction).cloned()
    }

    /// Put the track cursor on `file` if it is in the open folder.
    pub fn follow(&mut self, file: &AudioFileRef) {
        if let Some(idx) = self.visible_tracks().iter().position(|t| t == file) {
            self.track_selected = idx;
        }
    }

    fn current_len(&self) -> usize {
        match self.view {
            View::Folders => self.library.len(),
            View::Tracks => self.visible_tracks().len(),
        }
    }

    fn cursor_mut(&mut self) -> &mut usize {
        match self.view {
            View::Folders => &mut self.folder_selected,
            View::Tracks => &mut self.track_selected,
        }
    }
}

fn clamp_index(idx: usize, len: usize) -> usize {
    idx.min(len.saturating_sub(1))
}
