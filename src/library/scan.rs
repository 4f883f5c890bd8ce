use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::LibrarySettings;
use crate::error::ScanDirectoryError;

use super::model::{AudioFileRef, FolderGrouping};

/// Counters gathered while scanning, logged once per scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub roots_scanned: usize,
    pub roots_missing: usize,
    pub entries_skipped: usize,
    pub files_accepted: usize,
}

/// Text after the final `.` of `name`, lower-cased.
pub(super) fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

fn normalized_extensions(settings: &LibrarySettings) -> Vec<String> {
    settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn is_audio_name(name: &str, exts: &[String]) -> bool {
    extension_of(name)
        .map(|ext| exts.iter().any(|e| e == &ext))
        .unwrap_or(false)
}

/// Directories that are never descended into: dot-directories and the
/// configured reserved names.
fn is_pruned_dir(entry: &DirEntry, settings: &LibrarySettings) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let Some(name) = entry.file_name().to_str() else {
        return false;
    };
    (settings.skip_hidden && name.starts_with('.')) || settings.skip_dirs.iter().any(|d| d == name)
}

fn folder_key(path: &Path) -> String {
    match path.parent() {
        Some(parent) => parent
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| parent.display().to_string()),
        None => String::new(),
    }
}

/// Scan every configured root and group the audio files found by folder name,
/// together with what the scan ran into.
///
/// Never fails: unreadable directories and missing roots are logged and
/// contribute nothing.
pub fn discover(settings: &LibrarySettings) -> (FolderGrouping, ScanSummary) {
    let exts = normalized_extensions(settings);
    let mut grouping = FolderGrouping::new();
    let mut summary = ScanSummary::default();

    for root in &settings.roots {
        scan_root(root, settings, &exts, &mut grouping, &mut summary);
    }

    info!(
        roots = summary.roots_scanned,
        missing = summary.roots_missing,
        skipped = summary.entries_skipped,
        files = summary.files_accepted,
        folders = grouping.len(),
        "library scan finished"
    );
    (grouping, summary)
}

fn scan_root(
    root: &Path,
    settings: &LibrarySettings,
    exts: &[String],
    grouping: &mut FolderGrouping,
    summary: &mut ScanSummary,
) {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            debug!(root = %root.display(), "root is not a directory, skipping");
            summary.roots_missing += 1;
            return;
        }
        Err(e) => {
            debug!(root = %root.display(), error = %e, "root not accessible, skipping");
            summary.roots_missing += 1;
            return;
        }
    }
    summary.roots_scanned += 1;

    let mut walker = WalkDir::new(root)
        .follow_links(settings.follow_links)
        .sort_by_file_name();
    if let Some(d) = settings.max_depth {
        walker = walker.max_depth(d);
    }

    // The root itself is never pruned, even if its name is reserved.
    let entries = walker
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_pruned_dir(e, settings));

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(source) => {
                let err = ScanDirectoryError {
                    path: source
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf()),
                    source,
                };
                warn!("{err}");
                summary.entries_skipped += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_audio_name(&name, exts) {
            continue;
        }

        let meta = entry.metadata().ok();
        let path = entry.into_path();
        grouping.push(AudioFileRef {
            folder: folder_key(&path),
            name,
            size: meta.as_ref().map(|m| m.len()).unwrap_or(0),
            modified: meta.and_then(|m| m.modified().ok()),
            path,
        });
        summary.files_accepted += 1;
    }
}
