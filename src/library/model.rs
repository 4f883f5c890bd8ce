use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::time::SystemTime;

/// One audio file found by a scan.
///
/// Two refs are equal when their paths are equal; nothing else takes part in
/// identity.
#[derive(Debug, Clone)]
pub struct AudioFileRef {
    pub path: PathBuf,
    /// File name including its extension.
    pub name: String,
    pub size: u64,
    pub modified: Option<SystemTime>,
    /// Leaf name of the directory the file was found in.
    pub folder: String,
}

impl PartialEq for AudioFileRef {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for AudioFileRef {}

impl Hash for AudioFileRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl AudioFileRef {
    /// The last `segments` components of the path joined with `/`.
    pub fn short_path(&self, segments: usize) -> String {
        let parts: Vec<String> = self
            .path
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let start = parts.len().saturating_sub(segments);
        parts[start..].join("/")
    }
}

/// Discovered files bucketed by the leaf name of their parent directory.
///
/// Folder names iterate in sorted order; files within a folder keep the order
/// they were discovered in. `Music/Live/a.mp3` and `Download/Live/b.mp3` both
/// land in `"Live"`.
#[derive(Debug, Clone, Default)]
pub struct FolderGrouping {
    groups: BTreeMap<String, Vec<AudioFileRef>>,
}

impl FolderGrouping {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, file: AudioFileRef) {
        self.groups.entry(file.folder.clone()).or_default().push(file);
    }

    pub fn folders(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn tracks(&self, folder: &str) -> &[AudioFileRef] {
        self.groups.get(folder).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[AudioFileRef])> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of folder groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn track_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}
