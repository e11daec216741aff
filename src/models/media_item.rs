use std::fmt;
use std::path::{Path, PathBuf};

use xxhash_rust::xxh3::xxh3_64;

/// Stable identity of an item, unrelated to its position in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Derives an id from the item's path so it survives re-scans and re-sorts.
    pub fn for_path(path: &Path) -> Self {
        Self(xxh3_64(path.as_os_str().as_encoded_bytes()))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    /// Anything the collection source could not classify.
    Other(String),
}

impl MediaKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "webp" | "gif" | "bmp" | "tiff" | "tif" | "avif" => {
                Self::Image
            }
            "webm" | "mp4" | "mkv" | "avi" | "mov" => Self::Video,
            "mp3" | "ogg" | "opus" | "flac" | "wav" | "m4a" => Self::Audio,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn for_path(path: &Path) -> Self {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }

    pub fn is_media(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Other(ext) => ext,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaItem {
    pub id: ItemId,
    pub kind: MediaKind,
    pub path: PathBuf,
    pub file_name: String,
    pub mtime: i64,
    pub size: i64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_ms: Option<u32>,
}

impl MediaItem {
    /// Create an item for a path, classifying it by extension.
    pub fn new(path: PathBuf) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            id: ItemId::for_path(&path),
            kind: MediaKind::for_path(&path),
            path,
            file_name,
            mtime: 0,
            size: 0,
            width: None,
            height: None,
            duration_ms: None,
        }
    }

    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Short human readable description used for previews and the status bar.
    pub fn describe(&self) -> String {
        let mut out = format!("{} [{}]", self.file_name, self.kind.label());
        if let (Some(w), Some(h)) = (self.width, self.height) {
            out.push_str(&format!(" {}x{}", w, h));
        }
        if let Some(ms) = self.duration_ms {
            out.push_str(&format!(" {}:{:02}", ms / 60_000, (ms / 1000) % 60));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(MediaKind::from_extension("PNG"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("webm"), MediaKind::Video);
        assert_eq!(MediaKind::from_extension("opus"), MediaKind::Audio);
        assert_eq!(
            MediaKind::from_extension("txt"),
            MediaKind::Other("txt".into())
        );
        assert!(!MediaKind::from_extension("").is_media());
    }

    #[test]
    fn test_id_is_stable_per_path() {
        let a = MediaItem::new(PathBuf::from("/media/a.png"));
        let again = MediaItem::new(PathBuf::from("/media/a.png"));
        let b = MediaItem::new(PathBuf::from("/media/b.png"));
        assert_eq!(a.id, again.id);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_describe() {
        let mut item = MediaItem::new(PathBuf::from("clip.mp4")).with_dimensions(1920, 1080);
        item.duration_ms = Some(83_000);
        assert_eq!(item.describe(), "clip.mp4 [video] 1920x1080 1:23");
    }
}
