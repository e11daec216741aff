//! Header-only metadata probing for scanned files.

use std::path::Path;

use image::ImageReader;
use tracing::{trace, warn};

use crate::models::MediaKind;

/// Reads pixel dimensions without decoding the file.
///
/// Only images are probed. Unreadable or corrupt files yield `None` so the
/// item still shows up in the grid, just without dimensions.
pub fn probe_dimensions(path: &Path, kind: &MediaKind) -> Option<(u32, u32)> {
    if *kind != MediaKind::Image {
        return None;
    }
    let reader = match ImageReader::open(path).and_then(|r| r.with_guessed_format()) {
        Ok(reader) => reader,
        Err(e) => {
            warn!("Failed to open image {:?}: {}", path, e);
            return None;
        }
    };
    match reader.into_dimensions() {
        Ok((width, height)) => {
            trace!("Got dimensions {}x{} for {:?}", width, height, path);
            Some((width, height))
        }
        Err(e) => {
            warn!("Failed to read image dimensions for {:?}: {}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_corrupt_image_has_no_dimensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"definitely not a png").unwrap();
        assert_eq!(probe_dimensions(&path, &MediaKind::Image), None);
    }

    #[test]
    fn test_non_images_are_not_probed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        fs::write(&path, b"").unwrap();
        assert_eq!(probe_dimensions(&path, &MediaKind::Video), None);
        assert_eq!(
            probe_dimensions(&dir.path().join("missing.png"), &MediaKind::Image),
            None
        );
    }
}
