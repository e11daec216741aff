//! Directory scanner that builds the grid's item collection.
//!
//! Walks a directory with walkdir, keeps files whose extension maps to a
//! media kind, probes image headers for dimensions and returns the items
//! sorted by path. The walk runs on tokio's blocking pool.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::models::{ItemCollection, MediaItem, MediaKind};
use crate::scanner::metadata::probe_dimensions;

/// Configuration for the file scanner.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to scan directories recursively.
    pub recursive: bool,
    /// Maximum directory depth (0 = unlimited).
    pub max_depth: usize,
    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,
    /// Whether to descend into and list dot-files.
    pub include_hidden: bool,
    /// Whether to read image headers for dimensions.
    pub probe_dimensions: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: 0, // unlimited
            follow_symlinks: false,
            include_hidden: false,
            probe_dimensions: true,
        }
    }
}

/// Progress information sent during scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanProgress {
    Started { path: PathBuf },
    /// Media files found so far.
    Discovered { count: usize },
    Completed { total: usize, skipped: usize, errors: usize },
}

/// Result of a completed scan.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub items: ItemCollection,
    /// Files ignored because their extension is not a media kind.
    pub skipped: usize,
    /// Entries that could not be read.
    pub errors: usize,
}

pub struct FileScanner {
    config: ScanConfig,
}

impl FileScanner {
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
        }
    }

    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Scans a directory off the async runtime.
    pub async fn scan(&self, dir: &Path) -> Result<ScanResult> {
        let dir = dir.to_path_buf();
        let scanner = Self::with_config(self.config.clone());

        task::spawn_blocking(move || scanner.scan_blocking(&dir))
            .await
            .context("Scan task panicked")?
    }

    /// Scans a directory, reporting progress through a channel.
    pub fn scan_with_progress(
        &self,
        dir: PathBuf,
    ) -> (mpsc::Receiver<ScanProgress>, task::JoinHandle<Result<ScanResult>>) {
        let config = self.config.clone();
        let (tx, rx) = mpsc::channel(100);

        let handle = task::spawn_blocking(move || Self::scan_sync(&dir, &config, Some(tx)));
        let wrapped = task::spawn(async move { handle.await.context("Scan task panicked")? });

        (rx, wrapped)
    }

    /// Synchronous scan; usable directly from non-async callers.
    pub fn scan_blocking(&self, dir: &Path) -> Result<ScanResult> {
        Self::scan_sync(dir, &self.config, None)
    }

    fn scan_sync(
        dir: &Path,
        config: &ScanConfig,
        tx: Option<mpsc::Sender<ScanProgress>>,
    ) -> Result<ScanResult> {
        let send = |progress: ScanProgress| {
            if let Some(tx) = &tx {
                let _ = tx.blocking_send(progress);
            }
        };

        info!("Starting scan of {:?}", dir);
        if !dir.is_dir() {
            anyhow::bail!("{:?} is not a directory", dir);
        }
        send(ScanProgress::Started {
            path: dir.to_path_buf(),
        });

        let mut walker = WalkDir::new(dir).follow_links(config.follow_symlinks);
        if !config.recursive {
            walker = walker.max_depth(1);
        } else if config.max_depth > 0 {
            walker = walker.max_depth(config.max_depth);
        }

        let mut items = Vec::new();
        let mut skipped = 0;
        let mut errors = 0;

        let walk = walker
            .into_iter()
            .filter_entry(|e| config.include_hidden || e.depth() == 0 || !is_hidden(e));
        for entry in walk {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read directory entry: {}", e);
                    errors += 1;
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }

            let kind = MediaKind::for_path(entry.path());
            if !kind.is_media() {
                skipped += 1;
                continue;
            }

            match Self::build_item(&entry, kind, config) {
                Ok(item) => {
                    items.push(item);
                    if items.len() % 500 == 0 {
                        send(ScanProgress::Discovered { count: items.len() });
                    }
                }
                Err(e) => {
                    warn!("Error processing {:?}: {:#}", entry.path(), e);
                    errors += 1;
                }
            }
        }

        // Sort by path for consistent ordering
        items.sort_by(|a, b| a.path.cmp(&b.path));
        let total = items.len();
        let items = ItemCollection::new(items).context("Scanned items have clashing ids")?;

        send(ScanProgress::Discovered { count: total });
        send(ScanProgress::Completed {
            total,
            skipped,
            errors,
        });
        info!(
            "Scan complete: {} media files, {} skipped, {} errors",
            total, skipped, errors
        );

        Ok(ScanResult {
            items,
            skipped,
            errors,
        })
    }

    fn build_item(entry: &DirEntry, kind: MediaKind, config: &ScanConfig) -> Result<MediaItem> {
        let path = entry.path();
        let metadata = entry
            .metadata()
            .with_context(|| format!("Failed to read metadata for {:?}", path))?;

        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let mut item = MediaItem::new(path.to_path_buf()).with_kind(kind);
        item.mtime = mtime;
        item.size = metadata.len() as i64;

        if config.probe_dimensions {
            if let Some((width, height)) = probe_dimensions(path, &item.kind) {
                item = item.with_dimensions(width, height);
            }
        }
        debug!(id = %item.id, "scanned {}", item.describe());
        Ok(item)
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    fn create_test_image(path: &Path) {
        // Create a minimal valid PNG file (1x1 pixel)
        let png_data: [u8; 67] = [
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
            0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
            0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 dimensions
            0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53,
            0xDE, // bit depth, color type, etc
            0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, // IDAT chunk
            0x08, 0xD7, 0x63, 0xF8, 0x0F, 0x00, 0x00, 0x01, 0x01, 0x00, 0x18, 0xDD, 0x8D, 0xB4,
            0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, // IEND chunk
            0xAE, 0x42, 0x60, 0x82,
        ];

        let mut file = File::create(path).unwrap();
        file.write_all(&png_data).unwrap();
    }

    #[test]
    fn test_scan_config_default() {
        let config = ScanConfig::default();
        assert!(config.recursive);
        assert_eq!(config.max_depth, 0);
        assert!(!config.follow_symlinks);
        assert!(!config.include_hidden);
    }

    #[test]
    fn test_scan_empty_dir() {
        let dir = tempdir().unwrap();
        let result = FileScanner::new().scan_blocking(dir.path()).unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.skipped, 0);
    }

    #[test]
    fn test_scan_missing_dir_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(FileScanner::new().scan_blocking(&missing).is_err());
    }

    #[test]
    fn test_scan_classifies_and_sorts() {
        let dir = tempdir().unwrap();
        create_test_image(&dir.path().join("b.png"));
        create_test_image(&dir.path().join("a.png"));
        File::create(dir.path().join("c.webm")).unwrap();
        File::create(dir.path().join("d.opus")).unwrap();
        File::create(dir.path().join("not_media.txt")).unwrap();

        let result = FileScanner::new().scan_blocking(dir.path()).unwrap();
        let names: Vec<&str> = result.items.iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.webm", "d.opus"]);
        assert_eq!(result.skipped, 1);

        let first = result.items.get(0).unwrap();
        assert_eq!(first.kind, MediaKind::Image);
        assert_eq!((first.width, first.height), (Some(1), Some(1)));
        assert_eq!(result.items.get(2).unwrap().kind, MediaKind::Video);
        assert_eq!(result.items.get(3).unwrap().kind, MediaKind::Audio);
        assert!(result.items.iter().all(|i| i.kind.is_media()));
    }

    #[test]
    fn test_scan_recursive_and_hidden() {
        let dir = tempdir().unwrap();
        let subdir = dir.path().join("subdir");
        let hidden = dir.path().join(".cache");
        fs::create_dir(&subdir).unwrap();
        fs::create_dir(&hidden).unwrap();

        create_test_image(&dir.path().join("root.png"));
        create_test_image(&subdir.join("nested.png"));
        create_test_image(&hidden.join("thumb.png"));

        let result = FileScanner::new().scan_blocking(dir.path()).unwrap();
        assert_eq!(result.items.len(), 2);

        let config = ScanConfig {
            recursive: false,
            ..Default::default()
        };
        let result = FileScanner::with_config(config)
            .scan_blocking(dir.path())
            .unwrap();
        assert_eq!(result.items.len(), 1);

        let config = ScanConfig {
            include_hidden: true,
            ..Default::default()
        };
        let result = FileScanner::with_config(config)
            .scan_blocking(dir.path())
            .unwrap();
        assert_eq!(result.items.len(), 3);
    }

    #[tokio::test]
    async fn test_async_scan() {
        let dir = tempdir().unwrap();
        create_test_image(&dir.path().join("test1.png"));
        create_test_image(&dir.path().join("test2.png"));

        let result = FileScanner::new().scan(dir.path()).await.unwrap();
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.errors, 0);
    }

    #[tokio::test]
    async fn test_scan_with_progress() {
        let dir = tempdir().unwrap();
        create_test_image(&dir.path().join("one.png"));
        File::create(dir.path().join("skip.doc")).unwrap();

        let (mut rx, handle) = FileScanner::new().scan_with_progress(dir.path().to_path_buf());
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.items.len(), 1);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events.first(),
            Some(&ScanProgress::Started {
                path: dir.path().to_path_buf()
            })
        );
        assert_eq!(
            events.last(),
            Some(&ScanProgress::Completed {
                total: 1,
                skipped: 1,
                errors: 0
            })
        );
    }
}
