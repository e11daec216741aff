pub mod file_scanner;
pub mod metadata;

pub use file_scanner::FileScanner;

#[cfg(feature = "gtk")]
pub use file_scanner::{ScanConfig, ScanProgress, ScanResult};
