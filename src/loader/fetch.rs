//! Asset fetching
//!
//! The loader only needs "give me the bytes at this path, and tell me how far
//! along you are". [`FileFetcher`] serves a directory on disk and
//! [`MemoryFetcher`] serves assets held in memory.

use std::{
    collections::HashMap,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::error::LoadError;

/// Read granularity for progress reports
const CHUNK_SIZE: usize = 64 * 1024;

/// Bytes received so far for one asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub loaded: u64,
    /// `None` when the source cannot tell the full length up front
    pub total: Option<u64>,
}

impl Progress {
    /// Percent loaded, rounded to the nearest whole number, or `None` when the
    /// total is unknown
    pub fn percent(&self) -> Option<u32> {
        match self.total {
            Some(0) => Some(100),
            Some(total) => Some(((self.loaded.min(total) * 100 + total / 2) / total) as u32),
            None => None,
        }
    }
}

/// Source of model assets
pub trait AssetFetcher: Send + Sync {
    /// Fetches the whole asset at `path`, calling `on_progress` as bytes arrive.
    fn fetch(&self, path: &Path, on_progress: &mut dyn FnMut(Progress))
        -> Result<Vec<u8>, LoadError>;

    /// Whether an asset exists at `path` without fetching it
    fn exists(&self, path: &Path) -> bool;
}

/// Serves assets from a directory on disk
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetFetcher for FileFetcher {
    fn fetch(
        &self,
        path: &Path,
        on_progress: &mut dyn FnMut(Progress),
    ) -> Result<Vec<u8>, LoadError> {
        let full_path = self.root.join(path);
        let mut file = File::open(&full_path).map_err(|e| LoadError::from_io(path, e))?;
        let total = file.metadata().ok().map(|m| m.len());

        let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            let read = file
                .read(&mut chunk)
                .map_err(|e| LoadError::from_io(path, e))?;
            if read == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..read]);
            on_progress(Progress {
                loaded: bytes.len() as u64,
                total,
            });
        }

        Ok(bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        self.root.join(path).is_file()
    }
}

/// Serves assets held in memory
///
/// Every fetch is recorded, in order, so callers can check which assets were
/// requested and when.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    assets: HashMap<PathBuf, Vec<u8>>,
    hide_length: bool,
    chunk_size: Option<usize>,
    fetch_log: Arc<Mutex<Vec<PathBuf>>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        self.assets.insert(path.into(), bytes.into());
        self
    }

    /// Report progress without a total, like a response without a length
    pub fn without_length(mut self) -> Self {
        self.hide_length = true;
        self
    }

    /// Deliver assets in chunks of `size` bytes instead of all at once
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    /// Paths requested so far, in request order
    pub fn fetched(&self) -> Vec<PathBuf> {
        self.fetch_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

impl AssetFetcher for MemoryFetcher {
    fn fetch(
        &self,
        path: &Path,
        on_progress: &mut dyn FnMut(Progress),
    ) -> Result<Vec<u8>, LoadError> {
        if let Ok(mut log) = self.fetch_log.lock() {
            log.push(path.to_path_buf());
        }

        let bytes = self.assets.get(path).ok_or_else(|| LoadError::NotFound {
            path: path.to_path_buf(),
        })?;

        let total = if self.hide_length {
            None
        } else {
            Some(bytes.len() as u64)
        };
        let chunk_size = self.chunk_size.unwrap_or(bytes.len().max(1));

        let mut loaded = 0u64;
        for chunk in bytes.chunks(chunk_size) {
            loaded += chunk.len() as u64;
            on_progress(Progress { loaded, total });
        }

        Ok(bytes.clone())
    }

    fn exists(&self, path: &Path) -> bool {
        self.assets.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_rounded_and_capped() {
        let third = Progress {
            loaded: 1,
            total: Some(3),
        };
        assert_eq!(third.percent(), Some(33));
        let two_thirds = Progress {
            loaded: 2,
            total: Some(3),
        };
        assert_eq!(two_thirds.percent(), Some(67));
        let half = Progress {
            loaded: 1,
            total: Some(2),
        };
        assert_eq!(half.percent(), Some(50));
        let over = Progress {
            loaded: 10,
            total: Some(5),
        };
        assert_eq!(over.percent(), Some(100));
        let unknown = Progress {
            loaded: 10,
            total: None,
        };
        assert_eq!(unknown.percent(), None);
    }

    #[test]
    fn memory_fetcher_reports_chunks_and_logs_requests() {
        let fetcher = MemoryFetcher::new()
            .with_asset("a.obj", vec![0u8; 10])
            .with_chunk_size(4);

        let mut reports = Vec::new();
        let bytes = fetcher
            .fetch(Path::new("a.obj"), &mut |p| reports.push(p.loaded))
            .unwrap();

        assert_eq!(bytes.len(), 10);
        assert_eq!(reports, vec![4, 8, 10]);
        assert_eq!(fetcher.fetched(), vec![PathBuf::from("a.obj")]);
    }

    #[test]
    fn memory_fetcher_missing_asset_is_not_found() {
        let fetcher = MemoryFetcher::new();
        let err = fetcher
            .fetch(Path::new("missing.mtl"), &mut |_| {})
            .unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
        // failed requests are still recorded
        assert_eq!(fetcher.fetched().len(), 1);
    }

    #[test]
    fn file_fetcher_reads_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cube.mtl"), b"newmtl cube\n").unwrap();

        let fetcher = FileFetcher::new(dir.path());
        let mut last = None;
        let bytes = fetcher
            .fetch(Path::new("cube.mtl"), &mut |p| last = Some(p))
            .unwrap();

        assert_eq!(bytes, b"newmtl cube\n");
        assert_eq!(last.and_then(|p| p.percent()), Some(100));
        assert!(fetcher.exists(Path::new("cube.mtl")));
        assert!(!fetcher.exists(Path::new("other.mtl")));
        assert!(matches!(
            fetcher.fetch(Path::new("other.mtl"), &mut |_| {}),
            Err(LoadError::NotFound { .. })
        ));
    }
}
