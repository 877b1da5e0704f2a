//! Error types for asset loading
//!
//! Every loader failure ends in the same terminal `Failed` state. The variants
//! only exist so the logged diagnostic can say what went wrong.

use std::path::PathBuf;

/// Failure while fetching or decoding a model asset
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The asset does not exist at the requested location
    #[error("asset not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The asset exists but could not be read
    #[error("failed to fetch {}: {source}", path.display())]
    Transport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The asset was fetched but is not a valid material/geometry file
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

impl LoadError {
    /// Maps an I/O error onto the transport taxonomy, keeping `NotFound` distinct.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound { path }
        } else {
            LoadError::Transport { path, source }
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        LoadError::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// True for failures that happened before any bytes were decoded
    pub fn is_transport(&self) -> bool {
        matches!(self, LoadError::NotFound { .. } | LoadError::Transport { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, LoadError::Parse { .. })
    }

    /// Path of the asset that failed
    pub fn path(&self) -> &std::path::Path {
        match self {
            LoadError::NotFound { path }
            | LoadError::Transport { path, .. }
            | LoadError::Parse { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_is_kept_distinct() {
        let err = LoadError::from_io(
            "model/a/a.mtl",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, LoadError::NotFound { .. }));
        assert!(err.is_transport());
        assert!(!err.is_parse());
    }

    #[test]
    fn other_io_errors_are_transport() {
        let err = LoadError::from_io(
            "model/a/a.obj",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, LoadError::Transport { .. }));
        assert_eq!(err.path(), std::path::Path::new("model/a/a.obj"));
    }

    #[test]
    fn parse_error_message_mentions_path() {
        let err = LoadError::parse("model/a/a.obj", "no geometry");
        assert!(err.is_parse());
        assert_eq!(err.to_string(), "failed to parse model/a/a.obj: no geometry");
    }
}
