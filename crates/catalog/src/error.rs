use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The cache file exists but is not a valid catalog document.
    #[error("could not decode catalog file {}", .path.display())]
    StoreCorrupt {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("catalog cache I/O failed for {}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode catalog cache")]
    Encode(#[source] serde_yaml::Error),

    #[error("failed to lock catalog cache {}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Opening a context view failed because the store could not be loaded.
    #[error("plugin catalog unavailable")]
    StoreUnavailable(#[source] Box<Error>),
}

impl Error {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }
}
