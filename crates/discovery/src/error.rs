use crate::version::VersionError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("error parsing supported versions for plugin {plugin}")]
    VersionParse {
        plugin: String,
        #[source]
        source: VersionError,
    },

    /// The discovery endpoint answered with a non-success status.
    #[error("discovery API error, status code: {status}")]
    Upstream { status: u16 },

    #[error("discovery request failed")]
    Http(#[from] reqwest::Error),

    #[error("invalid plugin manifest {file}")]
    Manifest {
        file: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} discovery source {name} needs a backend client that was not provided")]
    MissingCollaborator { kind: String, name: String },

    #[error("discovery cancelled")]
    Cancelled,

    /// Failure reported by an external collaborator (cluster, registry, bucket).
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}
