//! Discovery from plugin manifest files in a local directory.

use std::path::{Path, PathBuf};

use {async_trait::async_trait, plugctl_config::DiscoveryType, tracing::debug};

use crate::{
    discovery::Discovery,
    error::{Error, Result},
    normalize::{discovered_from_resources, parse_plugin_manifests},
    types::Discovered,
};

/// Plugins described by manifest files in a local directory.
pub struct LocalDiscovery {
    name: String,
    path: PathBuf,
}

impl LocalDiscovery {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Read every regular file directly under `dir`, sorted by file name.
async fn read_manifest_dir(dir: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error(dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(dir, e))? {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(|e| io_error(&path, e))?;
        if !file_type.is_file() {
            continue;
        }
        let content = tokio::fs::read(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        files.push((entry.file_name().to_string_lossy().into_owned(), content));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

#[async_trait]
impl Discovery for LocalDiscovery {
    fn name(&self) -> &str {
        &self.name
    }

    fn discovery_type(&self) -> DiscoveryType {
        DiscoveryType::Local
    }

    async fn list(&self) -> Result<Vec<Discovered>> {
        let files = read_manifest_dir(&self.path).await?;
        if files.is_empty() {
            debug!(source = %self.name, path = %self.path.display(), "no local plugin manifests");
        }
        let resources =
            parse_plugin_manifests(files.iter().map(|(n, c)| (n.as_str(), c.as_slice())))?;
        discovered_from_resources(resources, &self.name, self.discovery_type())
    }
}
