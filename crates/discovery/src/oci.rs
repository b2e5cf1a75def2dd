//! Discovery from a plugin inventory packaged as an OCI image.

use std::sync::Arc;

use {async_trait::async_trait, plugctl_config::DiscoveryType, tracing::debug};

use crate::{
    discovery::Discovery,
    error::Result,
    normalize::{discovered_from_resources, parse_plugin_manifests},
    types::Discovered,
};

/// One file unpacked from a discovery image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub content: Vec<u8>,
}

/// Pulls an image and returns the files it contains.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch_files(&self, image: &str) -> anyhow::Result<Vec<ImageFile>>;
}

pub struct OciDiscovery {
    name: String,
    image: String,
    fetcher: Arc<dyn ImageFetcher>,
}

impl OciDiscovery {
    pub fn new(
        name: impl Into<String>,
        image: impl Into<String>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            fetcher,
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }
}

#[async_trait]
impl Discovery for OciDiscovery {
    fn name(&self) -> &str {
        &self.name
    }

    fn discovery_type(&self) -> DiscoveryType {
        DiscoveryType::Oci
    }

    async fn list(&self) -> Result<Vec<Discovered>> {
        let files = self.fetcher.fetch_files(&self.image).await?;
        debug!(
            source = %self.name,
            image = %self.image,
            files = files.len(),
            "fetched discovery image"
        );
        let resources = parse_plugin_manifests(
            files
                .iter()
                .map(|f| (f.name.as_str(), f.content.as_slice())),
        )?;
        discovered_from_resources(resources, &self.name, self.discovery_type())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {super::*, crate::error::Error, std::sync::Mutex};

    #[derive(Default)]
    struct FakeRegistry {
        files: Vec<ImageFile>,
        pulled: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl ImageFetcher for FakeRegistry {
        async fn fetch_files(&self, image: &str) -> anyhow::Result<Vec<ImageFile>> {
            self.pulled.lock().unwrap().push(image.to_string());
            if self.fail {
                anyhow::bail!("manifest unknown");
            }
            Ok(self.files.clone())
        }
    }

    const IMAGE: &str = "projects.registry.vmware.com/tanzu_cli/plugins/plugin-inventory:latest";

    #[tokio::test]
    async fn test_lists_plugins_from_image_files() {
        let registry = Arc::new(FakeRegistry {
            files: vec![
                ImageFile {
                    name: "plugins/telemetry.yaml".into(),
                    content: b"kind: CLIPlugin
metadata:
  name: telemetry
spec:
  recommendedVersion: v1.1.0
  target: global
  artifacts:
    v1.1.0:
      - image: tanzu_cli/plugins/telemetry:v1.1.0
        os: linux
        arch: amd64
"
                    .to_vec(),
                },
                ImageFile {
                    name: "plugin_inventory.db".into(),
                    content: vec![0, 1, 2],
                },
            ],
            ..Default::default()
        });

        let d = OciDiscovery::new("default", IMAGE, registry.clone());
        let plugins = d.list().await.unwrap();

        assert_eq!(registry.pulled.lock().unwrap().as_slice(), [IMAGE]);
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].name, "telemetry");
        assert_eq!(plugins[0].discovery_type, DiscoveryType::Oci);
        assert_eq!(plugins[0].source, "default");
    }

    #[tokio::test]
    async fn test_fetch_failure_is_collaborator_error() {
        let registry = Arc::new(FakeRegistry {
            fail: true,
            ..Default::default()
        });
        let d = OciDiscovery::new("default", IMAGE, registry);
        let err = d.list().await.unwrap_err();
        assert!(matches!(err, Error::Collaborator(_)));
        assert!(err.to_string().contains("manifest unknown"));
    }
}
