//! Discovery through the plugin REST API.

use std::time::Duration;

use {
    async_trait::async_trait,
    plugctl_config::DiscoveryType,
    reqwest::header::{ACCEPT, CONTENT_TYPE},
    serde::Deserialize,
    tracing::debug,
};

use crate::{
    discovery::Discovery,
    error::{Error, Result},
    normalize::PluginSpec,
    types::Discovered,
};

/// Deadline for one listing request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Deserialize)]
struct ListPluginsResponse {
    #[serde(default)]
    plugins: Vec<RestPlugin>,
}

#[derive(Debug, Deserialize)]
struct RestPlugin {
    #[serde(default)]
    name: String,
    #[serde(flatten)]
    spec: PluginSpec,
}

pub struct RestDiscovery {
    name: String,
    endpoint: String,
    base_path: String,
    client: reqwest::Client,
}

impl RestDiscovery {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        base_path: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(name, endpoint, base_path, client))
    }

    pub fn with_client(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        base_path: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            base_path: base_path.into(),
            client,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.base_path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Discovery for RestDiscovery {
    fn name(&self) -> &str {
        &self.name
    }

    fn discovery_type(&self) -> DiscoveryType {
        DiscoveryType::Rest
    }

    async fn list(&self) -> Result<Vec<Discovered>> {
        let url = self.url();
        debug!(source = %self.name, %url, "listing plugins from REST endpoint");

        let response = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(ACCEPT, JSON_CONTENT_TYPE)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
            });
        }

        let body: ListPluginsResponse = response.json().await?;
        body.plugins
            .into_iter()
            .filter(|p| !p.name.is_empty())
            .map(|p| Discovered::from_spec(&p.name, p.spec, &self.name, self.discovery_type()))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {super::*, plugctl_common::Target};

    const BASE_PATH: &str = "/v1alpha1/cli/plugins";

    async fn discovery_for(server: &mockito::ServerGuard) -> RestDiscovery {
        RestDiscovery::new("rest-source", server.url(), BASE_PATH).unwrap()
    }

    #[tokio::test]
    async fn test_error_status_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", BASE_PATH)
            .with_status(404)
            .create_async()
            .await;

        let err = discovery_for(&server).await.list().await.unwrap_err();
        assert!(matches!(err, Error::Upstream { status: 404 }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_redirect_status_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", BASE_PATH)
            .with_status(302)
            .with_header("content-type", "application/json")
            .with_body(r#"{"plugins":[{"name":"stale","recommendedVersion":"v1.0.0"}]}"#)
            .create_async()
            .await;

        let err = discovery_for(&server).await.list().await.unwrap_err();
        assert!(matches!(err, Error::Upstream { status: 302 }));
    }

    #[tokio::test]
    async fn test_not_modified_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", BASE_PATH)
            .with_status(304)
            .create_async()
            .await;

        let err = discovery_for(&server).await.list().await.unwrap_err();
        assert!(matches!(err, Error::Upstream { status: 304 }));
    }

    #[tokio::test]
    async fn test_unnamed_entries_are_skipped() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", BASE_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"plugins":[{"name":"","recommendedVersion":"v1.0.0"}]}"#)
            .create_async()
            .await;

        let plugins = discovery_for(&server).await.list().await.unwrap();
        assert!(plugins.is_empty());
    }

    #[tokio::test]
    async fn test_lists_plugins() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", BASE_PATH)
            .match_header("accept", JSON_CONTENT_TYPE)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                  "plugins": [{
                    "name": "apps",
                    "description": "Applications on Kubernetes",
                    "recommendedVersion": "v0.2.0",
                    "optional": true,
                    "target": "tmc",
                    "artifacts": {
                      "v0.2.0": [{"image": "repo/apps:v0.2.0", "os": "linux", "arch": "amd64"}],
                      "v0.10.0": [{"uri": "https://dl.example.com/apps", "os": "darwin", "arch": "arm64"}]
                    }
                  }]
                }"#,
            )
            .create_async()
            .await;

        let plugins = discovery_for(&server).await.list().await.unwrap();
        mock.assert_async().await;

        assert_eq!(plugins.len(), 1);
        let apps = &plugins[0];
        assert_eq!(apps.name, "apps");
        assert_eq!(apps.target, Target::MissionControl);
        assert!(apps.optional);
        assert_eq!(apps.supported_versions, vec!["v0.2.0", "v0.10.0"]);
        assert_eq!(apps.source, "rest-source");
        assert_eq!(apps.discovery_type, DiscoveryType::Rest);
        assert_eq!(
            apps.distribution
                .artifact_for("v0.10.0", "darwin", "arm64")
                .unwrap()
                .uri,
            "https://dl.example.com/apps"
        );
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let d = RestDiscovery::new("r", "https://api.example.com/", "/v1/plugins").unwrap();
        assert_eq!(d.url(), "https://api.example.com/v1/plugins");
    }
}
