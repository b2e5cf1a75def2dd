//! Registries and artifact locations plugins may be fetched from.
//!
//! Everything here is computed from [`Settings`] alone; nothing touches the
//! network. The installer consults these sets before pulling an artifact.

use crate::settings::{DEFAULT_CENTRAL_DISCOVERY_IMAGE, Settings, split_list};

/// Bucket that hosted the legacy advanced plugins.
const ADVANCED_PLUGINS_BUCKET: &str = "tanzu-cli-advanced-plugins";

/// Artifact repository for mission-control plugins.
pub const DEFAULT_TMC_PLUGINS_ARTIFACT_REPOSITORY: &str =
    "https://tmc-cli.s3-us-west-2.amazonaws.com/plugins/artifacts";

/// Hostname of an image reference such as `registry.io:5000/path/image:tag`.
pub fn image_hostname(image: &str) -> Option<String> {
    url::Url::parse(&format!("https://{image}"))
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// HTTPS prefix of a legacy plugin bucket.
pub fn gcp_bucket_uri(bucket: &str) -> String {
    format!("https://storage.googleapis.com/{bucket}/")
}

/// Registries trusted for downloading plugins.
pub fn trusted_registries(settings: &Settings) -> Vec<String> {
    let mut registries = split_list(&settings.allowed_plugin_repositories);

    if let Some(repo) = &settings.custom_image_repository {
        registries.push(repo.clone());
    }

    if let Some(host) = settings
        .pre_release_plugin_repo_image
        .as_deref()
        .and_then(image_hostname)
    {
        registries.push(host);
    }

    registries.extend(image_hostname(DEFAULT_CENTRAL_DISCOVERY_IMAGE));

    registries.extend(
        settings
            .additional_discovery_for_testing
            .iter()
            .filter_map(|image| image_hostname(image)),
    );

    registries.extend(settings.allowed_registries.iter().cloned());
    registries
}

/// URI prefixes trusted for downloading plugin artifacts directly.
pub fn trusted_artifact_locations() -> Vec<String> {
    vec![
        gcp_bucket_uri(ADVANCED_PLUGINS_BUCKET),
        DEFAULT_TMC_PLUGINS_ARTIFACT_REPOSITORY.to_string(),
    ]
}

/// Whether `image` comes from one of `registries`.
///
/// An entry matches either the image hostname exactly or a leading path
/// segment prefix (`my.registry/team`).
pub fn is_trusted_image(image: &str, registries: &[String]) -> bool {
    let host = image_hostname(image);
    registries.iter().any(|registry| {
        let registry = registry.trim_end_matches('/');
        host.as_deref() == Some(registry) || image.starts_with(&format!("{registry}/"))
    })
}

/// Whether `uri` lives under one of the trusted artifact locations.
pub fn is_trusted_artifact_uri(uri: &str) -> bool {
    trusted_artifact_locations()
        .iter()
        .any(|prefix| uri.starts_with(prefix.as_str()))
}
