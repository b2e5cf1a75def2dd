use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result},
    serde::Deserialize,
    tracing::debug,
};

/// Environment variables recognized by [`Settings::resolve`].
pub mod env_keys {
    pub const CUSTOM_IMAGE_REPOSITORY: &str = "PLUGCTL_CUSTOM_IMAGE_REPOSITORY";
    pub const DISCOVERY_IMAGE_PATH: &str = "PLUGCTL_DEFAULT_STANDALONE_DISCOVERY_IMAGE_PATH";
    pub const DISCOVERY_IMAGE_TAG: &str = "PLUGCTL_DEFAULT_STANDALONE_DISCOVERY_IMAGE_TAG";
    pub const DISCOVERY_TYPE: &str = "PLUGCTL_DEFAULT_STANDALONE_DISCOVERY_TYPE";
    pub const DISCOVERY_LOCAL_PATH: &str = "PLUGCTL_DEFAULT_STANDALONE_DISCOVERY_LOCAL_PATH";
    pub const PRE_RELEASE_PLUGIN_REPO_IMAGE: &str = "PLUGCTL_PRE_RELEASE_PLUGIN_REPO_IMAGE";
    pub const ADDITIONAL_DISCOVERY_FOR_TESTING: &str = "PLUGCTL_ADDITIONAL_DISCOVERY_FOR_TESTING";
    pub const ALLOWED_REGISTRIES: &str = "PLUGCTL_ALLOWED_REGISTRIES";
    pub const CATALOG_CACHE_DIR: &str = "PLUGCTL_CATALOG_CACHE_DIR";
}

/// Build-time defaults, injected by packagers through the environment of `cargo build`.
mod builtin {
    macro_rules! build_env_or {
        ($key:literal, $default:expr) => {
            match option_env!($key) {
                Some(value) => value,
                None => $default,
            }
        };
    }

    pub const ALLOWED_PLUGIN_REPOSITORIES: &str =
        build_env_or!("PLUGCTL_BUILD_ALLOWED_PLUGIN_REPOSITORIES", "");
    pub const DISCOVERY_REPOSITORY: &str =
        build_env_or!("PLUGCTL_BUILD_DISCOVERY_REPOSITORY", "");
    pub const DISCOVERY_IMAGE_PATH: &str =
        build_env_or!("PLUGCTL_BUILD_DISCOVERY_IMAGE_PATH", "");
    pub const DISCOVERY_IMAGE_TAG: &str = build_env_or!("PLUGCTL_BUILD_DISCOVERY_IMAGE_TAG", "");
    pub const DISCOVERY_TYPE: &str = build_env_or!("PLUGCTL_BUILD_DISCOVERY_TYPE", "oci");
    pub const DISCOVERY_LOCAL_PATH: &str =
        build_env_or!("PLUGCTL_BUILD_DISCOVERY_LOCAL_PATH", "");
}

/// Central plugin discovery image shipped with every build.
pub const DEFAULT_CENTRAL_DISCOVERY_IMAGE: &str =
    "projects.registry.vmware.com/tanzu_cli/plugins/plugin-inventory:latest";

/// Name given to the default stand-alone discovery source.
pub const DEFAULT_STANDALONE_DISCOVERY_NAME: &str = "default";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Explicit overrides read from `config.toml`. Every field is optional and
/// wins over the environment when set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    pub allowed_plugin_repositories: Option<String>,
    pub discovery_repository: Option<String>,
    pub discovery_image_path: Option<String>,
    pub discovery_image_tag: Option<String>,
    pub discovery_type: Option<String>,
    pub discovery_local_path: Option<String>,
    pub custom_image_repository: Option<String>,
    pub pre_release_plugin_repo_image: Option<String>,
    pub additional_discovery_for_testing: Option<Vec<String>>,
    pub allowed_registries: Option<Vec<String>>,
    pub catalog_cache_dir: Option<PathBuf>,
}

impl SettingsFile {
    /// Read overrides from `path`. A missing file yields no overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            },
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            },
        };
        toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Comma-separated registries trusted regardless of the environment.
    pub allowed_plugin_repositories: String,
    pub discovery_repository: String,
    pub discovery_image_path: String,
    pub discovery_image_tag: String,
    pub discovery_type: String,
    pub discovery_local_path: String,
    pub custom_image_repository: Option<String>,
    pub pre_release_plugin_repo_image: Option<String>,
    pub additional_discovery_for_testing: Vec<String>,
    pub allowed_registries: Vec<String>,
    pub catalog_cache_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(&SettingsFile::default(), |_| None)
    }
}

impl Settings {
    /// Load `config.toml` from the user config dir and resolve it against the
    /// process environment.
    pub fn load() -> Result<Self> {
        let file = match config_dir() {
            Some(dir) => SettingsFile::load(&dir.join(CONFIG_FILE_NAME))?,
            None => SettingsFile::default(),
        };
        Ok(Self::resolve(&file, |key| std::env::var(key).ok()))
    }

    /// Resolve settings from explicit overrides and an environment lookup.
    ///
    /// Empty environment values count as unset.
    pub fn resolve(file: &SettingsFile, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let pick = |explicit: &Option<String>, key: &str, builtin: &str| {
            explicit
                .clone()
                .or_else(|| env(key))
                .unwrap_or_else(|| builtin.to_string())
        };

        let custom_image_repository = file
            .custom_image_repository
            .clone()
            .or_else(|| env(env_keys::CUSTOM_IMAGE_REPOSITORY));
        let pre_release_plugin_repo_image = file
            .pre_release_plugin_repo_image
            .clone()
            .or_else(|| env(env_keys::PRE_RELEASE_PLUGIN_REPO_IMAGE));
        let additional_discovery_for_testing = file
            .additional_discovery_for_testing
            .clone()
            .unwrap_or_else(|| {
                split_list(&env(env_keys::ADDITIONAL_DISCOVERY_FOR_TESTING).unwrap_or_default())
            });
        let allowed_registries = file.allowed_registries.clone().unwrap_or_else(|| {
            split_list(&env(env_keys::ALLOWED_REGISTRIES).unwrap_or_default())
        });
        let catalog_cache_dir = file
            .catalog_cache_dir
            .clone()
            .or_else(|| env(env_keys::CATALOG_CACHE_DIR).map(PathBuf::from))
            .unwrap_or_else(default_cache_dir);

        Self {
            allowed_plugin_repositories: file
                .allowed_plugin_repositories
                .clone()
                .unwrap_or_else(|| builtin::ALLOWED_PLUGIN_REPOSITORIES.to_string()),
            discovery_repository: file
                .discovery_repository
                .clone()
                .unwrap_or_else(|| builtin::DISCOVERY_REPOSITORY.to_string()),
            discovery_image_path: pick(
                &file.discovery_image_path,
                env_keys::DISCOVERY_IMAGE_PATH,
                builtin::DISCOVERY_IMAGE_PATH,
            ),
            discovery_image_tag: pick(
                &file.discovery_image_tag,
                env_keys::DISCOVERY_IMAGE_TAG,
                builtin::DISCOVERY_IMAGE_TAG,
            ),
            discovery_type: pick(
                &file.discovery_type,
                env_keys::DISCOVERY_TYPE,
                builtin::DISCOVERY_TYPE,
            ),
            discovery_local_path: pick(
                &file.discovery_local_path,
                env_keys::DISCOVERY_LOCAL_PATH,
                builtin::DISCOVERY_LOCAL_PATH,
            ),
            custom_image_repository,
            pre_release_plugin_repo_image,
            additional_discovery_for_testing,
            allowed_registries,
            catalog_cache_dir,
        }
    }

    /// Image reference of the default stand-alone discovery source.
    ///
    /// A custom image repository replaces the built-in repository.
    pub fn default_standalone_discovery_image(&self) -> String {
        let repository = self
            .custom_image_repository
            .as_deref()
            .unwrap_or(&self.discovery_repository);
        format!(
            "{}/{}:{}",
            repository.trim_matches('/'),
            self.discovery_image_path.trim_matches('/'),
            self.discovery_image_tag
        )
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "plugctl")
}

/// Directory holding `config.toml`.
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

fn default_cache_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".plugctl"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {super::*, std::collections::HashMap};

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn oci_file() -> SettingsFile {
        SettingsFile {
            discovery_repository: Some("fake.image.repo".into()),
            discovery_image_path: Some("package/standalone-plugins".into()),
            discovery_image_tag: Some("v1.0.0".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_image_from_explicit_values() {
        let settings = Settings::resolve(&oci_file(), |_| None);
        assert_eq!(
            settings.default_standalone_discovery_image(),
            "fake.image.repo/package/standalone-plugins:v1.0.0"
        );
    }

    #[test]
    fn test_environment_overrides_builtin() {
        let file = SettingsFile {
            discovery_repository: Some("fake.image.repo".into()),
            ..Default::default()
        };
        let env = env_from(&[
            (env_keys::CUSTOM_IMAGE_REPOSITORY, "env.fake.image.repo"),
            (env_keys::DISCOVERY_IMAGE_PATH, "package/env/standalone-plugins"),
            (env_keys::DISCOVERY_IMAGE_TAG, "v2.0.0"),
        ]);
        let settings = Settings::resolve(&file, env);
        assert_eq!(
            settings.default_standalone_discovery_image(),
            "env.fake.image.repo/package/env/standalone-plugins:v2.0.0"
        );
    }

    #[test]
    fn test_explicit_wins_over_environment() {
        let env = env_from(&[
            (env_keys::DISCOVERY_IMAGE_TAG, "v9.9.9"),
            (env_keys::CATALOG_CACHE_DIR, "/from/env"),
        ]);
        let mut file = oci_file();
        file.catalog_cache_dir = Some(PathBuf::from("/explicit"));
        let settings = Settings::resolve(&file, env);
        assert_eq!(settings.discovery_image_tag, "v1.0.0");
        assert_eq!(settings.catalog_cache_dir, PathBuf::from("/explicit"));
    }

    #[test]
    fn test_empty_environment_values_are_ignored() {
        let env = env_from(&[(env_keys::CUSTOM_IMAGE_REPOSITORY, "  ")]);
        let settings = Settings::resolve(&SettingsFile::default(), env);
        assert!(settings.custom_image_repository.is_none());
    }

    #[test]
    fn test_list_values_are_split_and_trimmed() {
        let env = env_from(&[
            (env_keys::ALLOWED_REGISTRIES, " c.com , ,d.com"),
            (
                env_keys::ADDITIONAL_DISCOVERY_FOR_TESTING,
                "test.repo/a:v1, other.repo/b:v2",
            ),
        ]);
        let settings = Settings::resolve(&SettingsFile::default(), env);
        assert_eq!(settings.allowed_registries, vec!["c.com", "d.com"]);
        assert_eq!(settings.additional_discovery_for_testing, vec![
            "test.repo/a:v1",
            "other.repo/b:v2"
        ]);
    }

    #[test]
    fn test_settings_file_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "discovery_type = \"local\"\ndiscovery_local_path = \"local/path\"\nallowed_registries = [\"x.io\"]\n",
        )
        .unwrap();
        let file = SettingsFile::load(&path).unwrap();
        assert_eq!(file.discovery_type.as_deref(), Some("local"));
        assert_eq!(file.allowed_registries, Some(vec!["x.io".to_string()]));
    }

    #[test]
    fn test_settings_file_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = SettingsFile::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(file, SettingsFile::default());
    }

    #[test]
    fn test_settings_file_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "bogus = 1\n").unwrap();
        assert!(SettingsFile::load(&path).is_err());
    }
}
