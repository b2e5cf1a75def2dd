use std::path::PathBuf;

use {
    anyhow::{Context, Result},
    clap::{Parser, Subcommand},
    plugctl_catalog::{CatalogStore, ContextCatalog},
    plugctl_common::{PluginInfo, Target},
    plugctl_config::{
        DiscoverySource, LocalSource, RestSource, Settings, default_standalone_discovery, env_keys,
        trusted_artifact_locations, trusted_registries,
    },
    plugctl_discovery::{Collaborators, discover_all, from_sources},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
    tracing_subscriber::EnvFilter,
};

#[derive(Parser)]
#[command(name = "plugctl", about = "Discover, catalog and vet CLI plugins", version)]
struct Cli {
    /// Log filter directives, e.g. `debug` or `plugctl_catalog=trace`.
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,

    /// Catalog cache directory (overrides configuration).
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and edit the installed-plugin catalog.
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Print the registries and artifact locations plugins may be fetched from.
    Trust,
    /// List plugins offered by discovery sources.
    Discover {
        #[command(subcommand)]
        source: DiscoverSource,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List plugins active in a scope.
    List {
        /// Server context; stand-alone scope when omitted.
        #[arg(long, default_value = "")]
        context: String,
    },
    /// Show one plugin by key (`name` or `name_target`).
    Get {
        key: String,
        #[arg(long, default_value = "")]
        context: String,
    },
    /// Record an installed plugin as active.
    Add {
        name: String,
        version: String,
        /// Absolute path of the installed binary.
        #[arg(long)]
        path: String,
        #[arg(long, default_value = "")]
        target: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Discovery source the plugin came from.
        #[arg(long, default_value = "")]
        discovery: String,
        #[arg(long, default_value = "")]
        context: String,
    },
    /// Deactivate a plugin in a scope.
    Delete {
        key: String,
        #[arg(long, default_value = "")]
        context: String,
    },
    /// Remove the catalog cache.
    Clean,
    /// Re-save the catalog in the current format.
    Refresh,
}

#[derive(Subcommand)]
enum DiscoverSource {
    /// Plugins from the default stand-alone discovery source (local type only).
    Default,
    /// Plugin manifests in a local directory.
    Local {
        path: String,
        #[arg(long, default_value = "local")]
        name: String,
    },
    /// A plugin REST API.
    Rest {
        endpoint: String,
        base_path: String,
        #[arg(long, default_value = "rest")]
        name: String,
    },
}

fn init_tracing(filter: &str, json: bool) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn store_for(settings: &Settings, cache_dir: Option<PathBuf>) -> CatalogStore {
    match cache_dir {
        Some(dir) => CatalogStore::new(dir),
        None => CatalogStore::from_settings(settings),
    }
}

fn open_catalog(store: CatalogStore, context: &str) -> Result<ContextCatalog> {
    let path = store.path();
    ContextCatalog::open(store, context)
        .with_context(|| format!("failed to open plugin catalog {}", path.display()))
}

fn run_catalog(action: CatalogAction, store: CatalogStore) -> Result<()> {
    match action {
        CatalogAction::List { context } => {
            let catalog = open_catalog(store, &context)?;
            let mut plugins = catalog.list();
            plugins.sort_by(|a, b| a.key().cmp(&b.key()));
            print_json(&plugins)
        },
        CatalogAction::Get { key, context } => {
            let catalog = open_catalog(store, &context)?;
            match catalog.get(&key) {
                Some(plugin) => print_json(&plugin),
                None => anyhow::bail!("plugin {key} is not active in {}", catalog.scope()),
            }
        },
        CatalogAction::Add {
            name,
            version,
            path,
            target,
            description,
            discovery,
            context,
        } => {
            let mut catalog = open_catalog(store, &context)?;
            let plugin = PluginInfo {
                name,
                description,
                version,
                installation_path: path,
                discovery,
                target: Target::from(target.as_str()),
                ..Default::default()
            };
            catalog.upsert(&plugin)?;
            info!(key = %plugin.key(), scope = %catalog.scope(), "plugin recorded");
            Ok(())
        },
        CatalogAction::Delete { key, context } => {
            let mut catalog = open_catalog(store, &context)?;
            catalog.delete(&key)?;
            info!(%key, scope = %catalog.scope(), "plugin deactivated");
            Ok(())
        },
        CatalogAction::Clean => {
            store.clean()?;
            info!(path = %store.path().display(), "catalog cache removed");
            Ok(())
        },
        CatalogAction::Refresh => {
            store.refresh()?;
            Ok(())
        },
    }
}

fn run_trust(settings: &Settings) -> Result<()> {
    print_json(&serde_json::json!({
        "registries": trusted_registries(settings),
        "artifactLocations": trusted_artifact_locations(),
    }))
}

/// The configured default stand-alone source, if this binary can list it.
///
/// OCI images need a registry client that the command line does not ship.
fn standalone_source(settings: &Settings) -> Result<DiscoverySource> {
    match default_standalone_discovery(settings) {
        DiscoverySource::Local(local) if local.path.trim().is_empty() => anyhow::bail!(
            "the default discovery source is local but no path is configured; set {}",
            env_keys::DISCOVERY_LOCAL_PATH
        ),
        DiscoverySource::Local(local) => Ok(DiscoverySource::Local(local)),
        other => anyhow::bail!(
            "the default discovery source is {} ({}), which this command cannot list; set {}=local \
             and {}, or use `discover local`",
            other.discovery_type(),
            settings.default_standalone_discovery_image(),
            env_keys::DISCOVERY_TYPE,
            env_keys::DISCOVERY_LOCAL_PATH
        ),
    }
}

async fn run_discover(source: DiscoverSource, settings: &Settings) -> Result<()> {
    let source = match source {
        DiscoverSource::Default => standalone_source(settings)?,
        DiscoverSource::Local { path, name } => DiscoverySource::Local(LocalSource { name, path }),
        DiscoverSource::Rest {
            endpoint,
            base_path,
            name,
        } => DiscoverySource::Rest(RestSource {
            name,
            endpoint,
            base_path,
        }),
    };
    debug!(source = source.name(), kind = %source.discovery_type(), "discovering plugins");

    let backends = from_sources(std::slice::from_ref(&source), &Collaborators::default())?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling discovery");
            on_interrupt.cancel();
        }
    });

    let mut discovered = Vec::new();
    for listing in discover_all(&backends, &cancel).await {
        let plugins = listing
            .result
            .with_context(|| format!("discovery source {} failed", listing.source))?;
        discovered.extend(plugins);
    }
    print_json(&discovered)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    let settings = Settings::load().context("failed to load configuration")?;
    debug!(cache_dir = %settings.catalog_cache_dir.display(), "configuration loaded");

    match cli.command {
        Commands::Catalog { action } => run_catalog(action, store_for(&settings, cli.cache_dir)),
        Commands::Trust => run_trust(&settings),
        Commands::Discover { source } => run_discover(source, &settings).await,
    }
}
