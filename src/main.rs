mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

use submerge::cache::{self, AvailabilityCache};
use submerge::config::{self, Config};
use submerge::providers::{
    OpenSubtitlesProvider, PodnapisiProvider, RateLimitCoordinator, SubtitleProvider,
};
use submerge::search::{EngineOptions, Resolver, SearchEngine};
use submerge::server::{self, AppContext};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "submerge=debug,tower_http=debug"
    } else {
        "submerge=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Start { host, port } => start_server(host, port, cli.config.as_deref()).await,
        Commands::Validate { config } => {
            let path = config.or(cli.config);
            match config::load_config_or_default(path.as_deref()) {
                Ok(_) => {
                    println!("Configuration is valid");
                    Ok(())
                }
                Err(e) => {
                    eprintln!("Configuration is invalid: {e:#}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Version => {
            println!("submerge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn start_server(host: String, port: u16, config_path: Option<&std::path::Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI overrides.
    config.server.host = host;
    config.server.port = port;

    tracing::info!("Starting submerge server");

    let limits = Arc::new(RateLimitCoordinator::new(Duration::from_secs(
        config.search.default_cooldown_secs,
    )));

    let providers = build_providers(&config, &limits);
    tracing::info!(
        providers = providers.len(),
        "Registered subtitle providers"
    );

    let availability = AvailabilityCache::load(
        config.cache.availability_path.clone(),
        Duration::from_secs(config.cache.availability_ttl_days * 24 * 3600),
    );

    let options = EngineOptions {
        results_ttl: Duration::from_secs(config.cache.results_ttl_secs),
        provider_timeout: Duration::from_secs(config.search.provider_timeout_secs),
        max_results: config.search.max_results,
        per_provider_cap: config
            .search
            .reduced_footprint
            .then_some(config.search.per_provider_cap),
    };

    let engine = Arc::new(SearchEngine::new(
        providers.clone(),
        availability.clone(),
        options,
    )?);
    let resolver = Arc::new(Resolver::new(
        &providers,
        Duration::from_secs(config.cache.resolution_ttl_secs),
    ));

    // Background maintenance: active eviction over the in-memory caches and
    // the dirty-state flush of the durable availability cache.
    let sweep_task = {
        let engine = engine.clone();
        let resolver = resolver.clone();
        let every = Duration::from_secs(config.cache.sweep_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = engine.sweep_expired() + resolver.sweep_expired();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired cache entries");
                }
            }
        })
    };
    let flush_task = cache::spawn_flush_task(
        availability.clone(),
        Duration::from_secs(config.cache.flush_interval_secs),
    );

    let ctx = AppContext {
        engine,
        resolver,
        config: Arc::new(config),
    };
    let result = server::start_server(ctx).await;

    tracing::info!("Shutting down...");
    sweep_task.abort();
    flush_task.abort();
    if let Err(e) = availability.flush() {
        tracing::warn!("Final availability flush failed: {e:#}");
    }

    result
}

fn build_providers(
    config: &Config,
    limits: &Arc<RateLimitCoordinator>,
) -> Vec<Arc<dyn SubtitleProvider>> {
    let mut providers: Vec<Arc<dyn SubtitleProvider>> = Vec::new();

    if config.providers.opensubtitles.enabled {
        providers.push(Arc::new(OpenSubtitlesProvider::new(
            &config.providers.opensubtitles,
            limits.clone(),
        )));
    }
    if config.providers.podnapisi.enabled {
        providers.push(Arc::new(PodnapisiProvider::new(
            &config.providers.podnapisi,
            limits.clone(),
        )));
    }

    providers
}
