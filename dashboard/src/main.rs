//! Dashboard entry-point: loads settings, wires adapters, and serves the API.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use dashboard::DashboardSettings;
use dashboard::domain::ports::{IdentityProvider, MarketDataSource, WatchlistStore};
use dashboard::domain::{IdentitySync, MarketDataService, WatchlistService, spawn_identity_sync};
use dashboard::inbound::http::configure_api;
use dashboard::inbound::http::health::{HealthState, live, ready};
use dashboard::inbound::http::state::HttpState;
use dashboard::outbound::coingecko::CoinGeckoHttpSource;
use dashboard::outbound::firestore::{FirestoreConfig, FirestoreWatchlistStore};
use dashboard::outbound::identity_toolkit::IdentityToolkitProvider;
use dashboard::outbound::memory::{InMemoryIdentityProvider, InMemoryWatchlistStore};

type Adapters = (Arc<dyn IdentityProvider>, Arc<dyn WatchlistStore>);

fn other_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(format!("{context}: {err}"))
}

fn identity_adapters(settings: &DashboardSettings) -> std::io::Result<Adapters> {
    let Some(project) = settings
        .hosted_project()
        .map_err(|e| other_error("invalid settings", e))?
    else {
        warn!("no hosted project configured; using in-memory identity and watchlist");
        return Ok((
            Arc::new(InMemoryIdentityProvider::default()),
            Arc::new(InMemoryWatchlistStore::default()),
        ));
    };

    let identity_url = settings
        .identity_base_url()
        .map_err(|e| other_error("invalid settings", e))?;
    let token_url = settings
        .token_base_url()
        .map_err(|e| other_error("invalid settings", e))?;
    let identity: Arc<dyn IdentityProvider> = Arc::new(
        IdentityToolkitProvider::new(
            identity_url,
            token_url,
            project.api_key,
            settings.request_timeout(),
            Arc::new(DefaultClock),
        )
        .map_err(|e| other_error("failed to build identity client", e))?,
    );
    let store_config = FirestoreConfig {
        base_url: settings
            .firestore_base_url()
            .map_err(|e| other_error("invalid settings", e))?,
        project_id: project.project_id,
        collection: settings.watchlist_collection().to_owned(),
        timeout: settings.request_timeout(),
    };
    let store: Arc<dyn WatchlistStore> = Arc::new(
        FirestoreWatchlistStore::new(store_config, Arc::clone(&identity))
            .map_err(|e| other_error("failed to build watchlist store client", e))?,
    );
    Ok((identity, store))
}

fn build_state(settings: &DashboardSettings) -> std::io::Result<(HttpState, IdentitySync)> {
    let (identity, store) = identity_adapters(settings)?;
    let policy = settings
        .mutation_policy()
        .map_err(|e| other_error("invalid settings", e))?;
    let watchlist = WatchlistService::new(store, policy);
    let sync = spawn_identity_sync(watchlist.clone(), identity.as_ref());

    let source: Arc<dyn MarketDataSource> = Arc::new(
        CoinGeckoHttpSource::new(
            settings
                .market_base_url()
                .map_err(|e| other_error("invalid settings", e))?,
            settings.market_api_key(),
            settings.request_timeout(),
        )
        .map_err(|e| other_error("failed to build market data client", e))?,
    );
    let markets = MarketDataService::new(
        source,
        Arc::new(DefaultClock),
        settings
            .market_settings()
            .map_err(|e| other_error("invalid settings", e))?,
    );

    let state = HttpState::new(identity, Arc::new(watchlist), Arc::new(markets));
    Ok((state, sync))
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings =
        DashboardSettings::load().map_err(|e| other_error("failed to load settings", e))?;
    let bind_addr = settings
        .bind_addr()
        .map_err(|e| other_error("invalid settings", e))?;
    let (state, sync) = build_state(&settings)?;

    let health_state = web::Data::new(HealthState::new());
    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(server_health_state.clone())
            .configure(configure_api)
            .service(ready)
            .service(live)
    })
    .bind(bind_addr)?;

    info!(%bind_addr, "dashboard listening");
    health_state.mark_ready();
    let result = server.run().await;
    health_state.mark_unhealthy();
    sync.unsubscribe();
    result
}
