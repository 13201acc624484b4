//! End-to-end HTTP coverage over the in-memory adapters.

use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use async_trait::async_trait;
use dashboard::domain::ports::{
    IdentityProvider, MarketDataSource, MarketDataSourceError, WatchlistStore,
};
use dashboard::domain::{
    ChartData, Coin, CoinId, IdentitySync, MarketDataService, MarketListingQuery, MarketSettings,
    MarketStats, MutationPolicy, TimeFrame, WatchlistService, spawn_identity_sync,
};
use dashboard::inbound::http::configure_api;
use dashboard::inbound::http::state::HttpState;
use dashboard::outbound::memory::{InMemoryIdentityProvider, InMemoryWatchlistStore};
use mockable::DefaultClock;
use serde_json::{Value, json};

struct ListingOnlySource;

fn listed(id: &str, name: &str, symbol: &str, rank: u32) -> Coin {
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "symbol": symbol,
        "market_cap_rank": rank,
    }))
    .expect("coin fixture")
}

#[async_trait]
impl MarketDataSource for ListingOnlySource {
    async fn top_coins(
        &self,
        _query: &MarketListingQuery,
    ) -> Result<Vec<Coin>, MarketDataSourceError> {
        Ok(vec![
            listed("bitcoin", "Bitcoin", "btc", 1),
            listed("ethereum", "Ethereum", "eth", 2),
            listed("dogecoin", "Dogecoin", "doge", 8),
        ])
    }

    async fn global_stats(&self) -> Result<MarketStats, MarketDataSourceError> {
        Err(MarketDataSourceError::rate_limited("slow down"))
    }

    async fn market_chart(
        &self,
        _coin: &CoinId,
        _vs_currency: &str,
        _timeframe: TimeFrame,
    ) -> Result<ChartData, MarketDataSourceError> {
        Ok(ChartData::default())
    }
}

fn wire() -> (HttpState, IdentitySync) {
    let identity: Arc<dyn IdentityProvider> = Arc::new(InMemoryIdentityProvider::default());
    let store: Arc<dyn WatchlistStore> = Arc::new(InMemoryWatchlistStore::default());
    let watchlist = WatchlistService::new(store, MutationPolicy::Rollback);
    let sync = spawn_identity_sync(watchlist.clone(), identity.as_ref());
    let source: Arc<dyn MarketDataSource> = Arc::new(ListingOnlySource);
    let markets = MarketDataService::new(
        source,
        Arc::new(DefaultClock),
        MarketSettings::default(),
    );
    let state = HttpState::new(identity, Arc::new(watchlist), Arc::new(markets));
    (state, sync)
}

async fn wait_for_phase<S>(app: &S, phase: &str)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let request = actix_test::TestRequest::get()
                .uri("/api/v1/watchlist")
                .to_request();
            let body: Value = actix_test::call_and_read_body_json(app, request).await;
            if body["phase"] == phase {
                return;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("watchlist phase reached");
}

#[actix_web::test]
async fn sign_up_then_follow_and_unfollow_coins() {
    let (state, _sync) = wire();
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_api),
    )
    .await;

    let request = actix_test::TestRequest::put()
        .uri("/api/v1/watchlist/bitcoin")
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/session/signup")
        .set_json(json!({ "email": "ada@example.com", "password": "hunter22" }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    wait_for_phase(&app, "ready").await;

    for id in ["dogecoin", "bitcoin"] {
        let request = actix_test::TestRequest::put()
            .uri(&format!("/api/v1/watchlist/{id}"))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, request).await;
        assert_eq!(body["kind"], "added");
    }

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/watchlist/coins")
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;
    let ids: Vec<&str> = body
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|row| row["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["bitcoin", "dogecoin"]);

    let request = actix_test::TestRequest::delete()
        .uri("/api/v1/watchlist/dogecoin")
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;
    assert_eq!(body["kind"], "removed");

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/watchlist/dogecoin")
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;
    assert_eq!(body, json!({ "coin": "dogecoin", "inWatchlist": false }));

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/session/logout")
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    wait_for_phase(&app, "unauthenticated").await;

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/watchlist")
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;
    assert_eq!(body["items"], json!([]));
}

#[actix_web::test]
async fn membership_survives_sign_out_and_back_in() {
    let (state, _sync) = wire();
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_api),
    )
    .await;
    let credentials = json!({ "email": "ada@example.com", "password": "hunter22" });

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/session/signup")
        .set_json(&credentials)
        .to_request();
    actix_test::call_service(&app, request).await;
    wait_for_phase(&app, "ready").await;
    let request = actix_test::TestRequest::put()
        .uri("/api/v1/watchlist/ethereum")
        .to_request();
    actix_test::call_service(&app, request).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/session/logout")
        .to_request();
    actix_test::call_service(&app, request).await;
    wait_for_phase(&app, "unauthenticated").await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/session/login")
        .set_json(&credentials)
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    wait_for_phase(&app, "ready").await;

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/watchlist")
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;
    assert_eq!(body["items"], json!(["ethereum"]));
}

#[actix_web::test]
async fn market_failures_map_to_service_unavailable() {
    let (state, _sync) = wire();
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_api),
    )
    .await;

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/markets/global")
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["code"], "service_unavailable");
}
