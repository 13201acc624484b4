//! HTTP inbound adapter exposing REST endpoints.

pub mod error;
pub mod health;
pub mod markets;
pub mod session;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod watchlist;

use actix_web::web;

pub use error::ApiResult;

/// Register the `/api/v1` routes.
///
/// Literal segments are registered before their `{coin}` siblings so that
/// `/watchlist/coins` and `/markets/global` are not captured as coin ids.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(session::sign_up)
            .service(session::login)
            .service(session::logout)
            .service(session::current_session)
            .service(watchlist::get_watchlist)
            .service(watchlist::watched_coins)
            .service(watchlist::get_membership)
            .service(watchlist::add_coin)
            .service(watchlist::remove_coin)
            .service(markets::list_markets)
            .service(markets::search_markets)
            .service(markets::global_stats)
            .service(markets::coin_detail)
            .service(markets::coin_chart),
    );
}
