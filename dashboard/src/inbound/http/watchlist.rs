//! Watchlist HTTP handlers.
//!
//! ```text
//! GET    /api/v1/watchlist
//! GET    /api/v1/watchlist/coins
//! GET    /api/v1/watchlist/{coin}
//! PUT    /api/v1/watchlist/{coin}
//! DELETE /api/v1/watchlist/{coin}
//! ```
//!
//! Mutations always answer with the outcome body; the status code mirrors the
//! outcome kind so clients that ignore the body still see failures.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, delete, get, put, web};
use serde::Serialize;

use crate::domain::{CoinId, Error, OutcomeKind, WatchlistOutcome};
use crate::inbound::http::ApiResult;
use crate::inbound::http::error::invalid_field;
use crate::inbound::http::state::HttpState;

/// Membership answer for one coin.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipResponse {
    /// Coin asked about.
    pub coin: CoinId,
    /// Whether it is followed.
    pub in_watchlist: bool,
}

fn parse_coin(raw: String) -> Result<CoinId, Error> {
    CoinId::new(raw).map_err(|error| invalid_field("coin", error))
}

fn status_for(kind: OutcomeKind) -> StatusCode {
    match kind {
        OutcomeKind::Added | OutcomeKind::AlreadyPresent | OutcomeKind::Removed => StatusCode::OK,
        OutcomeKind::NotFound => StatusCode::NOT_FOUND,
        OutcomeKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        OutcomeKind::Syncing | OutcomeKind::InFlight => StatusCode::CONFLICT,
        OutcomeKind::RemoteFailure => StatusCode::BAD_GATEWAY,
    }
}

fn outcome_response(outcome: &WatchlistOutcome) -> HttpResponse {
    HttpResponse::build(status_for(outcome.kind())).json(outcome)
}

/// Phase, user, and followed coins.
#[get("/watchlist")]
pub async fn get_watchlist(state: web::Data<HttpState>) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header(("Cache-Control", "no-store"))
        .json(state.watchlist.snapshot())
}

/// Market rows for the followed coins, in market-cap order.
#[get("/watchlist/coins")]
pub async fn watched_coins(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let watchlist = state.watchlist.watchlist();
    let coins = state.markets.watched_coins(&watchlist).await?;
    Ok(HttpResponse::Ok().json(coins))
}

/// Whether one coin is followed.
#[get("/watchlist/{coin}")]
pub async fn get_membership(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let coin = parse_coin(path.into_inner())?;
    let in_watchlist = state.watchlist.is_in_watchlist(&coin);
    Ok(HttpResponse::Ok().json(MembershipResponse { coin, in_watchlist }))
}

/// Follow a coin.
#[put("/watchlist/{coin}")]
pub async fn add_coin(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let coin = parse_coin(path.into_inner())?;
    let outcome = state.watchlist.add_to_watchlist(coin).await;
    Ok(outcome_response(&outcome))
}

/// Stop following a coin.
#[delete("/watchlist/{coin}")]
pub async fn remove_coin(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let coin = parse_coin(path.into_inner())?;
    let outcome = state.watchlist.remove_from_watchlist(coin).await;
    Ok(outcome_response(&outcome))
}
