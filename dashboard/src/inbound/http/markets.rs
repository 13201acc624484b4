//! Market data HTTP handlers.
//!
//! ```text
//! GET /api/v1/markets?page=1&perPage=40
//! GET /api/v1/markets/search?q=bit
//! GET /api/v1/markets/global
//! GET /api/v1/markets/{coin}
//! GET /api/v1/markets/{coin}/chart?timeframe=7d
//! ```

use actix_web::{HttpResponse, get, web};
use serde::{Deserialize, Serialize};

use crate::domain::{ChartData, CoinId, Error, TimeFrame};
use crate::inbound::http::ApiResult;
use crate::inbound::http::error::invalid_field;
use crate::inbound::http::state::HttpState;

const MARKET_CACHE_CONTROL: &str = "public, max-age=30";

/// Paging parameters for the listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingParams {
    /// One-based page, defaults to 1.
    pub page: Option<u32>,
    /// Rows per page, defaults to the configured size.
    pub per_page: Option<u32>,
}

/// Search term.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// Substring matched against name and symbol.
    #[serde(default)]
    pub q: String,
}

/// Chart window selection.
#[derive(Debug, Default, Deserialize)]
pub struct ChartParams {
    /// One of `24h`, `7d`, `30d`, `90d`, `1y`; defaults to `7d`.
    pub timeframe: Option<String>,
}

/// Chart series plus the window they cover.
#[derive(Debug, Serialize)]
pub struct ChartResponse {
    /// Coin charted.
    pub coin: CoinId,
    /// Window covered.
    pub timeframe: TimeFrame,
    /// Series data.
    #[serde(flatten)]
    pub data: ChartData,
}

fn parse_coin(raw: String) -> Result<CoinId, Error> {
    CoinId::new(raw).map_err(|error| invalid_field("coin", error))
}

fn parse_timeframe(raw: Option<&str>) -> Result<TimeFrame, Error> {
    match raw {
        Some(value) => value
            .parse::<TimeFrame>()
            .map_err(|error| invalid_field("timeframe", error)),
        None => Ok(TimeFrame::default()),
    }
}

fn cached_json(body: impl Serialize) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header(("Cache-Control", MARKET_CACHE_CONTROL))
        .json(body)
}

/// One page of the market listing.
#[get("/markets")]
pub async fn list_markets(
    state: web::Data<HttpState>,
    params: web::Query<ListingParams>,
) -> ApiResult<HttpResponse> {
    let page = params.page.unwrap_or(1);
    let per_page = params
        .per_page
        .unwrap_or(state.markets.settings().per_page);
    let coins = state.markets.top_coins(page, per_page).await?;
    Ok(cached_json(coins))
}

/// Listing rows matching a search term.
#[get("/markets/search")]
pub async fn search_markets(
    state: web::Data<HttpState>,
    params: web::Query<SearchParams>,
) -> ApiResult<HttpResponse> {
    let coins = state.markets.search(&params.q).await?;
    Ok(cached_json(coins))
}

/// Global market statistics.
#[get("/markets/global")]
pub async fn global_stats(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let stats = state.markets.global_stats().await?;
    Ok(cached_json(stats))
}

/// One coin from the listing.
#[get("/markets/{coin}")]
pub async fn coin_detail(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let coin = parse_coin(path.into_inner())?;
    let detail = state.markets.find_coin(&coin).await?;
    Ok(cached_json(detail))
}

/// Historical series for one coin.
#[get("/markets/{coin}/chart")]
pub async fn coin_chart(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    params: web::Query<ChartParams>,
) -> ApiResult<HttpResponse> {
    let coin = parse_coin(path.into_inner())?;
    let timeframe = parse_timeframe(params.timeframe.as_deref())?;
    let data = state.markets.chart(&coin, timeframe).await?;
    Ok(cached_json(ChartResponse {
        coin,
        timeframe,
        data,
    }))
}
