use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use warp::Filter;
use warp::reply::Response;

use crate::error::{ServerError, respond};
use crate::websocket::rate_limiter::RateLimit;
use crate::websocket::{Broadcaster, ConnectionManager};
use clicker_persistence::{ClanRepository, GameRepository, TradeRepository};
use clicker_types::{
    ClanResponse, CreateClanRequest, JoinClanRequest, PlayerState, SaveAck, ServerMessage,
    TradeDraft, TradeResponse, TradeStatusRequest,
};

pub mod config;
pub mod error;
pub mod uploads;
pub mod websocket;

/// Largest JSON body accepted; a save carries the whole game history.
pub const MAX_JSON_BODY_BYTES: u64 = 4 * 1024 * 1024;

/// Repositories the HTTP handlers work against.
#[derive(Clone)]
pub struct Repositories {
    pub games: Arc<GameRepository>,
    pub clans: Arc<ClanRepository>,
    pub trades: Arc<TradeRepository>,
}

impl Repositories {
    pub fn new(database: &clicker_persistence::DatabaseManager) -> Self {
        Self {
            games: Arc::new(database.games()),
            clans: Arc::new(database.clans()),
            trades: Arc::new(database.trades()),
        }
    }
}

/// Where uploads land and how big they may be.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub max_bytes: u64,
}

pub fn create_routes(
    connection_manager: Arc<ConnectionManager>,
    repositories: Repositories,
    uploads: UploadSettings,
    rate_limit: RateLimit,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    // Clone for filters
    let connection_manager_filter = warp::any().map({
        let connection_manager = connection_manager.clone();
        move || connection_manager.clone()
    });

    let games_filter = warp::any().map({
        let games = repositories.games.clone();
        move || games.clone()
    });

    let clans_filter = warp::any().map({
        let clans = repositories.clans.clone();
        move || clans.clone()
    });

    let trades_filter = warp::any().map({
        let trades = repositories.trades.clone();
        move || trades.clone()
    });

    let upload_dir_filter = warp::any().map({
        let dir = uploads.dir.clone();
        move || dir.clone()
    });

    let json_body = || warp::body::content_length_limit(MAX_JSON_BODY_BYTES);

    // WebSocket endpoint
    let websocket = warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(connection_manager_filter.clone())
        .map(move |ws: warp::ws::Ws, conn_mgr| {
            ws.on_upgrade(move |socket| websocket::handle_connection(socket, conn_mgr, rate_limit))
        });

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    let get_game = warp::path!("game" / String)
        .and(warp::get())
        .and(games_filter.clone())
        .and_then(handle_get_game);

    let save_game = warp::path!("game" / String)
        .and(warp::post())
        .and(json_body())
        .and(warp::body::json())
        .and(games_filter.clone())
        .and_then(handle_save_game);

    let history = warp::path!("history" / String)
        .and(warp::get())
        .and(games_filter)
        .and_then(handle_history);

    let list_clans = warp::path!("clans")
        .and(warp::get())
        .and(clans_filter.clone())
        .and_then(handle_list_clans);

    let create_clan = warp::path!("clans")
        .and(warp::post())
        .and(json_body())
        .and(warp::body::json())
        .and(clans_filter.clone())
        .and_then(handle_create_clan);

    let join_clan = warp::path!("clans" / String / "join")
        .and(warp::post())
        .and(json_body())
        .and(warp::body::json())
        .and(clans_filter)
        .and_then(handle_join_clan);

    let list_trades = warp::path!("trades")
        .and(warp::get())
        .and(trades_filter.clone())
        .and_then(handle_list_trades);

    let create_trade = warp::path!("trades")
        .and(warp::post())
        .and(json_body())
        .and(warp::body::json())
        .and(trades_filter.clone())
        .and(connection_manager_filter.clone())
        .and_then(handle_create_trade);

    let trade_status = warp::path!("trades" / String / "status")
        .and(warp::post())
        .and(json_body())
        .and(warp::body::json())
        .and(trades_filter)
        .and(connection_manager_filter)
        .and_then(handle_trade_status);

    let upload = warp::path!("upload")
        .and(warp::post())
        .and(warp::multipart::form().max_length(uploads.max_bytes))
        .and(upload_dir_filter)
        .and_then(handle_upload);

    let api = warp::path("api").and(
        get_game
            .or(save_game)
            .or(history)
            .or(list_clans)
            .or(create_clan)
            .or(join_clan)
            .or(list_trades)
            .or(create_trade)
            .or(trade_status)
            .or(upload),
    );

    let uploaded_files = warp::path("uploads").and(warp::fs::dir(uploads.dir));

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST"]);

    websocket
        .or(health)
        .or(api)
        .or(uploaded_files)
        .with(cors)
        .with(warp::log("clicker"))
}

async fn handle_get_game(
    player_id: String,
    games: Arc<GameRepository>,
) -> Result<Response, warp::Rejection> {
    let result = games.load_or_create(&player_id).await.map_err(ServerError::from);
    Ok(respond(result))
}

async fn handle_save_game(
    player_id: String,
    mut state: PlayerState,
    games: Arc<GameRepository>,
) -> Result<Response, warp::Rejection> {
    if state.player_id.is_empty() {
        state.player_id = player_id.clone();
    }

    let result = games
        .save(&player_id, state)
        .await
        .map(|last_saved| SaveAck {
            success: true,
            message: "Game saved successfully".to_string(),
            last_saved,
        })
        .map_err(ServerError::from);
    Ok(respond(result))
}

async fn handle_history(
    player_id: String,
    games: Arc<GameRepository>,
) -> Result<Response, warp::Rejection> {
    Ok(respond(games.history(&player_id).await.map_err(ServerError::from)))
}

async fn handle_list_clans(clans: Arc<ClanRepository>) -> Result<Response, warp::Rejection> {
    Ok(respond(clans.list().await.map_err(ServerError::from)))
}

async fn handle_create_clan(
    request: CreateClanRequest,
    clans: Arc<ClanRepository>,
) -> Result<Response, warp::Rejection> {
    let result = clans
        .create(&request.name, &request.player_id, &request.player_name)
        .await
        .map(|clan| ClanResponse {
            success: true,
            clan,
        })
        .map_err(ServerError::from);
    Ok(respond(result))
}

async fn handle_join_clan(
    clan_id: String,
    request: JoinClanRequest,
    clans: Arc<ClanRepository>,
) -> Result<Response, warp::Rejection> {
    let result = clans
        .join(&clan_id, &request.player_id, &request.player_name)
        .await
        .map(|clan| ClanResponse {
            success: true,
            clan,
        })
        .map_err(ServerError::from);
    Ok(respond(result))
}

async fn handle_list_trades(trades: Arc<TradeRepository>) -> Result<Response, warp::Rejection> {
    Ok(respond(trades.list().await.map_err(ServerError::from)))
}

async fn handle_create_trade(
    draft: TradeDraft,
    trades: Arc<TradeRepository>,
    broadcaster: Arc<ConnectionManager>,
) -> Result<Response, warp::Rejection> {
    let trade = match trades.create(draft).await {
        Ok(trade) => trade,
        Err(e) => return Ok(ServerError::from(e).into_response()),
    };

    let notified = broadcaster
        .publish_global(ServerMessage::NewTrade(trade.clone()))
        .await;
    info!("New trade {} announced to {} connections", trade.id, notified);

    Ok(respond(Ok(TradeResponse {
        success: true,
        trade,
    })))
}

async fn handle_trade_status(
    trade_id: String,
    request: TradeStatusRequest,
    trades: Arc<TradeRepository>,
    broadcaster: Arc<ConnectionManager>,
) -> Result<Response, warp::Rejection> {
    let trade = match trades.update_status(&trade_id, request.status).await {
        Ok(trade) => trade,
        Err(e) => return Ok(ServerError::from(e).into_response()),
    };

    match serde_json::to_value(&trade) {
        Ok(payload) => {
            broadcaster
                .publish_global(ServerMessage::TradeUpdate(payload))
                .await;
        }
        Err(e) => tracing::error!("Could not encode trade {} update: {}", trade.id, e),
    }

    Ok(respond(Ok(TradeResponse {
        success: true,
        trade,
    })))
}

async fn handle_upload(
    form: warp::multipart::FormData,
    upload_dir: PathBuf,
) -> Result<Response, warp::Rejection> {
    Ok(respond(uploads::store_upload(form, &upload_dir).await))
}
