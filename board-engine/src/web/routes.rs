//! HTTP route handlers.

use std::collections::HashSet;

use axum::body::Bytes;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use chrono::Utc;

use crate::alerts::{AlertAssociatedStop, alerts_by_stop};
use crate::cards::{BoardRequest, Context};
use crate::domain::{EasternTime, Position, StopId};
use crate::engine::build_board;
use crate::feed::{FeedError, FeedKind};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/board", get(board))
        .route("/stops/:id/status", get(stop_status))
        .route("/feeds/:feed", put(replace_feed))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Parse an optional RFC 3339 instant, defaulting to the current time.
fn parse_at(at: Option<&str>) -> Result<EasternTime, AppError> {
    match at {
        Some(at) => EasternTime::parse_rfc3339(at).map_err(|e| AppError::BadRequest {
            message: format!("Invalid time {at}: {e}"),
        }),
        None => Ok(EasternTime::from_utc(Utc::now())),
    }
}

fn parse_context(context: Option<&str>) -> Result<Context, AppError> {
    match context {
        None | Some("nearby") => Ok(Context::NearbyTransit),
        Some("stop_details") => Ok(Context::StopDetailsUnfiltered),
        Some("stop_details_filtered") => Ok(Context::StopDetailsFiltered),
        Some("favorites") => Ok(Context::Favorites),
        Some(other) => Err(AppError::BadRequest {
            message: format!("Unknown context: {other}"),
        }),
    }
}

/// Build a departure board for the requested stops.
async fn board(
    State(state): State<AppState>,
    Query(query): Query<BoardQuery>,
) -> Result<Json<BoardResponse>, AppError> {
    let now = parse_at(query.at.as_deref())?;
    let context = parse_context(query.context.as_deref())?;

    let stop_ids = split_list(&query.stops)
        .map(|id| {
            StopId::new(id).map_err(|e| AppError::BadRequest {
                message: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if stop_ids.is_empty() {
        return Err(AppError::BadRequest {
            message: "No stops requested".to_string(),
        });
    }

    let position = match (query.lat, query.lon) {
        (Some(lat), Some(lon)) => Some(Position::new(lat, lon)),
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest {
                message: "lat and lon must be given together".to_string(),
            });
        }
    };

    let pinned: HashSet<String> = query
        .pinned
        .as_deref()
        .map(|p| split_list(p).map(str::to_string).collect())
        .unwrap_or_default();

    let request = BoardRequest {
        stop_ids,
        position,
        context,
        pinned,
        now,
    };

    let feeds = state.feeds.snapshot().await;
    let board = build_board(&request, feeds.inputs(), &state.config);

    Ok(Json(BoardResponse {
        at: now.local().to_rfc3339(),
        loading: board.is_none(),
        board,
    }))
}

/// Alert association for the station containing a stop.
async fn stop_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<AlertAssociatedStop>, AppError> {
    let now = parse_at(query.at.as_deref())?;
    let stop_id = StopId::new(&id).map_err(|e| AppError::BadRequest {
        message: e.to_string(),
    })?;

    let feeds = state.feeds.snapshot().await;
    let global = &feeds.global;
    let station = global.parent_stop(&stop_id).ok_or_else(|| AppError::NotFound {
        message: format!("Unknown stop: {id}"),
    })?;

    let active = feeds
        .alerts
        .as_deref()
        .map(|alerts| alerts.active(now))
        .unwrap_or_default();
    let status = alerts_by_stop(global, &active, now)
        .remove(&station.id)
        .unwrap_or_else(|| AlertAssociatedStop::unaffected(station.clone()));

    Ok(Json(status))
}

/// Replace one feed with the JSON snapshot in the request body.
async fn replace_feed(
    State(state): State<AppState>,
    Path(feed): Path<String>,
    body: Bytes,
) -> Result<Json<FeedReplaced>, AppError> {
    let kind: FeedKind = feed.parse()?;
    state.feeds.replace_json(kind, &body).await?;
    Ok(Json(FeedReplaced {
        feed: kind.to_string(),
    }))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Internal { message: String },
}

impl From<FeedError> for AppError {
    fn from(e: FeedError) -> Self {
        match e {
            FeedError::UnknownFeed(_) => AppError::NotFound {
                message: e.to_string(),
            },
            FeedError::Json(_) | FeedError::Invalid(_) => AppError::BadRequest {
                message: e.to_string(),
            },
            FeedError::Io(_) => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            tracing::error!(%status, %message, "request failed");
        } else {
            tracing::warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
