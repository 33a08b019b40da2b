//! One pure pass from feed snapshots to a board.
//!
//! Nothing here locks, fetches or caches: callers hand in whatever
//! snapshots they hold and get back a freshly built [`BoardOutput`].

use std::collections::{BTreeMap, HashSet};

use crate::alerts::{AlertAssociatedStop, AlertSummary, alerts_by_stop};
use crate::cards::{
    BoardRequest, FeedSources, LeafFormat, RouteCard, Tile, route_cards_for_stop_list,
};
use crate::config::EngineConfig;
use crate::domain::StopId;
use crate::global::GlobalData;
use crate::realtime::{
    AlertsResponse, PredictionsResponse, ScheduleResponse, VehiclesResponse,
};

/// Snapshots for one pass. `None` marks a feed that has not arrived.
#[derive(Debug, Clone, Copy)]
pub struct BoardInputs<'a> {
    pub global: &'a GlobalData,
    pub schedules: Option<&'a ScheduleResponse>,
    pub predictions: Option<&'a PredictionsResponse>,
    /// Overrides the vehicles bundled with predictions when present.
    pub vehicles: Option<&'a VehiclesResponse>,
    pub alerts: Option<&'a AlertsResponse>,
}

/// A leaf formatted for display, addressed by card, stop and direction.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FormattedLeaf {
    pub card_id: String,
    pub stop_id: StopId,
    pub direction_id: u8,
    pub format: LeafFormat,
    /// Where and until when the leaf's most prominent alert applies.
    pub alert_summary: Option<AlertSummary>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BoardOutput {
    pub cards: Vec<RouteCard>,
    /// Alert association for the requested stations that have alerts.
    pub stop_status: BTreeMap<StopId, AlertAssociatedStop>,
    pub leaves: Vec<FormattedLeaf>,
    pub tiles: Vec<Tile>,
}

/// Build a board, or `None` while predictions or alerts are loading.
pub fn build_board(
    request: &BoardRequest,
    inputs: BoardInputs<'_>,
    config: &EngineConfig,
) -> Option<BoardOutput> {
    let global = inputs.global;
    let now = request.now;

    let merged;
    let predictions = match (inputs.predictions, inputs.vehicles) {
        (Some(predictions), Some(vehicles)) => {
            merged = PredictionsResponse::new(
                predictions.predictions.clone(),
                predictions.trips.clone(),
                vehicles.vehicles.clone(),
            );
            Some(&merged)
        }
        (predictions, _) => predictions,
    };

    let cards = route_cards_for_stop_list(
        request,
        FeedSources {
            global,
            schedules: inputs.schedules,
            predictions,
            alerts: inputs.alerts,
        },
        config,
    )?;

    let requested: HashSet<StopId> = global
        .resolved_parent_to_all_stops(&request.stop_ids)
        .into_iter()
        .map(|family| family.stop.id)
        .collect();
    let active = inputs.alerts.map(|a| a.active(now)).unwrap_or_default();
    let stop_status: BTreeMap<StopId, AlertAssociatedStop> = alerts_by_stop(global, &active, now)
        .into_iter()
        .filter(|(id, _)| requested.contains(id))
        .collect();

    let mut leaves = Vec::new();
    let mut tiles = Vec::new();
    for card in &cards {
        for stop in &card.stop_data {
            for leaf in &stop.data {
                let format = leaf.format(now, global, config);
                tiles.extend(format.tiles());
                let patterns: Vec<_> = leaf.route_patterns.iter().collect();
                let alert_summary = leaf
                    .major_alert()
                    .or_else(|| leaf.secondary_alert())
                    .and_then(|alert| {
                        AlertSummary::summarizing(
                            alert,
                            &stop.stop.id,
                            leaf.direction_id,
                            &patterns,
                            now,
                            global,
                            config,
                        )
                    });
                leaves.push(FormattedLeaf {
                    card_id: card.id().to_string(),
                    stop_id: stop.stop.id.clone(),
                    direction_id: leaf.direction_id,
                    format,
                    alert_summary,
                });
            }
        }
    }

    tracing::debug!(
        cards = cards.len(),
        leaves = leaves.len(),
        tiles = tiles.len(),
        "built board"
    );
    Some(BoardOutput {
        cards,
        stop_status,
        leaves,
        tiles,
    })
}
