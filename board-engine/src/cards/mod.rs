//! Route cards: departures for a set of stops grouped by line or route,
//! stop and direction, then formatted into rows.

mod builder;
mod format;
pub(crate) mod route_card;
mod tiles;

pub use builder::{BoardRequest, FeedSources, route_cards_for_stop_list};
pub use format::{BranchRow, LeafFormat, NoTripsFormat, SecondaryAlert, UpcomingFormat};
pub use route_card::{
    Context, GroupedLine, Leaf, LineOrRoute, RouteCard, RouteStopData, filter_stops_by_patterns,
};
pub use tiles::Tile;
