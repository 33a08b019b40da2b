//! In-memory store of the latest snapshot of every feed.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::engine::BoardInputs;
use crate::global::GlobalData;
use crate::realtime::{AlertsResponse, PredictionsResponse, ScheduleResponse, VehiclesResponse};

use super::error::FeedError;

/// The feeds a host can replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Global,
    Schedules,
    Predictions,
    Vehicles,
    Alerts,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Global => "global",
            FeedKind::Schedules => "schedules",
            FeedKind::Predictions => "predictions",
            FeedKind::Vehicles => "vehicles",
            FeedKind::Alerts => "alerts",
        }
    }
}

impl FromStr for FeedKind {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(FeedKind::Global),
            "schedules" => Ok(FeedKind::Schedules),
            "predictions" => Ok(FeedKind::Predictions),
            "vehicles" => Ok(FeedKind::Vehicles),
            "alerts" => Ok(FeedKind::Alerts),
            other => Err(FeedError::UnknownFeed(other.to_string())),
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One consistent view of every feed. Realtime feeds are `None` until
/// their first snapshot arrives.
#[derive(Debug, Clone, Default)]
pub struct FeedSet {
    pub global: Arc<GlobalData>,
    pub schedules: Option<Arc<ScheduleResponse>>,
    pub predictions: Option<Arc<PredictionsResponse>>,
    pub vehicles: Option<Arc<VehiclesResponse>>,
    pub alerts: Option<Arc<AlertsResponse>>,
}

impl FeedSet {
    /// Borrow this snapshot as input for a board pass.
    pub fn inputs(&self) -> BoardInputs<'_> {
        BoardInputs {
            global: &self.global,
            schedules: self.schedules.as_deref(),
            predictions: self.predictions.as_deref(),
            vehicles: self.vehicles.as_deref(),
            alerts: self.alerts.as_deref(),
        }
    }
}

/// Load and validate a static snapshot from a JSON file.
pub fn load_global(path: impl AsRef<Path>) -> Result<GlobalData, FeedError> {
    let json = std::fs::read_to_string(path.as_ref())?;
    let global: GlobalData = serde_json::from_str(&json)?;
    global.validate()?;
    tracing::info!(
        path = %path.as_ref().display(),
        stops = global.stops.len(),
        routes = global.routes.len(),
        patterns = global.route_patterns.len(),
        "loaded static data"
    );
    Ok(global)
}

/// Thread-safe holder of the latest [`FeedSet`].
///
/// Replacing a feed swaps its `Arc`, so snapshots already handed out keep
/// seeing the data they were taken with.
#[derive(Clone, Default)]
pub struct FeedStore {
    inner: Arc<RwLock<FeedSet>>,
}

impl FeedStore {
    /// Create a store holding `global` and no realtime feeds yet.
    pub fn new(global: GlobalData) -> Self {
        Self {
            inner: Arc::new(RwLock::new(FeedSet {
                global: Arc::new(global),
                ..FeedSet::default()
            })),
        }
    }

    /// Take a consistent snapshot of every feed.
    pub async fn snapshot(&self) -> FeedSet {
        self.inner.read().await.clone()
    }

    pub async fn replace_global(&self, global: GlobalData) {
        tracing::info!(stops = global.stops.len(), "replacing static data");
        self.inner.write().await.global = Arc::new(global);
    }

    pub async fn replace_schedules(&self, schedules: ScheduleResponse) {
        tracing::info!(schedules = schedules.schedules.len(), "replacing schedules");
        self.inner.write().await.schedules = Some(Arc::new(schedules));
    }

    pub async fn replace_predictions(&self, predictions: PredictionsResponse) {
        tracing::info!(
            predictions = predictions.predictions.len(),
            "replacing predictions"
        );
        self.inner.write().await.predictions = Some(Arc::new(predictions));
    }

    pub async fn replace_vehicles(&self, vehicles: VehiclesResponse) {
        tracing::info!(vehicles = vehicles.vehicles.len(), "replacing vehicles");
        self.inner.write().await.vehicles = Some(Arc::new(vehicles));
    }

    pub async fn replace_alerts(&self, alerts: AlertsResponse) {
        tracing::info!(alerts = alerts.alerts.len(), "replacing alerts");
        self.inner.write().await.alerts = Some(Arc::new(alerts));
    }

    /// Decode `body` as the JSON snapshot of `kind` and replace that feed.
    ///
    /// On failure the current snapshot is kept.
    pub async fn replace_json(&self, kind: FeedKind, body: &[u8]) -> Result<(), FeedError> {
        match kind {
            FeedKind::Global => {
                let global: GlobalData = serde_json::from_slice(body)?;
                global.validate()?;
                self.replace_global(global).await;
            }
            FeedKind::Schedules => self.replace_schedules(serde_json::from_slice(body)?).await,
            FeedKind::Predictions => {
                self.replace_predictions(serde_json::from_slice(body)?).await
            }
            FeedKind::Vehicles => self.replace_vehicles(serde_json::from_slice(body)?).await,
            FeedKind::Alerts => self.replace_alerts(serde_json::from_slice(body)?).await,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::global::fixtures::{GlobalBuilder, stop_id};

    fn global() -> GlobalData {
        let mut b = GlobalBuilder::new();
        b.stop("a", 42.35, -71.06);
        b.build()
    }

    #[test]
    fn feed_kind_parses_path_names() {
        for kind in [
            FeedKind::Global,
            FeedKind::Schedules,
            FeedKind::Predictions,
            FeedKind::Vehicles,
            FeedKind::Alerts,
        ] {
            assert_eq!(kind.as_str().parse::<FeedKind>().unwrap(), kind);
        }
        assert!(matches!(
            "trains".parse::<FeedKind>(),
            Err(FeedError::UnknownFeed(name)) if name == "trains"
        ));
    }

    #[tokio::test]
    async fn new_store_has_no_realtime_feeds() {
        let store = FeedStore::new(global());
        let set = store.snapshot().await;
        assert!(set.global.stops.contains_key(&stop_id("a")));
        assert!(set.schedules.is_none());
        assert!(set.predictions.is_none());
        assert!(set.vehicles.is_none());
        assert!(set.alerts.is_none());
    }

    #[tokio::test]
    async fn snapshots_survive_replacement() {
        let store = FeedStore::new(global());
        let before = store.snapshot().await;

        store.replace_global(GlobalData::default()).await;
        store.replace_alerts(AlertsResponse::default()).await;

        assert!(before.global.stops.contains_key(&stop_id("a")));
        assert!(before.alerts.is_none());
        let after = store.snapshot().await;
        assert!(after.global.stops.is_empty());
        assert!(after.alerts.is_some());
    }

    #[tokio::test]
    async fn replace_json_decodes_each_feed() {
        let store = FeedStore::new(global());
        store
            .replace_json(FeedKind::Schedules, br#"{"schedules": [], "trips": {}}"#)
            .await
            .unwrap();
        store
            .replace_json(FeedKind::Predictions, br#"{"predictions": []}"#)
            .await
            .unwrap();
        store
            .replace_json(FeedKind::Vehicles, br#"{"vehicles": {}}"#)
            .await
            .unwrap();
        store
            .replace_json(FeedKind::Alerts, br#"{"alerts": {}}"#)
            .await
            .unwrap();

        let set = store.snapshot().await;
        assert!(set.schedules.is_some());
        assert!(set.predictions.is_some());
        assert!(set.vehicles.is_some());
        assert!(set.alerts.is_some());
        let inputs = set.inputs();
        assert!(inputs.schedules.is_some() && inputs.alerts.is_some());
    }

    #[tokio::test]
    async fn rejected_snapshot_keeps_current() {
        let store = FeedStore::new(global());

        let err = store
            .replace_json(FeedKind::Alerts, b"not json")
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Json(_)));

        let dangling = br#"{"stops": {"p1": {"id": "p1", "name": "Platform",
            "latitude": 0.0, "longitude": 0.0, "parent_station_id": "gone"}}}"#;
        let err = store
            .replace_json(FeedKind::Global, dangling)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Invalid(_)));

        let set = store.snapshot().await;
        assert!(set.alerts.is_none());
        assert!(set.global.stops.contains_key(&stop_id("a")));
    }

    #[test]
    fn load_global_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&global()).unwrap()).unwrap();

        let loaded = load_global(file.path()).unwrap();
        assert_eq!(loaded.stops.len(), 1);
    }

    #[test]
    fn load_global_missing_file_fails() {
        let err = load_global("/nonexistent/global.json").unwrap_err();
        assert!(matches!(err, FeedError::Io(_)));
    }
}
