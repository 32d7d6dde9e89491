use std::sync::Arc;

use models::{DashboardOutput, HeatmapOutput};
use refresh::{RefreshBus, SequencedStore};

/// Shared state behind every handler. Refresh jobs write the stores, handlers only read them.
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<SequencedStore<DashboardOutput>>,
    pub heatmap: Arc<SequencedStore<HeatmapOutput>>,
    pub bus: RefreshBus,
    pub default_zoom: i32,
}

impl AppState {
    pub fn new(bus: RefreshBus, default_zoom: i32) -> Self {
        Self {
            dashboard: Arc::new(SequencedStore::new("dashboard")),
            heatmap: Arc::new(SequencedStore::new("heatmap")),
            bus,
            default_zoom,
        }
    }
}
