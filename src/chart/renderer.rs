//! Chart renderer - owns one chart per grid and refreshes it from the positions endpoint

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, error, info};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::api::client::GridApi;
use crate::api::types::GridId;
use crate::dashboard::listener::{ViewListener, ViewUpdate};
use crate::dashboard::page::PageLayout;
use crate::errors::DashboardError;

use super::series::{GridChart, GridInfo, GridStatsDisplay};

/// What a chart refresh did
#[derive(Debug)]
pub enum RefreshOutcome {
    /// The snapshot was drawn
    Applied,
    /// The card has no chart mount point
    NoMount,
    /// No chart registered for the grid
    NotInitialized,
    /// The snapshot carried no levels; the chart was left as is
    NoLevels,
    /// A newer refresh was started while this one was in flight
    Stale,
    Failed(DashboardError),
}

impl RefreshOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RefreshOutcome::Applied)
    }
}

/// Everything drawn for one grid
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChartView {
    pub chart: GridChart,
    pub info: GridInfo,
    /// Present when the card has a stats container
    pub display: Option<GridStatsDisplay>,
}

/// Registry entry for an initialized chart
struct ChartHandle {
    view: ChartView,
    /// Token of the most recently started refresh
    latest_token: u64,
}

/// Chart registry keyed by grid id
///
/// Cloning yields another handle onto the same registry.
pub struct ChartRenderer<A: GridApi> {
    api: Arc<A>,
    charts: Arc<RwLock<HashMap<GridId, ChartHandle>>>,
    generation: Arc<AtomicU64>,
    layout: Arc<RwLock<PageLayout>>,
    listener: Arc<dyn ViewListener>,
}

impl<A: GridApi> Clone for ChartRenderer<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            charts: self.charts.clone(),
            generation: self.generation.clone(),
            layout: self.layout.clone(),
            listener: self.listener.clone(),
        }
    }
}

impl<A: GridApi> ChartRenderer<A> {
    pub fn new(api: Arc<A>, layout: Arc<RwLock<PageLayout>>, listener: Arc<dyn ViewListener>) -> Self {
        Self {
            api,
            charts: Arc::new(RwLock::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
            layout,
            listener,
        }
    }

    /// Create the chart of a grid, replacing any existing one, and draw it
    pub async fn init_grid_chart(&self, grid_id: GridId) -> RefreshOutcome {
        let stats_container = {
            let layout = self.layout.read().await;
            match layout.card(grid_id) {
                Some(card) if card.chart_mount => card.stats_container,
                _ => {
                    debug!("grid {}: no chart mount, skipping", grid_id);
                    return RefreshOutcome::NoMount;
                }
            }
        };

        let handle = ChartHandle {
            view: ChartView {
                display: stats_container.then(GridStatsDisplay::default),
                ..ChartView::default()
            },
            latest_token: 0,
        };
        if self.charts.write().await.insert(grid_id, handle).is_some() {
            info!("grid {}: replacing existing chart", grid_id);
        }

        self.update_grid_chart(grid_id).await
    }

    /// Fetch the latest snapshot of a grid and redraw its chart
    pub async fn update_grid_chart(&self, grid_id: GridId) -> RefreshOutcome {
        let token = {
            let mut charts = self.charts.write().await;
            let Some(handle) = charts.get_mut(&grid_id) else {
                return RefreshOutcome::NotInitialized;
            };
            let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            handle.latest_token = token;
            token
        };

        let result = self.api.grid_positions(grid_id).await;

        let updates = {
            let mut charts = self.charts.write().await;
            let Some(handle) = charts.get_mut(&grid_id) else {
                debug!("grid {}: chart removed during refresh", grid_id);
                return RefreshOutcome::NotInitialized;
            };
            if handle.latest_token != token {
                debug!(
                    "grid {}: discarding stale snapshot (token {}, latest {})",
                    grid_id, token, handle.latest_token
                );
                return RefreshOutcome::Stale;
            }

            let snapshot = match result {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    error!("Error updating grid chart {}: {}", grid_id, e);
                    return RefreshOutcome::Failed(e);
                }
            };

            let view = &mut handle.view;
            if !view.chart.apply_snapshot(&snapshot) {
                debug!("grid {}: snapshot has no levels", grid_id);
                return RefreshOutcome::NoLevels;
            }
            view.info.apply_snapshot(&snapshot);

            let mut updates = vec![ViewUpdate::Chart {
                grid_id,
                chart: view.chart.clone(),
                info: view.info.clone(),
            }];
            if let Some(display) = view.display.as_mut() {
                display.apply_snapshot(&snapshot);
                updates.push(ViewUpdate::GridSummary {
                    grid_id,
                    display: display.clone(),
                });
            }
            updates
        };

        for update in &updates {
            self.listener.on_update(update);
        }
        RefreshOutcome::Applied
    }

    pub async fn is_initialized(&self, grid_id: GridId) -> bool {
        self.charts.read().await.contains_key(&grid_id)
    }

    pub async fn chart(&self, grid_id: GridId) -> Option<GridChart> {
        self.charts.read().await.get(&grid_id).map(|h| h.view.chart.clone())
    }

    pub async fn view(&self, grid_id: GridId) -> Option<ChartView> {
        self.charts.read().await.get(&grid_id).map(|h| h.view.clone())
    }

    /// Every registered chart, ordered by grid id
    pub async fn views(&self) -> Vec<(GridId, ChartView)> {
        let charts = self.charts.read().await;
        let mut views: Vec<_> = charts.iter().map(|(id, h)| (*id, h.view.clone())).collect();
        views.sort_by_key(|(id, _)| *id);
        views
    }

    /// Drop the chart of a grid; an in-flight refresh for it is then discarded
    pub async fn remove(&self, grid_id: GridId) -> bool {
        self.charts.write().await.remove(&grid_id).is_some()
    }
}
