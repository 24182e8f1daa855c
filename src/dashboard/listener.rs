//! ViewListener trait definition
//!
//! Defines how external components observe view changes made by the
//! form controller, the chart renderer and the stats board.

use log::debug;

use crate::api::types::{GridId, TradeRecord};
use crate::chart::{GridChart, GridInfo, GridStatsDisplay};
use crate::form::FormView;

use super::stats::GridStatsView;

/// A change to one part of the dashboard, carrying the new state
#[derive(Debug, Clone)]
pub enum ViewUpdate {
    /// Form fields were recomputed
    Form(FormView),
    /// A grid chart was redrawn from a fresh snapshot
    Chart {
        grid_id: GridId,
        chart: GridChart,
        info: GridInfo,
    },
    /// Level statistics derived from a grid snapshot
    GridSummary {
        grid_id: GridId,
        display: GridStatsDisplay,
    },
    /// Performance statistics of a grid
    GridStats { grid_id: GridId, stats: GridStatsView },
    /// Recent executions of a grid
    Trades {
        grid_id: GridId,
        trades: Vec<TradeRecord>,
    },
}

impl ViewUpdate {
    /// Grid the update belongs to, `None` for form updates
    pub fn grid_id(&self) -> Option<GridId> {
        match self {
            ViewUpdate::Form(_) => None,
            ViewUpdate::Chart { grid_id, .. }
            | ViewUpdate::GridSummary { grid_id, .. }
            | ViewUpdate::GridStats { grid_id, .. }
            | ViewUpdate::Trades { grid_id, .. } => Some(*grid_id),
        }
    }
}

/// ViewListener interface for receiving view notifications
///
/// Notifications are delivered synchronously from whichever task applied
/// the change, so implementations must be cheap and thread-safe.
pub trait ViewListener: Send + Sync {
    /// Called after a view was changed
    fn on_update(&self, update: &ViewUpdate);
}

/// A no-op listener for when notifications aren't needed
#[derive(Debug, Default)]
pub struct NoOpListener;

impl ViewListener for NoOpListener {
    fn on_update(&self, _update: &ViewUpdate) {}
}

/// Logs every update at debug level
#[derive(Debug, Default)]
pub struct LogListener;

impl ViewListener for LogListener {
    fn on_update(&self, update: &ViewUpdate) {
        match update {
            ViewUpdate::Form(view) => debug!(
                "form: allocation={} quantity={}",
                view.allocation_amount, view.quantity_per_grid
            ),
            ViewUpdate::Chart { grid_id, chart, info } => debug!(
                "grid {}: chart redrawn, {} levels, {}",
                grid_id,
                chart.labels.len(),
                info.bot_type_label
            ),
            ViewUpdate::GridSummary { grid_id, display } => debug!(
                "grid {}: range {} - {}",
                grid_id, display.lower_bound, display.upper_bound
            ),
            ViewUpdate::GridStats { grid_id, stats } => debug!(
                "grid {}: profit={} win_rate={} trades={}",
                grid_id, stats.total_profit, stats.win_rate, stats.total_trades
            ),
            ViewUpdate::Trades { grid_id, trades } => {
                debug!("grid {}: {} recent trades", grid_id, trades.len())
            }
        }
    }
}

/// Listener that keeps every update, for assertions in tests
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingListener {
    pub(crate) updates: std::sync::Mutex<Vec<ViewUpdate>>,
}

#[cfg(test)]
impl RecordingListener {
    pub(crate) fn count(&self, pred: impl Fn(&ViewUpdate) -> bool) -> usize {
        self.updates.lock().unwrap().iter().filter(|u| pred(u)).count()
    }

    pub(crate) fn last(&self) -> Option<ViewUpdate> {
        self.updates.lock().unwrap().last().cloned()
    }
}

#[cfg(test)]
impl ViewListener for RecordingListener {
    fn on_update(&self, update: &ViewUpdate) {
        self.updates.lock().unwrap().push(update.clone());
    }
}
