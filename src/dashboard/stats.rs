//! Stats board - performance figures and recent trades of each grid card

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, error};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::api::client::GridApi;
use crate::api::types::{GridId, Performance, TradeRecord};
use crate::errors::DashboardResult;
use crate::format::{format_number, format_optional};

use super::listener::{ViewListener, ViewUpdate};
use super::page::PageLayout;

/// Trades kept per grid, newest first
pub const MAX_RECENT_TRADES: usize = 50;

/// Performance text of a grid card
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GridStatsView {
    pub total_profit: String,
    pub win_rate: String,
    pub total_trades: String,
}

impl GridStatsView {
    pub fn from_performance(perf: &Performance) -> Self {
        let win_rate = match perf.win_rate {
            Some(rate) => format!("{}%", format_number(rate, 2)),
            None => "-".to_string(),
        };
        Self {
            total_profit: format_optional(perf.net_profit, 4),
            win_rate,
            total_trades: perf
                .total_trades
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[derive(Default)]
struct BoardState {
    stats: HashMap<GridId, GridStatsView>,
    trades: HashMap<GridId, Vec<TradeRecord>>,
    stats_token: HashMap<GridId, u64>,
    trades_token: HashMap<GridId, u64>,
}

/// Keeps the stats containers and trade tables of the page current
pub struct StatsBoard<A: GridApi> {
    api: Arc<A>,
    state: Arc<RwLock<BoardState>>,
    generation: Arc<AtomicU64>,
    layout: Arc<RwLock<PageLayout>>,
    listener: Arc<dyn ViewListener>,
}

impl<A: GridApi> Clone for StatsBoard<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            state: self.state.clone(),
            generation: self.generation.clone(),
            layout: self.layout.clone(),
            listener: self.listener.clone(),
        }
    }
}

impl<A: GridApi> StatsBoard<A> {
    pub fn new(api: Arc<A>, layout: Arc<RwLock<PageLayout>>, listener: Arc<dyn ViewListener>) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(BoardState::default())),
            generation: Arc::new(AtomicU64::new(0)),
            layout,
            listener,
        }
    }

    fn next_token(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Refresh the performance figures of a grid
    ///
    /// Returns true when the view changed. Grids without a stats container
    /// are skipped, as are responses without a `performance` object.
    pub async fn update_grid_stats(&self, grid_id: GridId) -> bool {
        let has_container = self
            .layout
            .read()
            .await
            .card(grid_id)
            .map(|c| c.stats_container)
            .unwrap_or(false);
        if !has_container {
            return false;
        }

        let token = self.next_token();
        self.state.write().await.stats_token.insert(grid_id, token);

        let response = match self.api.grid_stats(grid_id).await {
            Ok(response) => response,
            Err(e) => {
                error!("Error updating grid stats {}: {}", grid_id, e);
                return false;
            }
        };
        let Some(perf) = response.performance else {
            debug!("grid {}: stats response without performance", grid_id);
            return false;
        };

        let view = GridStatsView::from_performance(&perf);
        {
            let mut state = self.state.write().await;
            if state.stats_token.get(&grid_id) != Some(&token) {
                debug!("grid {}: discarding stale stats", grid_id);
                return false;
            }
            state.stats.insert(grid_id, view.clone());
        }

        self.listener.on_update(&ViewUpdate::GridStats { grid_id, stats: view });
        true
    }

    /// Refresh the trade table of a grid, if the card has one
    pub async fn update_recent_trades(&self, grid_id: GridId) -> DashboardResult<bool> {
        let has_table = self
            .layout
            .read()
            .await
            .card(grid_id)
            .map(|c| c.trades_table)
            .unwrap_or(false);
        if !has_table {
            return Ok(false);
        }

        let token = self.next_token();
        self.state.write().await.trades_token.insert(grid_id, token);

        let mut trades = self.api.grid_trades(grid_id).await?;
        trades.truncate(MAX_RECENT_TRADES);

        {
            let mut state = self.state.write().await;
            if state.trades_token.get(&grid_id) != Some(&token) {
                debug!("grid {}: discarding stale trades", grid_id);
                return Ok(false);
            }
            state.trades.insert(grid_id, trades.clone());
        }

        self.listener.on_update(&ViewUpdate::Trades { grid_id, trades });
        Ok(true)
    }

    pub async fn stats(&self, grid_id: GridId) -> Option<GridStatsView> {
        self.state.read().await.stats.get(&grid_id).cloned()
    }

    pub async fn trades(&self, grid_id: GridId) -> Vec<TradeRecord> {
        self.state.read().await.trades.get(&grid_id).cloned().unwrap_or_default()
    }

    /// Forget everything shown for a grid
    pub async fn remove(&self, grid_id: GridId) {
        let mut state = self.state.write().await;
        state.stats.remove(&grid_id);
        state.trades.remove(&grid_id);
        state.stats_token.remove(&grid_id);
        state.trades_token.remove(&grid_id);
    }
}
