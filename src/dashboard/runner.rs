//! Dashboard runner - wires the form, charts and stats and drives the refresh loop

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::api::client::GridApi;
use crate::api::types::{GridId, TradeRecord};
use crate::chart::{ChartRenderer, ChartView, RefreshOutcome};
use crate::config::Settings;
use crate::errors::{DashboardError, DashboardResult};
use crate::form::{FormController, FormEvent, FormInputs, FormState, FormView};

use super::listener::ViewListener;
use super::page::{GridCard, PageLayout};
use super::stats::{GridStatsView, StatsBoard};

/// Runtime options of the dashboard
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub refresh_interval: Duration,
    /// Link target of the geographic-restriction hint
    pub settings_url: String,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(30),
            settings_url: "/settings".to_string(),
        }
    }
}

/// What one grid refresh did
#[derive(Debug)]
pub struct GridRefresh {
    pub grid_id: GridId,
    pub stats_updated: bool,
    pub chart: RefreshOutcome,
    pub trades_updated: bool,
}

/// Everything drawn for one grid card
#[derive(Debug, Clone, Serialize)]
pub struct GridPanel {
    pub card: GridCard,
    pub chart: Option<ChartView>,
    pub stats: Option<GridStatsView>,
    pub trades: Vec<TradeRecord>,
}

/// Serializable copy of the whole dashboard view
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub form: FormView,
    pub form_state: FormState,
    pub grids: Vec<GridPanel>,
    pub refresh_interval_secs: u64,
}

/// The dashboard page: grid creation form plus one card per grid
pub struct Dashboard<A: GridApi> {
    api: Arc<A>,
    layout: Arc<RwLock<PageLayout>>,
    form: Arc<Mutex<FormController<A>>>,
    charts: ChartRenderer<A>,
    stats: StatsBoard<A>,
    options: DashboardOptions,
    /// Held across a whole toggle so overlapping toggles see each other's request
    toggle_lock: Mutex<()>,
}

impl<A: GridApi + 'static> Dashboard<A> {
    pub fn new(
        api: Arc<A>,
        layout: PageLayout,
        inputs: FormInputs,
        options: DashboardOptions,
        listener: Arc<dyn ViewListener>,
    ) -> Self {
        let layout = Arc::new(RwLock::new(layout));
        let form = FormController::new(
            api.clone(),
            inputs,
            FormView::default(),
            options.settings_url.clone(),
            listener.clone(),
        );
        let charts = ChartRenderer::new(api.clone(), layout.clone(), listener.clone());
        let stats = StatsBoard::new(api.clone(), layout.clone(), listener);

        Self {
            api,
            layout,
            form: Arc::new(Mutex::new(form)),
            charts,
            stats,
            options,
            toggle_lock: Mutex::new(()),
        }
    }

    pub fn from_settings(api: Arc<A>, settings: &Settings, listener: Arc<dyn ViewListener>) -> Self {
        let options = DashboardOptions {
            refresh_interval: Duration::from_secs(settings.dashboard.refresh_interval_secs.max(1)),
            settings_url: settings.api.settings_url.clone(),
        };
        Self::new(api, settings.layout(), settings.form.inputs(), options, listener)
    }

    pub fn form(&self) -> Arc<Mutex<FormController<A>>> {
        self.form.clone()
    }

    pub fn charts(&self) -> &ChartRenderer<A> {
        &self.charts
    }

    pub fn stats(&self) -> &StatsBoard<A> {
        &self.stats
    }

    pub async fn layout(&self) -> PageLayout {
        self.layout.read().await.clone()
    }

    /// Feed an input event to the grid-creation form
    pub async fn handle_form_event(&self, event: FormEvent) {
        self.form.lock().await.handle(event).await;
    }

    /// Load the symbol choices and draw every active grid once
    pub async fn init(&self) {
        self.form.lock().await.load_symbols().await;

        let active = self.layout.read().await.active_grid_ids();
        info!("Initializing dashboard with {} active grids", active.len());
        for grid_id in active {
            self.charts.init_grid_chart(grid_id).await;
            self.stats.update_grid_stats(grid_id).await;
            if let Err(e) = self.stats.update_recent_trades(grid_id).await {
                warn!("grid {}: could not load recent trades: {}", grid_id, e);
            }
        }
    }

    /// Refresh stats, chart and trades of one grid concurrently
    pub async fn refresh_grid(&self, grid_id: GridId) -> GridRefresh {
        refresh(&self.charts, &self.stats, grid_id).await
    }

    /// Refresh every active or starting grid concurrently
    pub async fn refresh_active(&self) -> Vec<GridRefresh> {
        let active = self.layout.read().await.polled_grid_ids();
        futures_util::future::join_all(active.into_iter().map(|id| self.refresh_grid(id))).await
    }

    /// Refresh active grids every interval until `shutdown` resolves
    ///
    /// Each cycle spawns its refreshes and does not wait for earlier ones.
    /// A late response from an earlier cycle is discarded on arrival.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let period = self.options.refresh_interval;
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Refreshing active grids every {:?}", period);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Dashboard refresh loop stopped");
                    break;
                }
                _ = timer.tick() => {
                    let active = self.layout.read().await.polled_grid_ids();
                    debug!("refresh cycle for {} grids", active.len());
                    for grid_id in active {
                        let charts = self.charts.clone();
                        let stats = self.stats.clone();
                        tokio::spawn(async move {
                            refresh(&charts, &stats, grid_id).await;
                        });
                    }
                }
            }
        }
    }

    /// Ask the service to flip a grid between running and stopped
    ///
    /// The service answers with a redirect whether or not the flip went
    /// through, so an accepted request is only recorded on the card; the
    /// active flag changes through [`Dashboard::confirm_grid_state`]. A start
    /// request draws the chart and polls the grid from then on.
    ///
    /// Returns the state the grid was asked to enter.
    pub async fn toggle_grid(&self, grid_id: GridId) -> DashboardResult<bool> {
        let _toggle = self.toggle_lock.lock().await;
        let target = self
            .layout
            .read()
            .await
            .card(grid_id)
            .map(|c| !c.expected_active())
            .ok_or_else(|| DashboardError::InvalidInput(format!("Unknown grid {}", grid_id)))?;

        self.api.toggle_grid(grid_id).await?;
        self.layout.write().await.record_request(grid_id, target);
        info!("grid {}: {} requested", grid_id, if target { "start" } else { "stop" });

        if target {
            self.charts.init_grid_chart(grid_id).await;
            self.stats.update_grid_stats(grid_id).await;
        }
        Ok(target)
    }

    /// Record the running state the service reports for a grid
    pub async fn confirm_grid_state(&self, grid_id: GridId, active: bool) -> DashboardResult<()> {
        let _toggle = self.toggle_lock.lock().await;
        if !self.layout.write().await.set_active(grid_id, active) {
            return Err(DashboardError::InvalidInput(format!("Unknown grid {}", grid_id)));
        }
        info!("grid {}: {}", grid_id, if active { "running" } else { "stopped" });

        if active && !self.charts.is_initialized(grid_id).await {
            self.charts.init_grid_chart(grid_id).await;
            self.stats.update_grid_stats(grid_id).await;
        }
        Ok(())
    }

    /// Delete a stopped grid and drop its card
    pub async fn delete_grid(&self, grid_id: GridId) -> DashboardResult<()> {
        let _toggle = self.toggle_lock.lock().await;
        let active = self
            .layout
            .read()
            .await
            .card(grid_id)
            .map(|c| c.active || c.requested == Some(true));
        match active {
            None => return Err(DashboardError::InvalidInput(format!("Unknown grid {}", grid_id))),
            Some(true) => {
                return Err(DashboardError::InvalidInput(
                    "Cannot delete an active grid. Please stop it first.".into(),
                ))
            }
            Some(false) => {}
        }

        self.api.delete_grid(grid_id).await?;
        self.layout.write().await.remove(grid_id);
        self.charts.remove(grid_id).await;
        self.stats.remove(grid_id).await;
        info!("grid {}: deleted", grid_id);
        Ok(())
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let (form, form_state) = {
            let form = self.form.lock().await;
            (form.view().clone(), form.state().clone())
        };

        let cards = self.layout.read().await.cards().to_vec();
        let mut grids = Vec::with_capacity(cards.len());
        for card in cards {
            grids.push(GridPanel {
                chart: self.charts.view(card.id).await,
                stats: self.stats.stats(card.id).await,
                trades: self.stats.trades(card.id).await,
                card,
            });
        }

        DashboardSnapshot {
            form,
            form_state,
            grids,
            refresh_interval_secs: self.options.refresh_interval.as_secs(),
        }
    }
}

async fn refresh<A: GridApi>(charts: &ChartRenderer<A>, stats: &StatsBoard<A>, grid_id: GridId) -> GridRefresh {
    let (stats_updated, chart, trades) = tokio::join!(
        stats.update_grid_stats(grid_id),
        charts.update_grid_chart(grid_id),
        stats.update_recent_trades(grid_id),
    );

    let trades_updated = match trades {
        Ok(updated) => updated,
        Err(e) => {
            warn!("grid {}: could not refresh recent trades: {}", grid_id, e);
            false
        }
    };

    GridRefresh {
        grid_id,
        stats_updated,
        chart,
        trades_updated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::api::mock::MockGridApi;
    use crate::api::types::{BotType, GridSnapshot, GridStatsResponse, Performance, PositionEntry};
    use crate::dashboard::listener::{NoOpListener, RecordingListener, ViewUpdate};

    fn snapshot() -> GridSnapshot {
        GridSnapshot {
            grid_levels: vec![100.0, 105.0, 110.0],
            long_positions: vec![PositionEntry::new(100.0, true)],
            short_positions: vec![],
            current_price: Some(104.0),
            bot_type: Some(BotType::Long),
            wallet_allocation: Some(20),
        }
    }

    fn stats() -> GridStatsResponse {
        GridStatsResponse {
            performance: Some(Performance {
                net_profit: Some(2.0),
                win_rate: Some(75.0),
                total_trades: Some(8),
                ..Default::default()
            }),
        }
    }

    async fn create_test_dashboard(
        refresh_interval: Duration,
    ) -> (Dashboard<MockGridApi>, Arc<MockGridApi>, Arc<RecordingListener>) {
        let api = Arc::new(MockGridApi::new());
        for id in [1, 2] {
            api.set_snapshot(id, snapshot()).await;
            api.set_stats(id, Ok(stats())).await;
        }

        let layout = PageLayout::new(vec![GridCard::new(1, true), GridCard::new(2, false)]);
        let options = DashboardOptions {
            refresh_interval,
            ..DashboardOptions::default()
        };
        let listener = Arc::new(RecordingListener::default());
        let dashboard = Dashboard::new(api.clone(), layout, FormInputs::default(), options, listener.clone());
        (dashboard, api, listener)
    }

    #[tokio::test]
    async fn test_init_draws_active_grids_only() {
        let (dashboard, api, listener) = create_test_dashboard(Duration::from_secs(30)).await;
        dashboard.init().await;

        assert!(dashboard.charts().is_initialized(1).await);
        assert!(!dashboard.charts().is_initialized(2).await);
        assert_eq!(api.call_count("symbols").await, 1);
        assert_eq!(api.call_count("grid_positions").await, 1);
        assert_eq!(listener.count(|u| u.grid_id() == Some(2)), 0);

        let snap = dashboard.snapshot().await;
        assert_eq!(snap.grids.len(), 2);
        assert!(snap.grids[0].chart.is_some());
        assert_eq!(snap.grids[0].stats.as_ref().unwrap().win_rate, "75.00%");
        assert!(snap.grids[1].chart.is_none());
        assert_eq!(snap.refresh_interval_secs, 30);
    }

    #[tokio::test]
    async fn test_refresh_active() {
        let (dashboard, _, _) = create_test_dashboard(Duration::from_secs(30)).await;
        dashboard.init().await;

        let results = dashboard.refresh_active().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].grid_id, 1);
        assert!(results[0].stats_updated);
        assert!(results[0].chart.is_applied());
        assert!(!results[0].trades_updated);
    }

    #[tokio::test]
    async fn test_run_refreshes_until_shutdown() {
        let (dashboard, api, _) = create_test_dashboard(Duration::from_millis(40)).await;
        dashboard.init().await;

        dashboard.run(tokio::time::sleep(Duration::from_millis(150))).await;
        // let the last spawned refreshes finish
        tokio::time::sleep(Duration::from_millis(20)).await;

        let polls = api.call_count("grid_positions").await;
        assert!(polls >= 3, "expected init plus at least two cycles, got {}", polls);
        assert!(api.call_count("grid_stats").await >= 3);
    }

    #[tokio::test]
    async fn test_toggle_records_request() {
        let (dashboard, api, _) = create_test_dashboard(Duration::from_secs(30)).await;

        assert!(dashboard.toggle_grid(2).await.unwrap());
        assert!(dashboard.charts().is_initialized(2).await);
        let layout = dashboard.layout().await;
        assert_eq!(layout.active_grid_ids(), vec![1]);
        assert_eq!(layout.card(2).unwrap().requested, Some(true));
        assert_eq!(layout.polled_grid_ids(), vec![1, 2]);

        assert!(!dashboard.toggle_grid(1).await.unwrap());
        assert_eq!(dashboard.layout().await.card(1).unwrap().requested, Some(false));
        assert_eq!(*api.toggled.lock().await, vec![2, 1]);

        dashboard.confirm_grid_state(2, true).await.unwrap();
        dashboard.confirm_grid_state(1, false).await.unwrap();
        let layout = dashboard.layout().await;
        assert_eq!(layout.active_grid_ids(), vec![2]);
        assert!(layout.cards().iter().all(|c| c.requested.is_none()));

        assert!(dashboard.toggle_grid(42).await.is_err());
        assert!(dashboard.confirm_grid_state(42, true).await.is_err());
    }

    #[tokio::test]
    async fn test_refused_toggle_leaves_card_alone() {
        let (dashboard, api, _) = create_test_dashboard(Duration::from_secs(30)).await;
        api.set_form_error(Some(DashboardError::status(
            302,
            Some("Please set up your API keys first".into()),
        )))
        .await;

        let err = dashboard.toggle_grid(2).await.unwrap_err();
        assert_eq!(err.user_message(), "Please set up your API keys first");

        let layout = dashboard.layout().await;
        assert_eq!(layout.active_grid_ids(), vec![1]);
        assert_eq!(layout.card(2).unwrap().requested, None);
        assert_eq!(layout.polled_grid_ids(), vec![1]);
        assert!(!dashboard.charts().is_initialized(2).await);
        assert_eq!(api.call_count("grid_positions").await, 0);
    }

    #[tokio::test]
    async fn test_overlapping_toggles_follow_the_service() {
        let (dashboard, api, _) = create_test_dashboard(Duration::from_secs(30)).await;

        // two flips on the service leave grid 2 stopped again
        let (first, second) = tokio::join!(dashboard.toggle_grid(2), dashboard.toggle_grid(2));
        let mut targets = vec![first.unwrap(), second.unwrap()];
        targets.sort();
        assert_eq!(targets, vec![false, true]);

        assert_eq!(*api.toggled.lock().await, vec![2, 2]);
        let card = dashboard.layout().await.card(2).cloned().unwrap();
        assert!(!card.active);
        assert_eq!(card.requested, None);
    }

    #[tokio::test]
    async fn test_delete_requires_stopped_grid() {
        let (dashboard, api, _) = create_test_dashboard(Duration::from_secs(30)).await;
        dashboard.init().await;

        let err = dashboard.delete_grid(1).await.unwrap_err();
        assert!(err.user_message().contains("stop it first"));

        dashboard.delete_grid(2).await.unwrap();
        assert!(dashboard.layout().await.card(2).is_none());
        assert_eq!(*api.deleted.lock().await, vec![2]);
    }

    #[tokio::test]
    async fn test_delete_refuses_pending_start() {
        let (dashboard, api, _) = create_test_dashboard(Duration::from_secs(30)).await;
        dashboard.toggle_grid(2).await.unwrap();

        assert!(dashboard.delete_grid(2).await.is_err());
        assert!(api.deleted.lock().await.is_empty());
        assert!(dashboard.layout().await.card(2).is_some());
    }

    #[tokio::test]
    async fn test_form_events_reach_controller() {
        let api = Arc::new(MockGridApi::new());
        api.set_price("ETHUSDT", 2000.0).await;
        api.set_balance(500.0).await;
        let inputs = FormInputs {
            grid_size: Some(10),
            leverage: Some(2),
            wallet_allocation: Some(50.0),
            range_percent: 10,
            ..FormInputs::default()
        };
        let dashboard = Dashboard::new(
            api,
            PageLayout::default(),
            inputs,
            DashboardOptions::default(),
            Arc::new(NoOpListener),
        );

        dashboard
            .handle_form_event(FormEvent::SymbolSelected(Some("ETHUSDT".into())))
            .await;

        let snap = dashboard.snapshot().await;
        assert_eq!(snap.form_state.current_price, 2000.0);
        assert_eq!(snap.form.lower_bound, "1800.00000000");
        assert_eq!(snap.form.allocation_amount, "250.00");
        assert!(matches!(dashboard.form().lock().await.quantity_per_grid(), Some(q) if q > 0.0));
    }

    #[tokio::test]
    async fn test_toggle_failure_keeps_layout() {
        let (dashboard, _, listener) = create_test_dashboard(Duration::from_secs(30)).await;
        dashboard.init().await;
        let before = listener.count(|u| matches!(u, ViewUpdate::Chart { .. }));

        // grid 3 is unknown to the layout, so nothing is posted
        assert!(dashboard.toggle_grid(3).await.is_err());
        assert_eq!(dashboard.layout().await.active_grid_ids(), vec![1]);
        assert_eq!(listener.count(|u| matches!(u, ViewUpdate::Chart { .. })), before);
    }
}
