//! Form controller - keeps derived form fields consistent with price and balance

use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::api::client::GridApi;
use crate::api::types::{BalanceResponse, GridRequest, PriceResponse};
use crate::dashboard::listener::{ViewListener, ViewUpdate};
use crate::errors::{is_geo_restriction_message, DashboardError, DashboardResult};
use crate::format::format_number;

use super::calc;
use super::validate::GridDraft;
use super::view::{geo_restriction_markup, FormEvent, FormInputs, FormView, GridStepPreview, Notice};

/// Market inputs the derived fields are computed from
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormState {
    pub current_price: f64,
    pub wallet_balance: f64,
    pub selected_symbol: String,
}

/// Drives the grid-creation form
pub struct FormController<A: GridApi> {
    api: Arc<A>,
    inputs: FormInputs,
    view: FormView,
    state: FormState,
    quantity_per_grid: Option<f64>,
    settings_url: String,
    listener: Arc<dyn ViewListener>,
}

impl<A: GridApi> FormController<A> {
    pub fn new(
        api: Arc<A>,
        inputs: FormInputs,
        mut view: FormView,
        settings_url: impl Into<String>,
        listener: Arc<dyn ViewListener>,
    ) -> Self {
        view.range_percent_text = inputs.range_percent.to_string();
        view.range_percent_display = format!("{}%", inputs.range_percent);
        Self {
            api,
            inputs,
            view,
            state: FormState::default(),
            quantity_per_grid: None,
            settings_url: settings_url.into(),
            listener,
        }
    }

    pub fn inputs(&self) -> &FormInputs {
        &self.inputs
    }

    pub fn view(&self) -> &FormView {
        &self.view
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Last computed quantity per grid order
    pub fn quantity_per_grid(&self) -> Option<f64> {
        self.quantity_per_grid
    }

    /// Apply a field edit and recompute whatever depends on it
    pub async fn handle(&mut self, event: FormEvent) {
        debug!("form event: {:?}", event);
        match event {
            FormEvent::SymbolSelected(Some(symbol)) if !symbol.trim().is_empty() => {
                self.inputs.symbol = Some(symbol.clone());
                self.select_symbol(&symbol).await;
            }
            FormEvent::SymbolSelected(_) => {
                self.inputs.symbol = None;
                self.view.market_price.hide();
                self.view.wallet.hide();
            }
            FormEvent::RangePercentChanged(value) => {
                let value = value.min(100);
                self.inputs.range_percent = value;
                self.view.range_percent_text = value.to_string();
                self.view.range_percent_display = format!("{}%", value);
                self.update_grid_bounds();
            }
            FormEvent::WalletAllocationChanged(value) => {
                self.inputs.wallet_allocation = value;
                self.update_allocation_amount();
            }
            FormEvent::GridSizeChanged(value) => {
                self.inputs.grid_size = value;
                self.update_grid_preview();
                self.update_allocation_amount();
            }
            FormEvent::LowerBoundChanged(value) => {
                self.inputs.lower_bound = value;
                self.update_grid_preview();
            }
            FormEvent::UpperBoundChanged(value) => {
                self.inputs.upper_bound = value;
                self.update_grid_preview();
            }
            FormEvent::BotTypeChanged(bot_type) => {
                self.inputs.bot_type = bot_type;
                self.update_allocation_amount();
            }
            FormEvent::LeverageChanged(value) => {
                self.inputs.leverage = value;
                self.update_allocation_amount();
            }
        }
        self.notify();
    }

    /// Fetch price and balance for a newly selected symbol
    async fn select_symbol(&mut self, symbol: &str) {
        self.state.selected_symbol = symbol.to_string();
        let api = Arc::clone(&self.api);
        let (price, balance) = tokio::join!(api.symbol_price(symbol), api.account_balance());
        self.apply_price(price);
        self.apply_balance(balance);
    }

    pub async fn load_wallet_balance(&mut self) {
        let result = self.api.account_balance().await;
        self.apply_balance(result);
        self.notify();
    }

    pub async fn load_symbol_price(&mut self, symbol: &str) {
        self.state.selected_symbol = symbol.to_string();
        let result = self.api.symbol_price(symbol).await;
        self.apply_price(result);
        self.notify();
    }

    /// Fill the symbol choices, accepting the service's fallback list
    pub async fn load_symbols(&mut self) {
        match self.api.symbols().await {
            Ok(list) => {
                info!("Loaded {} symbols", list.symbols.len());
                self.view.symbols_notice = if list.restricted {
                    let message = list
                        .message
                        .unwrap_or_else(|| "Live symbol list unavailable, showing defaults".to_string());
                    self.notice_for(&message, is_geo_restriction_message(&message))
                } else {
                    Notice::Hidden
                };
                self.view.symbols = list.symbols;
            }
            Err(e) => {
                error!("Error loading symbols: {}", e);
                self.view.symbols_notice = self.error_notice(&e);
            }
        }
        self.notify();
    }

    fn apply_balance(&mut self, result: DashboardResult<BalanceResponse>) {
        match result.and_then(|r| r.balance()) {
            Ok(balance) => {
                self.state.wallet_balance = balance;
                self.view.wallet.show(format_number(balance, 2));
                self.view.wallet_error = Notice::Hidden;
                self.update_allocation_amount();
            }
            Err(DashboardError::MissingField(field)) => debug!("Balance response carried no {}", field),
            Err(e) => {
                error!("Error loading wallet balance: {}", e);
                self.view.wallet.hide();
                self.view.wallet_error = self.error_notice(&e);
            }
        }
    }

    fn apply_price(&mut self, result: DashboardResult<PriceResponse>) {
        match result.and_then(|r| r.usable_price()) {
            Ok(price) => {
                self.state.current_price = price;
                self.view.market_price.show(format_number(price, 8));
                self.view.market_error = Notice::Hidden;
                self.update_grid_bounds();
                self.update_allocation_amount();
            }
            Err(DashboardError::MissingField(field)) => debug!("Price response carried no usable {}", field),
            Err(e) => {
                error!("Error fetching price: {}", e);
                self.view.market_price.hide();
                self.view.market_error = self.error_notice(&e);
            }
        }
    }

    fn error_notice(&self, err: &DashboardError) -> Notice {
        self.notice_for(&err.user_message(), err.is_geo_restricted())
    }

    fn notice_for(&self, message: &str, geo_restricted: bool) -> Notice {
        if geo_restricted {
            Notice::Markup(geo_restriction_markup(message, &self.settings_url))
        } else {
            Notice::Text(message.to_string())
        }
    }

    /// Recenter the bounds on the current price using the range slider
    pub fn update_grid_bounds(&mut self) {
        let Some((lower, upper)) = calc::grid_bounds(self.state.current_price, self.inputs.range_percent)
        else {
            return;
        };

        self.inputs.lower_bound = Some(lower);
        self.inputs.upper_bound = Some(upper);
        self.view.lower_bound = format_number(lower, 8);
        self.view.upper_bound = format_number(upper, 8);
        self.update_grid_preview();
    }

    /// Show the grid step for the current bounds; leaves the preview as is when undefined
    pub fn update_grid_preview(&mut self) {
        let (Some(lower), Some(upper), Some(grid_size)) =
            (self.inputs.lower_bound, self.inputs.upper_bound, self.inputs.grid_size)
        else {
            return;
        };
        let Some(step) = calc::grid_step(lower, upper, grid_size) else {
            return;
        };

        let percent_of_price = calc::step_percent_of_price(step, self.state.current_price);
        let percent_text = percent_of_price
            .map(|p| format_number(p, 2))
            .unwrap_or_else(|| "-".to_string());

        self.view.grid_step_preview = Some(GridStepPreview {
            step,
            percent_of_price,
            text: format!("Grid Step: {} ({}% of price)", format_number(step, 6), percent_text),
        });
    }

    /// Recompute the wallet amount committed to the grid
    pub fn update_allocation_amount(&mut self) {
        let percent = self.inputs.wallet_allocation.unwrap_or(0.0);
        let amount = calc::allocation_amount(self.state.wallet_balance, percent);
        self.view.allocation_amount = format_number(amount, 2);
        self.calculate_quantity_per_grid(amount);
    }

    /// Spread the leveraged allocation over the grid's order slots
    pub fn calculate_quantity_per_grid(&mut self, allocation_amount: f64) {
        let Some(leverage) = self.inputs.leverage.filter(|l| *l > 0) else {
            return;
        };
        let grid_size = self.inputs.grid_size.unwrap_or(0);
        let slots = calc::position_slots(self.inputs.bot_type, grid_size);

        if let Some(quantity) =
            calc::quantity_per_grid(allocation_amount, leverage, slots, self.state.current_price)
        {
            self.quantity_per_grid = Some(quantity);
            self.view.quantity_per_grid = format_number(quantity, 8);
        }
    }

    /// Current inputs as an unvalidated draft
    pub fn draft(&self) -> GridDraft {
        GridDraft {
            symbol: self.inputs.symbol.clone(),
            lower_bound: self.inputs.lower_bound,
            upper_bound: self.inputs.upper_bound,
            grid_size: self.inputs.grid_size,
            quantity_per_grid: self.quantity_per_grid,
            leverage: self.inputs.leverage,
            bot_type: Some(self.inputs.bot_type),
            wallet_allocation: self.inputs.wallet_allocation,
        }
    }

    /// Validate the form and send it to the service
    ///
    /// The service only reports a refusal for missing API keys or session;
    /// other rejections look like success, hence the cautious notice.
    pub async fn submit(&mut self) -> DashboardResult<GridRequest> {
        let result = match self.draft().into_request() {
            Ok(request) => self.api.create_grid(&request).await.map(|_| request),
            Err(e) => Err(e),
        };

        match &result {
            Ok(request) => {
                info!("Grid configuration for {} submitted", request.symbol);
                self.view.submit_notice =
                    Notice::Text("Grid configuration submitted. It appears in the grid list once created.".into());
            }
            Err(e) => {
                warn!("Grid creation failed: {}", e);
                self.view.submit_notice = self.error_notice(e);
            }
        }
        self.notify();
        result
    }

    fn notify(&self) {
        self.listener.on_update(&ViewUpdate::Form(self.view.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::mock::MockGridApi;
    use crate::api::types::{BotType, SymbolList};
    use crate::dashboard::listener::RecordingListener;

    fn inputs() -> FormInputs {
        FormInputs {
            grid_size: Some(10),
            leverage: Some(1),
            wallet_allocation: Some(10.0),
            range_percent: 10,
            ..FormInputs::default()
        }
    }

    async fn create_test_controller() -> (FormController<MockGridApi>, Arc<MockGridApi>, Arc<RecordingListener>) {
        let api = Arc::new(MockGridApi::new());
        api.set_price("BTCUSDT", 100.0).await;
        api.set_balance(2000.0).await;

        let listener = Arc::new(RecordingListener::default());
        let controller = FormController::new(
            Arc::clone(&api),
            inputs(),
            FormView::default(),
            "/settings",
            listener.clone(),
        );
        (controller, api, listener)
    }

    #[tokio::test]
    async fn test_symbol_selection_populates_fields() {
        let (mut controller, api, _) = create_test_controller().await;

        controller.handle(FormEvent::SymbolSelected(Some("BTCUSDT".into()))).await;

        let state = controller.state();
        assert_eq!(state.selected_symbol, "BTCUSDT");
        assert_eq!(state.current_price, 100.0);
        assert_eq!(state.wallet_balance, 2000.0);

        let view = controller.view();
        assert!(view.market_price.visible);
        assert_eq!(view.market_price.text, "100.00000000");
        assert!(view.wallet.visible);
        assert_eq!(view.wallet.text, "2000.00");
        assert_eq!(view.lower_bound, "90.00000000");
        assert_eq!(view.upper_bound, "110.00000000");
        assert_eq!(view.allocation_amount, "200.00");
        // 200 * 1 / (20 * 100)
        assert_eq!(view.quantity_per_grid, "0.10000000");

        let preview = view.grid_step_preview.as_ref().unwrap();
        assert_eq!(preview.text, "Grid Step: 2.222222 (2.22% of price)");

        assert_eq!(api.call_count("symbol_price").await, 1);
        assert_eq!(api.call_count("account_balance").await, 1);
    }

    #[tokio::test]
    async fn test_clearing_symbol_hides_panels() {
        let (mut controller, _, _) = create_test_controller().await;
        controller.handle(FormEvent::SymbolSelected(Some("BTCUSDT".into()))).await;
        controller.handle(FormEvent::SymbolSelected(None)).await;

        assert!(!controller.view().market_price.visible);
        assert!(!controller.view().wallet.visible);
        assert!(controller.inputs().symbol.is_none());
    }

    #[tokio::test]
    async fn test_failed_balance_hides_wallet_panel() {
        let (mut controller, api, _) = create_test_controller().await;
        controller.load_wallet_balance().await;
        assert!(controller.view().wallet.visible);

        api.set_balance_error(DashboardError::status(400, Some("API keys not set".into()))).await;
        controller.load_wallet_balance().await;

        let view = controller.view();
        assert!(!view.wallet.visible);
        assert_eq!(view.wallet_error, Notice::Text("API keys not set".into()));
    }

    #[tokio::test]
    async fn test_transport_failure_shows_generic_message() {
        let (mut controller, api, _) = create_test_controller().await;
        api.set_balance_error(DashboardError::Transport("connection refused".into())).await;

        controller.load_wallet_balance().await;

        let content = controller.view().wallet_error.content().unwrap();
        assert!(!content.is_empty());
        assert!(content.contains("Could not connect"));
    }

    #[tokio::test]
    async fn test_geo_restriction_renders_settings_link() {
        let (mut controller, api, _) = create_test_controller().await;
        api.set_price_error(
            "ETHUSDT",
            DashboardError::status(451, Some("Access is restricted in your location.".into())),
        )
        .await;

        controller.load_symbol_price("ETHUSDT").await;

        let view = controller.view();
        assert!(!view.market_price.visible);
        match &view.market_error {
            Notice::Markup(markup) => {
                assert!(markup.contains(r#"href="/settings""#));
                assert!(markup.contains("Access is restricted in your location."));
            }
            other => panic!("expected markup, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_range_slider_recenters_bounds() {
        let (mut controller, _, _) = create_test_controller().await;
        controller.load_symbol_price("BTCUSDT").await;

        controller.handle(FormEvent::RangePercentChanged(20)).await;

        let view = controller.view();
        assert_eq!(view.range_percent_text, "20");
        assert_eq!(view.range_percent_display, "20%");
        assert_eq!(view.lower_bound, "80.00000000");
        assert_eq!(view.upper_bound, "120.00000000");
    }

    #[tokio::test]
    async fn test_bounds_without_price_are_untouched() {
        let (mut controller, _, _) = create_test_controller().await;

        controller.handle(FormEvent::RangePercentChanged(20)).await;

        assert!(controller.inputs().lower_bound.is_none());
        assert!(controller.view().lower_bound.is_empty());
    }

    #[tokio::test]
    async fn test_small_grid_keeps_previous_preview() {
        let (mut controller, _, _) = create_test_controller().await;
        controller.handle(FormEvent::LowerBoundChanged(Some(90.0))).await;
        controller.handle(FormEvent::UpperBoundChanged(Some(110.0))).await;
        controller.handle(FormEvent::GridSizeChanged(Some(5))).await;

        let before = controller.view().grid_step_preview.clone().unwrap();
        assert_eq!(before.step, 5.0);
        assert_eq!(before.percent_of_price, None);

        controller.handle(FormEvent::GridSizeChanged(Some(1))).await;
        assert_eq!(controller.view().grid_step_preview.as_ref(), Some(&before));
    }

    #[tokio::test]
    async fn test_bot_type_changes_quantity() {
        let (mut controller, _, _) = create_test_controller().await;
        controller.handle(FormEvent::SymbolSelected(Some("BTCUSDT".into()))).await;
        controller.handle(FormEvent::LeverageChanged(Some(5))).await;

        // both: 200 * 5 / (2 * 10 * 100)
        assert_eq!(controller.quantity_per_grid(), Some(0.5));

        controller.handle(FormEvent::BotTypeChanged(BotType::Long)).await;
        assert_eq!(controller.quantity_per_grid(), Some(1.0));

        controller.handle(FormEvent::BotTypeChanged(BotType::Short)).await;
        assert_eq!(controller.quantity_per_grid(), Some(1.0));
        assert_eq!(controller.view().quantity_per_grid, "1.00000000");
    }

    #[tokio::test]
    async fn test_allocation_input_recomputes() {
        let (mut controller, _, _) = create_test_controller().await;
        controller.handle(FormEvent::SymbolSelected(Some("BTCUSDT".into()))).await;

        controller.handle(FormEvent::WalletAllocationChanged(Some(50.0))).await;
        assert_eq!(controller.view().allocation_amount, "1000.00");

        controller.handle(FormEvent::WalletAllocationChanged(None)).await;
        assert_eq!(controller.view().allocation_amount, "0.00");
        // zero allocation leaves the previous quantity in place
        assert_eq!(controller.quantity_per_grid(), Some(0.5));
    }

    #[tokio::test]
    async fn test_listener_sees_every_edit() {
        let (mut controller, _, listener) = create_test_controller().await;

        controller.handle(FormEvent::SymbolSelected(Some("BTCUSDT".into()))).await;
        controller.handle(FormEvent::LeverageChanged(Some(2))).await;

        assert_eq!(listener.count(|u| matches!(u, ViewUpdate::Form(_))), 2);
        match listener.last() {
            Some(ViewUpdate::Form(view)) => assert_eq!(view.quantity_per_grid, "0.20000000"),
            other => panic!("unexpected update {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_posts_validated_request() {
        let (mut controller, api, _) = create_test_controller().await;
        controller.handle(FormEvent::SymbolSelected(Some("BTCUSDT".into()))).await;

        let request = controller.submit().await.unwrap();
        assert_eq!(request.symbol, "BTCUSDT");
        assert_eq!(request.grid_size, 10);
        assert_eq!(request.wallet_allocation, 10);
        assert_eq!(api.created.lock().await.len(), 1);
        assert!(controller.view().submit_notice.is_visible());
    }

    #[tokio::test]
    async fn test_balance_without_value_keeps_previous() {
        let (mut controller, api, _) = create_test_controller().await;
        controller.load_wallet_balance().await;

        *api.balance.lock().await = Some(Ok(BalanceResponse { usdt_balance: None }));
        controller.load_wallet_balance().await;

        assert_eq!(controller.state().wallet_balance, 2000.0);
        assert!(controller.view().wallet.visible);
        assert_eq!(controller.view().wallet_error, Notice::Hidden);
    }

    #[tokio::test]
    async fn test_refused_submit_shows_service_message() {
        let (mut controller, api, _) = create_test_controller().await;
        controller.handle(FormEvent::SymbolSelected(Some("BTCUSDT".into()))).await;
        api.set_form_error(Some(DashboardError::status(
            302,
            Some("Please set up your API keys first".into()),
        )))
        .await;

        assert!(controller.submit().await.is_err());
        assert!(api.created.lock().await.is_empty());
        assert_eq!(
            controller.view().submit_notice,
            Notice::Text("Please set up your API keys first".into())
        );
    }

    #[tokio::test]
    async fn test_submit_rejects_incomplete_form() {
        let (mut controller, api, _) = create_test_controller().await;

        let err = controller.submit().await.unwrap_err();
        assert!(matches!(err, DashboardError::InvalidInput(_)));
        assert!(api.created.lock().await.is_empty());
        assert!(matches!(controller.view().submit_notice, Notice::Text(ref t) if t.contains("Symbol is required")));
    }

    #[tokio::test]
    async fn test_symbols_fallback_list() {
        let (mut controller, api, _) = create_test_controller().await;
        api.set_symbols(Ok(SymbolList {
            symbols: vec!["BTCUSDT".into(), "ETHUSDT".into()],
            restricted: true,
            message: Some("Binance API access is restricted in your location.".into()),
        }))
        .await;

        controller.load_symbols().await;

        let view = controller.view();
        assert_eq!(view.symbols.len(), 2);
        assert!(matches!(view.symbols_notice, Notice::Markup(_)));
    }
}
