//! Grid service client - trait seam so views can be driven by a mock in tests

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ApiConfig;
use crate::errors::{DashboardError, DashboardResult};

use super::types::{
    BalanceResponse, ErrorBody, GridId, GridRequest, GridSnapshot, GridStatsResponse, PriceResponse,
    SymbolList, TradeRecord, TradesResponse,
};

/// Operations the dashboard needs from the grid service
///
/// Every call is one-shot: no retries, no backoff. Callers decide how a
/// failure degrades the view.
#[async_trait]
pub trait GridApi: Send + Sync {
    /// USDT wallet balance of the account
    async fn account_balance(&self) -> DashboardResult<BalanceResponse>;

    /// Last traded price of a symbol
    async fn symbol_price(&self, symbol: &str) -> DashboardResult<PriceResponse>;

    /// Realized performance of a grid
    async fn grid_stats(&self, grid_id: GridId) -> DashboardResult<GridStatsResponse>;

    /// Levels, positions and current price of a grid
    async fn grid_positions(&self, grid_id: GridId) -> DashboardResult<GridSnapshot>;

    /// Most recent executed trades of a grid
    async fn grid_trades(&self, grid_id: GridId) -> DashboardResult<Vec<TradeRecord>>;

    /// Tradable symbols, possibly the service's fallback list
    async fn symbols(&self) -> DashboardResult<SymbolList>;

    /// Flip a grid between running and stopped
    async fn toggle_grid(&self, grid_id: GridId) -> DashboardResult<()>;

    /// Create a new grid configuration
    async fn create_grid(&self, request: &GridRequest) -> DashboardResult<()>;

    /// Delete a stopped grid configuration
    async fn delete_grid(&self, grid_id: GridId) -> DashboardResult<()>;
}

/// Turn a non-OK response body into a status error
fn error_from_body(status: u16, body: &str) -> DashboardError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    DashboardError::status(status, parsed.message.or(parsed.error))
}

/// Path part of a URL or of a relative location, without query or trailing slash
fn location_path(location: &str) -> String {
    let path = match reqwest::Url::parse(location) {
        Ok(url) => url.path().to_string(),
        Err(_) => location.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Where the service sent a redirected request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedirectTarget {
    /// API keys missing; the service refused the action
    Settings,
    /// Session missing or expired
    Login,
    /// The page a form returns to, whether or not the action went through
    Page,
}

// ============================================================================
// HTTP Implementation
// ============================================================================

/// reqwest-backed client for the grid service
///
/// Redirects are never followed: the service answers form POSTs with a
/// redirect and the target is the only signal of a refusal.
pub struct HttpGridApi {
    client: reqwest::Client,
    base_url: String,
    toggle_path: String,
    create_path: String,
    delete_path: String,
    settings_path: String,
    login_path: String,
}

impl HttpGridApi {
    pub fn new(config: &ApiConfig) -> DashboardResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            toggle_path: config.toggle_path.clone(),
            create_path: config.create_path.clone(),
            delete_path: config.delete_path.clone(),
            settings_path: location_path(&config.settings_url),
            login_path: location_path(&config.login_path),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn grid_path(template: &str, grid_id: GridId) -> String {
        template.replace("{id}", &grid_id.to_string())
    }

    /// Path of the toggle form for a grid, relative to the base URL
    pub fn toggle_path(&self, grid_id: GridId) -> String {
        Self::grid_path(&self.toggle_path, grid_id)
    }

    /// Price endpoint of a symbol, the symbol encoded as one path segment
    fn price_url(&self, symbol: &str) -> DashboardResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| DashboardError::Config(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| DashboardError::Config(format!("Base URL {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "symbol", symbol, "price"]);
        Ok(url)
    }

    fn redirect_target(&self, location: Option<&str>) -> RedirectTarget {
        let Some(path) = location.map(location_path) else {
            return RedirectTarget::Page;
        };
        if path == self.settings_path {
            RedirectTarget::Settings
        } else if path == self.login_path {
            RedirectTarget::Login
        } else {
            RedirectTarget::Page
        }
    }

    fn redirect_error(&self, status: u16, location: Option<&str>) -> DashboardError {
        let message = match self.redirect_target(location) {
            RedirectTarget::Settings => "Please set up your API keys first",
            RedirectTarget::Login => "Not logged in to the grid service",
            RedirectTarget::Page => return DashboardError::status(status, None),
        };
        DashboardError::status(status, Some(message.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> DashboardResult<T> {
        self.get_json_at(self.url(path)).await
    }

    async fn get_json_at<T: DeserializeOwned, U: reqwest::IntoUrl>(&self, url: U) -> DashboardResult<T> {
        let response = self.client.get(url).send().await?;
        debug!("GET {}", response.url().path());
        let status = response.status();
        if status.is_redirection() {
            return Err(self.redirect_error(status.as_u16(), location(&response).as_deref()));
        }
        let body = response.text().await?;

        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_form<T: Serialize + ?Sized>(&self, path: &str, form: &T) -> DashboardResult<()> {
        debug!("POST {}", path);
        let response = self.client.post(self.url(path)).form(form).send().await?;
        let status = response.status();

        if status.is_redirection() {
            let target = location(&response);
            return match self.redirect_target(target.as_deref()) {
                RedirectTarget::Page => {
                    debug!("POST {} accepted, redirected to {:?}", path, target);
                    Ok(())
                }
                _ => Err(self.redirect_error(status.as_u16(), target.as_deref())),
            };
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_body(status.as_u16(), &body));
        }
        Ok(())
    }
}

fn location(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl GridApi for HttpGridApi {
    async fn account_balance(&self) -> DashboardResult<BalanceResponse> {
        self.get_json("/api/account/balance").await
    }

    async fn symbol_price(&self, symbol: &str) -> DashboardResult<PriceResponse> {
        self.get_json_at(self.price_url(symbol)?).await
    }

    async fn grid_stats(&self, grid_id: GridId) -> DashboardResult<GridStatsResponse> {
        self.get_json(&format!("/api/grid/{}/stats", grid_id)).await
    }

    async fn grid_positions(&self, grid_id: GridId) -> DashboardResult<GridSnapshot> {
        self.get_json(&format!("/api/grid/{}/positions", grid_id)).await
    }

    async fn grid_trades(&self, grid_id: GridId) -> DashboardResult<Vec<TradeRecord>> {
        let response: TradesResponse = self.get_json(&format!("/api/grid/{}/trades", grid_id)).await?;
        Ok(response.trades)
    }

    async fn symbols(&self) -> DashboardResult<SymbolList> {
        let response = self.client.get(self.url("/api/symbols")).send().await?;
        let status = response.status();
        if status.is_redirection() {
            return Err(self.redirect_error(status.as_u16(), location(&response).as_deref()));
        }
        let body = response.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        // The service still ships a fallback list when the exchange is unreachable
        match serde_json::from_str::<SymbolList>(&body) {
            Ok(mut list) if !list.symbols.is_empty() => {
                warn!("Using fallback symbol list (status {})", status.as_u16());
                list.restricted = true;
                Ok(list)
            }
            _ => Err(error_from_body(status.as_u16(), &body)),
        }
    }

    async fn toggle_grid(&self, grid_id: GridId) -> DashboardResult<()> {
        let path = Self::grid_path(&self.toggle_path, grid_id);
        self.post_form(&path, &[] as &[(&str, &str)]).await
    }

    async fn create_grid(&self, request: &GridRequest) -> DashboardResult<()> {
        self.post_form(&self.create_path, request).await
    }

    async fn delete_grid(&self, grid_id: GridId) -> DashboardResult<()> {
        let path = Self::grid_path(&self.delete_path, grid_id);
        self.post_form(&path, &[] as &[(&str, &str)]).await
    }
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

/// Mock grid service for driving views without a network.
pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use tokio::sync::Mutex;

    /// One scripted positions response, optionally delayed
    pub struct ScriptedSnapshot {
        pub delay: Duration,
        pub result: DashboardResult<GridSnapshot>,
    }

    /// Mock grid service
    #[derive(Default)]
    pub struct MockGridApi {
        pub balance: Mutex<Option<DashboardResult<BalanceResponse>>>,
        pub prices: Mutex<HashMap<String, DashboardResult<PriceResponse>>>,
        pub stats: Mutex<HashMap<GridId, DashboardResult<GridStatsResponse>>>,
        pub snapshots: Mutex<HashMap<GridId, GridSnapshot>>,
        pub scripted: Mutex<HashMap<GridId, VecDeque<ScriptedSnapshot>>>,
        pub trades: Mutex<HashMap<GridId, Vec<TradeRecord>>>,
        pub symbol_list: Mutex<Option<DashboardResult<SymbolList>>>,
        pub toggled: Mutex<Vec<GridId>>,
        pub created: Mutex<Vec<GridRequest>>,
        pub deleted: Mutex<Vec<GridId>>,
        /// Refusal returned by every form POST while set
        pub form_error: Mutex<Option<DashboardError>>,
        pub calls: Mutex<Vec<String>>,
    }

    fn not_found() -> DashboardError {
        DashboardError::status(404, Some("Grid not found".into()))
    }

    impl MockGridApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn set_balance(&self, balance: f64) {
            *self.balance.lock().await = Some(Ok(BalanceResponse { usdt_balance: Some(balance) }));
        }

        pub async fn set_balance_error(&self, err: DashboardError) {
            *self.balance.lock().await = Some(Err(err));
        }

        pub async fn set_price(&self, symbol: &str, price: f64) {
            self.prices
                .lock()
                .await
                .insert(symbol.to_string(), Ok(PriceResponse { price: Some(price) }));
        }

        pub async fn set_price_error(&self, symbol: &str, err: DashboardError) {
            self.prices.lock().await.insert(symbol.to_string(), Err(err));
        }

        pub async fn set_stats(&self, grid_id: GridId, stats: DashboardResult<GridStatsResponse>) {
            self.stats.lock().await.insert(grid_id, stats);
        }

        pub async fn set_snapshot(&self, grid_id: GridId, snapshot: GridSnapshot) {
            self.snapshots.lock().await.insert(grid_id, snapshot);
        }

        /// Queue a one-shot positions response served before the standing snapshot
        pub async fn push_snapshot(
            &self,
            grid_id: GridId,
            delay: Duration,
            result: DashboardResult<GridSnapshot>,
        ) {
            self.scripted
                .lock()
                .await
                .entry(grid_id)
                .or_default()
                .push_back(ScriptedSnapshot { delay, result });
        }

        pub async fn set_trades(&self, grid_id: GridId, trades: Vec<TradeRecord>) {
            self.trades.lock().await.insert(grid_id, trades);
        }

        pub async fn set_symbols(&self, list: DashboardResult<SymbolList>) {
            *self.symbol_list.lock().await = Some(list);
        }

        pub async fn set_form_error(&self, err: Option<DashboardError>) {
            *self.form_error.lock().await = err;
        }

        async fn form_result(&self) -> DashboardResult<()> {
            match self.form_error.lock().await.clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        pub async fn call_count(&self, name: &str) -> usize {
            self.calls.lock().await.iter().filter(|c| c.as_str() == name).count()
        }

        async fn record(&self, name: &str) {
            self.calls.lock().await.push(name.to_string());
        }
    }

    #[async_trait]
    impl GridApi for MockGridApi {
        async fn account_balance(&self) -> DashboardResult<BalanceResponse> {
            self.record("account_balance").await;
            self.balance
                .lock()
                .await
                .clone()
                .unwrap_or_else(|| Err(DashboardError::Transport("no balance scripted".into())))
        }

        async fn symbol_price(&self, symbol: &str) -> DashboardResult<PriceResponse> {
            self.record("symbol_price").await;
            self.prices
                .lock()
                .await
                .get(symbol)
                .cloned()
                .unwrap_or_else(|| Err(DashboardError::status(400, Some(format!("Invalid symbol {}", symbol)))))
        }

        async fn grid_stats(&self, grid_id: GridId) -> DashboardResult<GridStatsResponse> {
            self.record("grid_stats").await;
            self.stats.lock().await.get(&grid_id).cloned().unwrap_or_else(|| Err(not_found()))
        }

        async fn grid_positions(&self, grid_id: GridId) -> DashboardResult<GridSnapshot> {
            self.record("grid_positions").await;
            let scripted = self
                .scripted
                .lock()
                .await
                .get_mut(&grid_id)
                .and_then(|queue| queue.pop_front());

            if let Some(ScriptedSnapshot { delay, result }) = scripted {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                return result;
            }

            self.snapshots.lock().await.get(&grid_id).cloned().ok_or_else(not_found)
        }

        async fn grid_trades(&self, grid_id: GridId) -> DashboardResult<Vec<TradeRecord>> {
            self.record("grid_trades").await;
            self.trades.lock().await.get(&grid_id).cloned().ok_or_else(not_found)
        }

        async fn symbols(&self) -> DashboardResult<SymbolList> {
            self.record("symbols").await;
            self.symbol_list
                .lock()
                .await
                .clone()
                .unwrap_or_else(|| Ok(SymbolList::default()))
        }

        async fn toggle_grid(&self, grid_id: GridId) -> DashboardResult<()> {
            self.record("toggle_grid").await;
            self.form_result().await?;
            self.toggled.lock().await.push(grid_id);
            Ok(())
        }

        async fn create_grid(&self, request: &GridRequest) -> DashboardResult<()> {
            self.record("create_grid").await;
            self.form_result().await?;
            self.created.lock().await.push(request.clone());
            Ok(())
        }

        async fn delete_grid(&self, grid_id: GridId) -> DashboardResult<()> {
            self.record("delete_grid").await;
            self.form_result().await?;
            self.deleted.lock().await.push(grid_id);
            Ok(())
        }
    }
}
