use config::{Config, File};
pub use config::ConfigError;
use serde::Deserialize;

use crate::api::types::BotType;
use crate::dashboard::page::{GridCard, PageLayout};
use crate::form::view::FormInputs;

/// Main configuration struct
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Grid service endpoints
    pub api: ApiConfig,
    /// Refresh loop configuration
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// Grid cards rendered on the page
    #[serde(default)]
    pub grids: Vec<GridCardConfig>,
    /// Initial values of the grid-creation form
    #[serde(default)]
    pub form: FormConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
    /// Local view server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the grid service, e.g. "http://127.0.0.1:5000"
    pub base_url: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Form POST target toggling a grid; `{id}` is replaced by the grid id
    #[serde(default = "default_toggle_path")]
    pub toggle_path: String,
    #[serde(default = "default_create_path")]
    pub create_path: String,
    #[serde(default = "default_delete_path")]
    pub delete_path: String,
    /// Link target of the geographic-restriction hint
    #[serde(default = "default_settings_url")]
    pub settings_url: String,
    /// Login page; a redirect there means the session is missing
    #[serde(default = "default_login_path")]
    pub login_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Seconds between stats/chart refreshes of active grids
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Symbol preselected in the form at startup
    #[serde(default)]
    pub default_symbol: Option<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            default_symbol: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridCardConfig {
    pub id: u64,
    #[serde(default)]
    pub active: bool,
    #[serde(default = "default_true")]
    pub chart: bool,
    #[serde(default = "default_true")]
    pub stats: bool,
    #[serde(default = "default_true")]
    pub info: bool,
    #[serde(default)]
    pub trades: bool,
}

impl From<&GridCardConfig> for GridCard {
    fn from(c: &GridCardConfig) -> Self {
        GridCard {
            id: c.id,
            active: c.active,
            chart_mount: c.chart,
            stats_container: c.stats,
            info_panel: c.info,
            trades_table: c.trades,
            requested: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormConfig {
    #[serde(default = "default_grid_size")]
    pub grid_size: u32,
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    /// Percent of the wallet committed to the grid (1-100)
    #[serde(default = "default_wallet_allocation")]
    pub wallet_allocation: f64,
    /// Half-width of the grid around the current price, in percent
    #[serde(default = "default_range_percent")]
    pub range_percent: u32,
    #[serde(default)]
    pub bot_type: BotType,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            grid_size: default_grid_size(),
            leverage: default_leverage(),
            wallet_allocation: default_wallet_allocation(),
            range_percent: default_range_percent(),
            bot_type: BotType::default(),
        }
    }
}

impl FormConfig {
    pub fn inputs(&self) -> FormInputs {
        FormInputs {
            grid_size: Some(self.grid_size),
            leverage: Some(self.leverage),
            wallet_allocation: Some(self.wallet_allocation),
            range_percent: self.range_percent,
            bot_type: self.bot_type,
            ..FormInputs::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Enable local view server
    #[serde(default = "default_server_enabled")]
    pub enabled: bool,
    /// Server port (default 3000)
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Server host (default 127.0.0.1)
    #[serde(default = "default_server_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_server_enabled(),
            port: default_server_port(),
            host: default_server_host(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_toggle_path() -> String {
    "/grid/{id}/toggle".to_string()
}

fn default_create_path() -> String {
    "/grid/create".to_string()
}

fn default_delete_path() -> String {
    "/grid/{id}/delete".to_string()
}

fn default_settings_url() -> String {
    "/settings".to_string()
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_grid_size() -> u32 {
    10
}

fn default_leverage() -> u32 {
    1
}

fn default_wallet_allocation() -> f64 {
    10.0
}

fn default_range_percent() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_server_enabled() -> bool {
    false
}

fn default_server_port() -> u16 {
    3000
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

/// Environment overrides, e.g. APP_API__BASE_URL=...
fn environment() -> config::Environment {
    config::Environment::with_prefix("APP")
        .prefix_separator("_")
        .separator("__")
}

impl Settings {
    /// Load settings from a configuration file
    pub fn new(config_path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(config_path))
            .add_source(environment())
            .build()?;

        s.try_deserialize()
    }

    /// Page layout described by the `grids` section
    pub fn layout(&self) -> PageLayout {
        PageLayout::new(self.grids.iter().map(GridCard::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let settings = parse(
            r#"
            [api]
            base_url = "http://localhost:5000"
            "#,
        );

        assert_eq!(settings.api.timeout_secs, 10);
        assert_eq!(settings.api.toggle_path, "/grid/{id}/toggle");
        assert_eq!(settings.api.settings_url, "/settings");
        assert_eq!(settings.api.login_path, "/login");
        assert_eq!(settings.dashboard.refresh_interval_secs, 30);
        assert!(settings.grids.is_empty());
        assert_eq!(settings.form.grid_size, 10);
        assert_eq!(settings.form.bot_type, BotType::Both);
        assert!(!settings.server.enabled);
        assert_eq!(settings.server.port, 3000);
    }

    #[test]
    fn test_grid_cards_to_layout() {
        let settings = parse(
            r#"
            [api]
            base_url = "http://localhost:5000"

            [[grids]]
            id = 7
            active = true

            [[grids]]
            id = 9
            chart = false
            trades = true
            "#,
        );

        let layout = settings.layout();
        assert_eq!(layout.active_grid_ids(), vec![7]);

        let card = layout.card(9).unwrap();
        assert!(!card.active);
        assert!(!card.chart_mount);
        assert!(card.stats_container);
        assert!(card.trades_table);
    }

    #[test]
    fn test_form_config_to_inputs() {
        let settings = parse(
            r#"
            [api]
            base_url = "http://localhost:5000"

            [form]
            grid_size = 20
            leverage = 5
            bot_type = "long"
            "#,
        );

        let inputs = settings.form.inputs();
        assert_eq!(inputs.grid_size, Some(20));
        assert_eq!(inputs.leverage, Some(5));
        assert_eq!(inputs.wallet_allocation, Some(10.0));
        assert_eq!(inputs.bot_type, BotType::Long);
        assert!(inputs.symbol.is_none());
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut vars = config::Map::new();
        vars.insert("APP_API__BASE_URL".to_string(), "http://from-env:5000".to_string());
        vars.insert("APP_DASHBOARD__DEFAULT_SYMBOL".to_string(), "ETHUSDT".to_string());

        let settings: Settings = Config::builder()
            .add_source(File::from_str("[api]\nbase_url = \"http://from-file\"\n", FileFormat::Toml))
            .add_source(environment().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.api.base_url, "http://from-env:5000");
        assert_eq!(settings.dashboard.default_symbol.as_deref(), Some("ETHUSDT"));
    }
}
