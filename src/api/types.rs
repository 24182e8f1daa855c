//! Wire types exchanged with the grid service

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{DashboardError, DashboardResult};

/// Identifier of a grid configuration on the service
pub type GridId = u64;

/// Timestamp layout used by the trades endpoint
pub const TRADE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Accept a JSON number or a numeric string; anything else reads as absent
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Trading direction of a grid bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum BotType {
    /// Long positions only
    Long,
    /// Short positions only
    Short,
    /// Long and short positions
    #[default]
    Both,
}

impl BotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotType::Long => "long",
            BotType::Short => "short",
            BotType::Both => "both",
        }
    }

    /// Human readable title shown on a grid card
    pub fn label(&self) -> &'static str {
        match self {
            BotType::Long => "Long Only",
            BotType::Short => "Short Only",
            BotType::Both => "Long & Short",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            BotType::Long => "text-success",
            BotType::Short => "text-danger",
            BotType::Both => "text-primary",
        }
    }

    pub fn shows_long(&self) -> bool {
        !matches!(self, BotType::Short)
    }

    pub fn shows_short(&self) -> bool {
        !matches!(self, BotType::Long)
    }
}

impl From<&str> for BotType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "long" => BotType::Long,
            "short" => BotType::Short,
            _ => BotType::Both,
        }
    }
}

impl From<String> for BotType {
    fn from(s: String) -> Self {
        BotType::from(s.as_str())
    }
}

/// Body of a non-OK response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /api/account/balance`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BalanceResponse {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub usdt_balance: Option<f64>,
}

impl BalanceResponse {
    pub fn balance(&self) -> DashboardResult<f64> {
        self.usdt_balance.ok_or(DashboardError::MissingField("usdt_balance"))
    }
}

/// `GET /api/symbol/{symbol}/price`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceResponse {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
}

impl PriceResponse {
    /// The price, when it is positive
    pub fn usable_price(&self) -> DashboardResult<f64> {
        self.price
            .filter(|p| *p > 0.0)
            .ok_or(DashboardError::MissingField("price"))
    }
}

/// Realized performance of a grid
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Performance {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub net_profit: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub win_rate: Option<f64>,
    #[serde(default)]
    pub total_trades: Option<u64>,
    #[serde(default)]
    pub winning_trades: Option<u64>,
    #[serde(default)]
    pub losing_trades: Option<u64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub roi: Option<f64>,
}

/// `GET /api/grid/{id}/stats`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GridStatsResponse {
    #[serde(default)]
    pub performance: Option<Performance>,
}

/// A grid order slot as reported by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEntry {
    #[serde(default)]
    pub id: Option<u64>,
    pub price_level: f64,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub is_filled: bool,
}

impl PositionEntry {
    pub fn new(price_level: f64, is_filled: bool) -> Self {
        Self {
            id: None,
            price_level,
            quantity: None,
            is_filled,
        }
    }
}

/// `GET /api/grid/{id}/positions`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// Price levels, ascending
    #[serde(default)]
    pub grid_levels: Vec<f64>,
    #[serde(default)]
    pub long_positions: Vec<PositionEntry>,
    #[serde(default)]
    pub short_positions: Vec<PositionEntry>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub bot_type: Option<BotType>,
    #[serde(default)]
    pub wallet_allocation: Option<u32>,
}

impl GridSnapshot {
    /// Bot type, defaulting to both sides when the service omits it
    pub fn bot_type(&self) -> BotType {
        self.bot_type.unwrap_or_default()
    }

    /// Current price when the service reported a usable one
    pub fn live_price(&self) -> Option<f64> {
        self.current_price.filter(|p| *p != 0.0 && p.is_finite())
    }
}

/// One executed trade of a grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub position_side: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub realized_profit: Option<f64>,
    #[serde(default)]
    pub executed_at: String,
}

impl TradeRecord {
    pub fn executed_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.executed_at, TRADE_TIME_FORMAT).ok()
    }
}

/// `GET /api/grid/{id}/trades`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradesResponse {
    #[serde(default)]
    pub trades: Vec<TradeRecord>,
}

/// `GET /api/symbols`, also returned alongside error statuses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolList {
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Set when the list is the service's fallback rather than live exchange data
    #[serde(default)]
    pub restricted: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Form payload creating a grid configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRequest {
    pub symbol: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub grid_size: u32,
    pub quantity_per_grid: f64,
    pub leverage: u32,
    pub bot_type: BotType,
    pub wallet_allocation: u32,
}
