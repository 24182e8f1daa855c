//! Grid-creation form: input fields, output fields and input events

use serde::Serialize;

use crate::api::types::BotType;
use crate::format::escape_html;

/// Values of the editable form fields
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormInputs {
    pub symbol: Option<String>,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    pub grid_size: Option<u32>,
    pub leverage: Option<u32>,
    /// Percent of the wallet committed to the grid
    pub wallet_allocation: Option<f64>,
    /// Slider value, 0-100
    pub range_percent: u32,
    pub bot_type: BotType,
}

/// A typed edit of one form field
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    /// `None` when the selection was cleared
    SymbolSelected(Option<String>),
    RangePercentChanged(u32),
    /// Emitted by both the allocation slider and its number input
    WalletAllocationChanged(Option<f64>),
    GridSizeChanged(Option<u32>),
    LowerBoundChanged(Option<f64>),
    UpperBoundChanged(Option<f64>),
    BotTypeChanged(BotType),
    LeverageChanged(Option<u32>),
}

/// An info panel that is either shown with text or hidden
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Panel {
    pub visible: bool,
    pub text: String,
}

impl Panel {
    pub fn show(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }
}

/// Inline error slot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum Notice {
    #[default]
    Hidden,
    Text(String),
    /// Pre-rendered HTML
    Markup(String),
}

impl Notice {
    pub fn is_visible(&self) -> bool {
        !matches!(self, Notice::Hidden)
    }

    /// Inner text or markup
    pub fn content(&self) -> Option<&str> {
        match self {
            Notice::Hidden => None,
            Notice::Text(t) | Notice::Markup(t) => Some(t),
        }
    }
}

/// Alert shown when the service refuses requests from the caller's location
pub fn geo_restriction_markup(message: &str, settings_url: &str) -> String {
    format!(
        r#"<div class="alert alert-warning"><strong>Geographic Restriction:</strong> {} <a href="{}" class="alert-link">Check Settings</a> for possible solutions.</div>"#,
        escape_html(message),
        escape_html(settings_url)
    )
}

/// Grid step shown under the bounds inputs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridStepPreview {
    pub step: f64,
    pub percent_of_price: Option<f64>,
    pub text: String,
}

/// Read-only fields and panels derived from the inputs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormView {
    /// Current market price of the selected symbol
    pub market_price: Panel,
    pub market_error: Notice,
    /// Wallet balance
    pub wallet: Panel,
    pub wallet_error: Notice,
    pub allocation_amount: String,
    pub quantity_per_grid: String,
    pub lower_bound: String,
    pub upper_bound: String,
    /// Range value next to the slider label
    pub range_percent_text: String,
    /// Range value with a percent sign, shown beside the slider
    pub range_percent_display: String,
    pub grid_step_preview: Option<GridStepPreview>,
    /// Choices of the symbol select
    pub symbols: Vec<String>,
    pub symbols_notice: Notice,
    /// Result of the last submission
    pub submit_notice: Notice,
}
