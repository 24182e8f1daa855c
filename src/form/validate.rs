//! Grid parameter validation, matching the service's own checks

use crate::api::types::{BotType, GridRequest};
use crate::errors::{DashboardError, DashboardResult};

pub const MAX_GRID_SIZE: u32 = 100;
pub const MAX_LEVERAGE: u32 = 125;

/// Raw form values before validation
#[derive(Debug, Clone, Default)]
pub struct GridDraft {
    pub symbol: Option<String>,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    pub grid_size: Option<u32>,
    pub quantity_per_grid: Option<f64>,
    pub leverage: Option<u32>,
    pub bot_type: Option<BotType>,
    pub wallet_allocation: Option<f64>,
}

/// Collect every problem with the draft; empty means valid
pub fn validate_grid_parameters(draft: &GridDraft) -> Vec<String> {
    let mut errors = Vec::new();

    if draft.symbol.as_deref().map_or(true, |s| s.trim().is_empty()) {
        errors.push("Symbol is required".to_string());
    }

    match draft.lower_bound {
        None => errors.push("Lower bound must be a number".to_string()),
        Some(v) if v <= 0.0 => errors.push("Lower bound must be greater than 0".to_string()),
        _ => {}
    }

    match draft.upper_bound {
        None => errors.push("Upper bound must be a number".to_string()),
        Some(v) if v <= 0.0 => errors.push("Upper bound must be greater than 0".to_string()),
        _ => {}
    }

    if let (Some(lower), Some(upper)) = (draft.lower_bound, draft.upper_bound) {
        if lower > 0.0 && upper > 0.0 && lower >= upper {
            errors.push("Upper bound must be greater than lower bound".to_string());
        }
    }

    match draft.grid_size {
        None => errors.push("Grid size must be an integer".to_string()),
        Some(n) if n < 2 => errors.push("Grid size must be at least 2".to_string()),
        Some(n) if n > MAX_GRID_SIZE => {
            errors.push(format!("Grid size cannot exceed {}", MAX_GRID_SIZE))
        }
        _ => {}
    }

    match draft.quantity_per_grid {
        None => errors.push("Quantity per grid must be a number".to_string()),
        Some(q) if q <= 0.0 => errors.push("Quantity per grid must be greater than 0".to_string()),
        _ => {}
    }

    match draft.leverage {
        None => errors.push("Leverage must be an integer".to_string()),
        Some(0) => errors.push("Leverage must be at least 1".to_string()),
        Some(l) if l > MAX_LEVERAGE => {
            errors.push(format!("Leverage cannot exceed {}", MAX_LEVERAGE))
        }
        _ => {}
    }

    if draft.bot_type.is_none() {
        errors.push("Bot type must be 'both', 'long', or 'short'".to_string());
    }

    match draft.wallet_allocation {
        None => errors.push("Wallet allocation must be an integer".to_string()),
        Some(a) if a < 1.0 => errors.push("Wallet allocation must be at least 1%".to_string()),
        Some(a) if a > 100.0 => errors.push("Wallet allocation cannot exceed 100%".to_string()),
        _ => {}
    }

    errors
}

impl GridDraft {
    /// Validate and convert into the payload the service accepts
    pub fn into_request(self) -> DashboardResult<GridRequest> {
        let errors = validate_grid_parameters(&self);
        if !errors.is_empty() {
            return Err(DashboardError::InvalidInput(errors.join("; ")));
        }

        match self {
            GridDraft {
                symbol: Some(symbol),
                lower_bound: Some(lower_bound),
                upper_bound: Some(upper_bound),
                grid_size: Some(grid_size),
                quantity_per_grid: Some(quantity_per_grid),
                leverage: Some(leverage),
                bot_type: Some(bot_type),
                wallet_allocation: Some(wallet_allocation),
            } => Ok(GridRequest {
                symbol: symbol.trim().to_string(),
                lower_bound,
                upper_bound,
                grid_size,
                quantity_per_grid,
                leverage,
                bot_type,
                wallet_allocation: wallet_allocation.trunc() as u32,
            }),
            _ => Err(DashboardError::InvalidInput("Incomplete grid parameters".into())),
        }
    }
}
