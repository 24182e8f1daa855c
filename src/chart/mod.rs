//! Grid charts
//!
//! One chart per grid card: the grid levels as a step line over index
//! positions, filled and open positions placed on their level, and the
//! current price marker.

pub mod renderer;
pub mod series;

pub use renderer::{ChartRenderer, ChartView, RefreshOutcome};
pub use series::{
    closest_level_index, level_index, ChartPoint, Dataset, GridChart, GridInfo, GridStatsDisplay,
    SeriesKind, SeriesStyle,
};
