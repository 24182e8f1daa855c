//! Dashboard page
//!
//! Wires the grid-creation form, the grid charts and the stats board onto an
//! injected page layout, and refreshes active grids on a fixed interval.

pub mod listener;
pub mod page;
pub mod render;
pub mod runner;
pub mod stats;

pub use listener::{LogListener, NoOpListener, ViewListener, ViewUpdate};
pub use page::{GridCard, PageLayout};
pub use render::{chart_config, render_dashboard};
pub use runner::{Dashboard, DashboardOptions, DashboardSnapshot, GridPanel, GridRefresh};
pub use stats::{GridStatsView, StatsBoard};
