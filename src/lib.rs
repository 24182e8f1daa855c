#![deny(unreachable_pub)]
pub mod api;
pub mod chart;
pub mod config;
pub mod dashboard;
mod errors;
pub mod form;
pub mod format;
pub mod server;

pub use api::{mock, BotType, GridApi, GridId, GridSnapshot, HttpGridApi};
pub use chart::{ChartRenderer, GridChart, RefreshOutcome};
pub use dashboard::{Dashboard, DashboardOptions, DashboardSnapshot, LogListener, NoOpListener, PageLayout, ViewListener, ViewUpdate};
pub use errors::{is_geo_restriction_message, DashboardError, DashboardResult, CONNECT_FAILURE_MESSAGE};
pub use form::{FormController, FormEvent, FormInputs, FormView};
