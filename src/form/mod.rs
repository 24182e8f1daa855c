//! Grid-creation form
//!
//! The form controller keeps the read-only fields of the grid-creation form
//! (allocation amount, quantity per grid, grid step preview) consistent with
//! the user's edits and with the latest market price and wallet balance.
//!
//! - [`calc`] - pure arithmetic behind the derived fields
//! - [`validate`] - parameter checks before a grid is created
//! - [`view`] - input values, output fields and typed input events
//! - [`controller`] - applies events and fetches price and balance

pub mod calc;
pub mod controller;
pub mod validate;
pub mod view;

pub use controller::{FormController, FormState};
pub use validate::{validate_grid_parameters, GridDraft};
pub use view::{FormEvent, FormInputs, FormView, GridStepPreview, Notice, Panel};
