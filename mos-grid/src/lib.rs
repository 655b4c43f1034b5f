//! Model grid handling for station MOS.
//!
//! - [`projection`] maps geographic coordinates into a grid's native axes.
//! - [`grid`] holds the grid axes and land/sea mask, validated on construction.
//! - [`resolver`] finds the land cell each station reads its values from.
//! - [`extract`] pulls station series out of one model run, one variable per task.
//! - [`bundle`] reads already-decoded model runs from JSON.

pub mod bundle;
pub mod extract;
pub mod grid;
pub mod projection;
pub mod resolver;

pub use grid::{GridCell, ModelGrid};
pub use projection::Projection;
pub use resolver::GridPointResolver;
