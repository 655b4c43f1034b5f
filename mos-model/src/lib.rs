//! Statistical core of station MOS.
//!
//! [`align`] turns station observations and extracted model values into a
//! supervised training table; the backends fit one model per table:
//! [`linear`] (forward-selected multiple linear regression) and
//! [`forest`] (bagged regression trees). Both implement
//! [`backend::ModelBackend`].

pub mod align;
pub mod backend;
pub mod forest;
pub mod linear;
pub mod ols;

pub use align::{FeatureAligner, TrainingTable};
pub use backend::ModelBackend;
pub use forest::{ForestBackend, ForestModel};
pub use linear::LinearBackend;
