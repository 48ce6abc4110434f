//! Car-crash statistics dashboard: data loading, derived views, trend fits,
//! declarative chart specs and the reactive graph that ties them together.
//! Rendering lives in the `crash-panda` binary.

pub mod chart;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod reactive;
pub mod state;
pub mod trend;

pub use config::{AppConfig, DataOrigin};
pub use error::DashError;
pub use state::AppState;
