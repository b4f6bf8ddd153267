pub mod config;
pub mod constants;
pub mod error;
pub mod fitting;
pub mod observation;
pub mod output;
pub mod processing;
pub mod series;
pub mod session;
pub mod transport;
pub mod triangulation;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use config::DfConfig;
pub use error::{DfError, Result};
pub use processing::{BoardMessage, DfProcessor, Report};
