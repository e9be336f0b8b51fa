pub mod analysis;
pub mod error;
pub mod grid;
pub mod logger;
pub mod report;
pub mod simulation;
pub mod table;

pub use error::KinsweepError;
